//! tilebreak CLI - Command-line interface
//!
//! This binary provides a command-line interface to the tilebreak library.

mod commands;
mod error;
mod progress;
mod runner;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use commands::common::ConfigArgs;
use error::CliError;

#[derive(Parser)]
#[command(name = "tilebreak")]
#[command(
    version,
    about = "Tiled change detection over satellite image time series",
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a run configuration file
    Init {
        /// Path of the configuration file
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,

        /// Time series folder to put in the configuration
        #[arg(long)]
        folder: Option<PathBuf>,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Validate a run and show which tiles are pending
    Plan {
        #[command(flatten)]
        config: ConfigArgs,
    },

    /// Compute pending tiles and build the mosaic
    Run {
        #[command(flatten)]
        config: ConfigArgs,

        /// Window workers per tile (0 = one per CPU core)
        #[arg(long, short = 'w')]
        workers: Option<usize>,

        /// Enable debug logging
        #[arg(long)]
        debug: bool,
    },
}

fn main() {
    let cli = Cli::parse();

    let result: Result<(), CliError> = match cli.command {
        Commands::Init {
            output,
            folder,
            force,
        } => commands::init::run(commands::init::InitArgs {
            output,
            folder,
            force,
        }),
        Commands::Plan { config } => commands::plan::run(config),
        Commands::Run {
            config,
            workers,
            debug,
        } => commands::run::run(commands::run::RunArgs {
            config,
            workers,
            debug,
        }),
    };

    if let Err(e) = result {
        e.exit();
    }
}
