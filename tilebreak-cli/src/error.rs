//! CLI error handling with user-friendly messages.
//!
//! Centralizes error handling for the CLI, providing consistent formatting
//! and appropriate exit codes.

use std::fmt;
use std::process;

use tilebreak::config::ConfigFileError;
use tilebreak::PipelineError;

/// CLI-specific errors with user-friendly messages.
#[derive(Debug)]
pub enum CliError {
    /// Failed to initialize logging
    LoggingInit(String),
    /// Configuration error
    Config(String),
    /// Configuration file could not be read or written
    ConfigFile(ConfigFileError),
    /// The pipeline failed
    Pipeline(PipelineError),
    /// Refused to overwrite an existing file
    FileExists(String),
}

impl CliError {
    /// Exit the process with an appropriate error message and code.
    pub fn exit(&self) -> ! {
        eprintln!("Error: {}", self);

        match self {
            CliError::ConfigFile(ConfigFileError::ReadError(_)) => {
                eprintln!();
                eprintln!("Create a run configuration with: tilebreak init");
            }
            CliError::ConfigFile(ConfigFileError::Missing { .. }) => {
                eprintln!();
                eprintln!("Set the value in the run configuration or pass it on the command line.");
            }
            CliError::Pipeline(PipelineError::MosaicNotCreated { .. }) => {
                eprintln!();
                eprintln!("Tile outputs are complete; only the mosaic is missing.");
                eprintln!("Re-run the same command to rebuild it without recomputing tiles.");
            }
            CliError::Pipeline(PipelineError::ModelFit { .. })
            | CliError::Pipeline(PipelineError::Raster { .. }) => {
                eprintln!();
                eprintln!("Finished tiles are kept; re-running resumes at the failed tile.");
            }
            CliError::FileExists(_) => {
                eprintln!();
                eprintln!("Use --force to overwrite it.");
            }
            _ => {}
        }

        process::exit(1)
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::LoggingInit(msg) => write!(f, "Failed to initialize logging: {}", msg),
            CliError::Config(msg) => write!(f, "Configuration error: {}", msg),
            CliError::ConfigFile(e) => write!(f, "{}", e),
            CliError::Pipeline(e) => write!(f, "{}", e),
            CliError::FileExists(path) => write!(f, "File already exists: {}", path),
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CliError::ConfigFile(e) => Some(e),
            CliError::Pipeline(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ConfigFileError> for CliError {
    fn from(e: ConfigFileError) -> Self {
        CliError::ConfigFile(e)
    }
}

impl From<PipelineError> for CliError {
    fn from(e: PipelineError) -> Self {
        CliError::Pipeline(e)
    }
}
