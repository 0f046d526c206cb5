//! Arguments and helpers shared by `plan` and `run`.

use std::path::PathBuf;

use clap::{Args, ValueEnum};
use tilebreak::config::settings::{
    FREQUENCY_RANGE, HARMONIC_ORDER_RANGE, HFRAC_CHOICES, LEVEL_RANGE,
};
use tilebreak::config::{parse_tiles, RunConfig};
use tilebreak::dates::parse_date;
use tilebreak::params::Backend;

use crate::error::CliError;

/// Computation backend selection for CLI arguments.
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq)]
pub enum BackendArg {
    /// GPU implementation
    Opencl,
    /// Single-process CPU implementation
    Python,
    /// Multi-process CPU implementation
    PythonMp,
}

impl From<BackendArg> for Backend {
    fn from(arg: BackendArg) -> Self {
        match arg {
            BackendArg::Opencl => Backend::OpenCl,
            BackendArg::Python => Backend::Python,
            BackendArg::PythonMp => Backend::PythonMp,
        }
    }
}

/// Run configuration file plus command-line overrides.
#[derive(Debug, Clone, Args)]
pub struct ConfigArgs {
    /// Run configuration file
    #[arg(long, short = 'c', default_value = "tilebreak.ini")]
    pub config: PathBuf,

    /// Time series folder (overrides [input] folder)
    #[arg(long)]
    pub folder: Option<PathBuf>,

    /// Comma-separated tile numbers (overrides [input] tiles)
    #[arg(long)]
    pub tiles: Option<String>,

    /// Root of result folders (overrides [output] directory)
    #[arg(long)]
    pub output_dir: Option<PathBuf>,

    /// Result folder name (overrides [output] name)
    #[arg(long)]
    pub name: Option<String>,

    /// Start of the history period, YYYY-MM-DD
    #[arg(long)]
    pub history: Option<String>,

    /// Start of the monitoring period, YYYY-MM-DD
    #[arg(long)]
    pub monitoring_start: Option<String>,

    /// End of the monitoring period, YYYY-MM-DD
    #[arg(long)]
    pub monitoring_end: Option<String>,

    /// Number of harmonic terms (3 to 10)
    #[arg(long)]
    pub harmonic_order: Option<u32>,

    /// Observations per seasonal cycle (1 to 365)
    #[arg(long)]
    pub frequency: Option<u32>,

    /// Fit a linear trend term
    #[arg(long)]
    pub trend: Option<bool>,

    /// Monitor bandwidth fraction (0.25, 0.5 or 1.0)
    #[arg(long)]
    pub hfrac: Option<f64>,

    /// Confidence level (0.95 to 1.0)
    #[arg(long)]
    pub level: Option<f64>,

    /// Computation backend
    #[arg(long, value_enum)]
    pub backend: Option<BackendArg>,
}

impl ConfigArgs {
    /// Load the configuration file and apply the overrides.
    pub fn load(&self) -> Result<RunConfig, CliError> {
        let mut config = RunConfig::load_from(&self.config)?;
        self.apply(&mut config)?;
        Ok(config)
    }

    fn apply(&self, config: &mut RunConfig) -> Result<(), CliError> {
        if let Some(folder) = &self.folder {
            config.input.folder = Some(folder.clone());
        }
        if let Some(tiles) = &self.tiles {
            config.input.tiles = parse_tiles(tiles).map_err(CliError::Config)?;
        }
        if let Some(dir) = &self.output_dir {
            config.output.directory = dir.clone();
        }
        if let Some(name) = &self.name {
            config.output.name = Some(name.clone());
        }

        if let Some(v) = &self.history {
            config.periods.history = Some(date_arg("--history", v)?);
        }
        if let Some(v) = &self.monitoring_start {
            config.periods.monitoring_start = Some(date_arg("--monitoring-start", v)?);
        }
        if let Some(v) = &self.monitoring_end {
            config.periods.monitoring_end = Some(date_arg("--monitoring-end", v)?);
        }

        if let Some(k) = self.harmonic_order {
            if !HARMONIC_ORDER_RANGE.contains(&k) {
                return Err(CliError::Config(
                    "--harmonic-order must be from 3 to 10".to_string(),
                ));
            }
            config.model.harmonic_order = k;
        }
        if let Some(f) = self.frequency {
            if !FREQUENCY_RANGE.contains(&f) {
                return Err(CliError::Config(
                    "--frequency must be from 1 to 365".to_string(),
                ));
            }
            config.model.frequency = f;
        }
        if let Some(trend) = self.trend {
            config.model.trend = trend;
        }
        if let Some(h) = self.hfrac {
            if !HFRAC_CHOICES.contains(&h) {
                return Err(CliError::Config(
                    "--hfrac must be one of 0.25, 0.5, 1.0".to_string(),
                ));
            }
            config.model.hfrac = h;
        }
        if let Some(l) = self.level {
            if !LEVEL_RANGE.contains(&l) {
                return Err(CliError::Config(
                    "--level must be between 0.95 and 1.0".to_string(),
                ));
            }
            config.model.level = l;
        }
        if let Some(backend) = self.backend {
            config.model.backend = backend.into();
        }
        Ok(())
    }
}

fn date_arg(flag: &str, value: &str) -> Result<chrono::NaiveDate, CliError> {
    parse_date(value).ok_or_else(|| {
        CliError::Config(format!(
            "{} expects a YYYY-MM-DD date, got '{}'",
            flag, value
        ))
    })
}
