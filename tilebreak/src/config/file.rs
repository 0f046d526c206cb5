//! Loading and saving run configuration files.

use std::path::{Path, PathBuf};

use ini::Ini;
use thiserror::Error;

use super::settings::RunConfig;
use crate::error::{PipelineError, PipelineResult};
use crate::orchestrator::Job;
use crate::params::ParameterSet;
use crate::tile::TimeSeriesFolder;

/// Configuration file errors.
#[derive(Debug, Error)]
pub enum ConfigFileError {
    /// Failed to read config file
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] ini::Error),

    /// Failed to write config file
    #[error("Failed to write config file: {0}")]
    WriteError(String),

    /// Invalid configuration value
    #[error("Invalid configuration: {section}.{key} = '{value}' - {reason}")]
    InvalidValue {
        section: String,
        key: String,
        value: String,
        reason: String,
    },

    /// A required key has no value
    #[error("Missing configuration: {section}.{key}")]
    Missing { section: String, key: String },

    /// Failed to create config directory
    #[error("Failed to create config directory: {0}")]
    DirectoryError(std::io::Error),
}

impl ConfigFileError {
    fn missing(section: &str, key: &str) -> Self {
        Self::Missing {
            section: section.to_string(),
            key: key.to_string(),
        }
    }
}

impl From<ConfigFileError> for PipelineError {
    fn from(err: ConfigFileError) -> Self {
        PipelineError::Config(err.to_string())
    }
}

impl RunConfig {
    /// Load a configuration file.
    ///
    /// Unlike the application settings, a run config must exist.
    pub fn load_from(path: &Path) -> Result<Self, ConfigFileError> {
        let ini = Ini::load_from_file(path)?;
        super::parser::parse_ini(&ini)
    }

    /// Commented INI text of this configuration.
    pub fn to_ini_string(&self) -> String {
        super::writer::to_config_string(self)
    }

    /// Write this configuration to `path`, creating parent directories.
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigFileError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(ConfigFileError::DirectoryError)?;
        }
        std::fs::write(path, self.to_ini_string())
            .map_err(|e| ConfigFileError::WriteError(e.to_string()))
    }

    /// Parameter set of the run. All three period dates are required.
    pub fn to_parameter_set(&self) -> Result<ParameterSet, ConfigFileError> {
        let history = self
            .periods
            .history
            .ok_or_else(|| ConfigFileError::missing("periods", "history"))?;
        let start = self
            .periods
            .monitoring_start
            .ok_or_else(|| ConfigFileError::missing("periods", "monitoring_start"))?;
        let end = self
            .periods
            .monitoring_end
            .ok_or_else(|| ConfigFileError::missing("periods", "monitoring_end"))?;

        let mut params = ParameterSet::new(history, start, end);
        params.harmonic_order = self.model.harmonic_order;
        params.frequency = self.model.frequency;
        params.trend = self.model.trend;
        params.hfrac = self.model.hfrac;
        params.level = self.model.level;
        params.backend = self.model.backend;
        Ok(params)
    }

    /// Open the input folder named by `[input] folder`.
    pub fn open_folder(&self) -> PipelineResult<TimeSeriesFolder> {
        let folder = self
            .input
            .folder
            .as_ref()
            .ok_or_else(|| ConfigFileError::missing("input", "folder"))?;
        TimeSeriesFolder::open(folder)
    }

    /// Build the job described by this configuration.
    ///
    /// Validates the parameters and resolves the requested tiles against
    /// the input folder.
    pub fn to_job(&self, folder: &TimeSeriesFolder) -> PipelineResult<Job> {
        let params = self.to_parameter_set()?;
        params.validate()?;

        let tiles = folder
            .resolve(&self.input.tiles)?
            .into_iter()
            .map(|t| t.id().to_string())
            .collect();

        Ok(Job {
            folder: folder.root().to_path_buf(),
            result_root: self.output.directory.clone(),
            run_name: self.output.name.clone().unwrap_or_else(|| folder.name()),
            tiles,
            params,
        })
    }
}

/// Default location of a run config written by `tilebreak init`.
pub fn default_config_path() -> PathBuf {
    PathBuf::from("tilebreak.ini")
}
