//! Settings structs and defaults for each `[section]` of a run config.

use std::path::PathBuf;

use chrono::NaiveDate;

use crate::params::Backend;

/// Default harmonic order.
pub const DEFAULT_HARMONIC_ORDER: u32 = 3;

/// Default seasonal frequency.
pub const DEFAULT_FREQUENCY: u32 = 365;

/// Default monitor bandwidth fraction.
pub const DEFAULT_HFRAC: f64 = 0.25;

/// Default confidence level.
pub const DEFAULT_LEVEL: f64 = 0.95;

/// Accepted harmonic orders.
pub const HARMONIC_ORDER_RANGE: std::ops::RangeInclusive<u32> = 3..=10;

/// Accepted frequencies.
pub const FREQUENCY_RANGE: std::ops::RangeInclusive<u32> = 1..=365;

/// Accepted bandwidth fractions.
pub const HFRAC_CHOICES: [f64; 3] = [0.25, 0.5, 1.0];

/// Accepted confidence levels.
pub const LEVEL_RANGE: std::ops::RangeInclusive<f64> = 0.95..=1.0;

/// Default root of result folders (`~/module_results/bfast`).
pub fn default_output_directory() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("module_results")
        .join("bfast")
}

/// Complete run configuration.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RunConfig {
    pub input: InputSettings,
    pub output: OutputSettings,
    pub periods: PeriodSettings,
    pub model: ModelSettings,
    pub execution: ExecutionSettings,
}

/// `[input]`
#[derive(Debug, Clone, PartialEq, Default)]
pub struct InputSettings {
    /// Time-series folder.
    pub folder: Option<PathBuf>,
    /// Tiles to process; empty selects all tiles of the folder.
    pub tiles: Vec<String>,
}

/// `[output]`
#[derive(Debug, Clone, PartialEq)]
pub struct OutputSettings {
    /// Root of result folders.
    pub directory: PathBuf,
    /// Run name; defaults to the input folder name.
    pub name: Option<String>,
}

impl Default for OutputSettings {
    fn default() -> Self {
        Self {
            directory: default_output_directory(),
            name: None,
        }
    }
}

/// `[periods]`
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PeriodSettings {
    pub history: Option<NaiveDate>,
    pub monitoring_start: Option<NaiveDate>,
    pub monitoring_end: Option<NaiveDate>,
}

/// `[model]`
#[derive(Debug, Clone, PartialEq)]
pub struct ModelSettings {
    pub harmonic_order: u32,
    pub frequency: u32,
    pub trend: bool,
    pub hfrac: f64,
    pub level: f64,
    pub backend: Backend,
}

impl Default for ModelSettings {
    fn default() -> Self {
        Self {
            harmonic_order: DEFAULT_HARMONIC_ORDER,
            frequency: DEFAULT_FREQUENCY,
            trend: false,
            hfrac: DEFAULT_HFRAC,
            level: DEFAULT_LEVEL,
            backend: Backend::default(),
        }
    }
}

/// `[execution]`
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ExecutionSettings {
    /// Window workers per tile; 0 uses every core.
    pub workers: usize,
}
