//! Run parameters and their mapping to output directories.
//!
//! A [`ParameterSet`] is everything that influences the numbers written by
//! a run: the history and monitoring periods plus the model
//! hyperparameters. Its [`directory_name`](ParameterSet::directory_name) is
//! a pure function of those values, so runs with different parameters never
//! share an output directory and a rerun with identical parameters finds
//! its own resume markers again.

use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, NaiveDate};

use crate::dates::{CropWindow, DateSeries};
use crate::error::{PipelineError, PipelineResult};

/// Minimum number of history observations below which a warning is raised.
pub const MIN_HISTORY_IMAGES: usize = 40;

/// Compute backend requested from the change-detection model.
///
/// The pipeline passes it through untouched; models decide what they support.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Backend {
    /// GPU implementation.
    #[default]
    OpenCl,
    /// Single-process CPU implementation.
    Python,
    /// Multi-process CPU implementation.
    PythonMp,
}

impl Backend {
    /// Name used in configuration files.
    pub fn as_str(&self) -> &'static str {
        match self {
            Backend::OpenCl => "opencl",
            Backend::Python => "python",
            Backend::PythonMp => "python-mp",
        }
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Backend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "opencl" => Ok(Backend::OpenCl),
            "python" => Ok(Backend::Python),
            "python-mp" | "python_mp" => Ok(Backend::PythonMp),
            other => Err(format!(
                "unknown backend '{}' (expected opencl, python or python-mp)",
                other
            )),
        }
    }
}

/// Parameters handed to the change-detection model for every window.
#[derive(Debug, Clone, PartialEq)]
pub struct MonitoringParameters {
    /// First date of the monitoring period.
    pub monitor_start: NaiveDate,
    /// Number of observations per seasonal cycle.
    pub seasonal_frequency: u32,
    /// Number of harmonic terms in the seasonal model.
    pub harmonic_order: u32,
    /// Bandwidth of the moving-sum monitor, as a fraction of the history length.
    pub harmonic_fraction: f64,
    /// Whether a linear trend term is fitted.
    pub include_trend: bool,
    /// Significance level of the monitor (`1 - confidence level`).
    pub significance_level: f64,
    pub backend: Backend,
}

/// Full parameter tuple of a run.
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterSet {
    /// First date of the history period.
    pub history_start: NaiveDate,
    /// First date of the monitoring period.
    pub monitor_start: NaiveDate,
    /// Last date of the monitoring period.
    pub monitor_end: NaiveDate,
    /// Harmonic order `k`.
    pub harmonic_order: u32,
    /// Seasonal frequency (observations per year).
    pub frequency: u32,
    /// Fit a trend term.
    pub trend: bool,
    /// Monitor bandwidth fraction `h`.
    pub hfrac: f64,
    /// Confidence level of the monitor, e.g. `0.95`.
    pub level: f64,
    pub backend: Backend,
}

impl ParameterSet {
    /// Create a parameter set with the default model hyperparameters.
    pub fn new(history_start: NaiveDate, monitor_start: NaiveDate, monitor_end: NaiveDate) -> Self {
        Self {
            history_start,
            monitor_start,
            monitor_end,
            harmonic_order: 3,
            frequency: 365,
            trend: false,
            hfrac: 0.25,
            level: 0.95,
            backend: Backend::default(),
        }
    }

    /// Check the parameters before any tile is touched.
    pub fn validate(&self) -> PipelineResult<()> {
        if !(self.history_start < self.monitor_start && self.monitor_start < self.monitor_end) {
            return Err(PipelineError::Config(format!(
                "dates must satisfy history start < monitoring start < monitoring end \
                 (got {}, {}, {})",
                self.history_start, self.monitor_start, self.monitor_end
            )));
        }
        if self.harmonic_order == 0 {
            return Err(PipelineError::Config(
                "harmonic order must be at least 1".to_string(),
            ));
        }
        if self.frequency == 0 {
            return Err(PipelineError::Config(
                "frequency must be at least 1".to_string(),
            ));
        }
        if !(self.hfrac > 0.0 && self.hfrac <= 1.0) {
            return Err(PipelineError::Config(format!(
                "hfrac must be in (0, 1], got {}",
                self.hfrac
            )));
        }
        if !(self.level > 0.0 && self.level <= 1.0) {
            return Err(PipelineError::Config(format!(
                "level must be in (0, 1], got {}",
                self.level
            )));
        }
        Ok(())
    }

    /// Deterministic output directory name for this parameter set.
    ///
    /// Format: `{history}_{monitor_start}_{monitor_end}_k{k}_f{freq}_t{0|1}_h{hfrac}_l{level}`
    /// where the three leading fields are years, e.g.
    /// `2010_2015_2018_k3_f365_t0_h0.25_l0.95`.
    pub fn directory_name(&self) -> String {
        format!(
            "{}_{}_{}_k{}_f{}_t{}_h{}_l{}",
            self.history_start.year(),
            self.monitor_start.year(),
            self.monitor_end.year(),
            self.harmonic_order,
            self.frequency,
            u8::from(self.trend),
            format_fraction(self.hfrac),
            format_fraction(self.level),
        )
    }

    /// Date range the series is cropped to before fitting.
    pub fn crop_window(&self) -> CropWindow {
        CropWindow::new(self.history_start, self.monitor_end)
    }

    /// Model parameters derived from this set.
    pub fn monitoring(&self) -> MonitoringParameters {
        MonitoringParameters {
            monitor_start: self.monitor_start,
            seasonal_frequency: self.frequency,
            harmonic_order: self.harmonic_order,
            harmonic_fraction: self.hfrac,
            include_trend: self.trend,
            significance_level: 1.0 - self.level,
            backend: self.backend,
        }
    }

    /// Number of observations of `dates` inside the history period.
    pub fn history_len(&self, dates: &DateSeries) -> usize {
        dates
            .as_slice()
            .iter()
            .filter(|d| **d >= self.history_start && **d < self.monitor_start)
            .count()
    }

    /// Warning text when the history period holds too few observations.
    pub fn history_warning(&self, dates: &DateSeries) -> Option<String> {
        let count = self.history_len(dates);
        if count < MIN_HISTORY_IMAGES {
            Some(format!(
                "the history period holds only {} images (at least {} recommended)",
                count, MIN_HISTORY_IMAGES
            ))
        } else {
            None
        }
    }
}

/// Render a fraction so that integral values keep a trailing `.0`
/// (`1.0` → `"1.0"`, `0.25` → `"0.25"`).
///
/// Directory names of earlier runs were built this way; keeping the
/// rendering stable keeps those runs resumable.
pub fn format_fraction(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 {
        format!("{:.1}", value)
    } else {
        format!("{}", value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn params() -> ParameterSet {
        ParameterSet::new(date(2010, 1, 1), date(2015, 1, 1), date(2018, 12, 31))
    }

    #[test]
    fn test_directory_name_defaults() {
        assert_eq!(params().directory_name(), "2010_2015_2018_k3_f365_t0_h0.25_l0.95");
    }

    #[test]
    fn test_directory_name_integral_fraction() {
        let mut p = params();
        p.hfrac = 1.0;
        p.trend = true;
        p.harmonic_order = 5;
        p.frequency = 23;
        p.level = 0.999;
        assert_eq!(p.directory_name(), "2010_2015_2018_k5_f23_t1_h1.0_l0.999");
    }

    #[test]
    fn test_directory_name_distinguishes_parameters() {
        let a = params();
        let mut b = params();
        b.hfrac = 0.5;
        assert_ne!(a.directory_name(), b.directory_name());
    }

    #[test]
    fn test_directory_name_is_deterministic() {
        assert_eq!(params().directory_name(), params().directory_name());
    }

    #[test]
    fn test_format_fraction() {
        assert_eq!(format_fraction(0.25), "0.25");
        assert_eq!(format_fraction(0.5), "0.5");
        assert_eq!(format_fraction(1.0), "1.0");
        assert_eq!(format_fraction(0.95), "0.95");
    }

    #[test]
    fn test_validate_accepts_ordered_dates() {
        assert!(params().validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_unordered_dates() {
        let p = ParameterSet::new(date(2015, 1, 1), date(2015, 1, 1), date(2018, 1, 1));
        assert!(matches!(p.validate(), Err(PipelineError::Config(_))));

        let p = ParameterSet::new(date(2010, 1, 1), date(2019, 1, 1), date(2018, 1, 1));
        assert!(matches!(p.validate(), Err(PipelineError::Config(_))));
    }

    #[test]
    fn test_validate_rejects_bad_fraction() {
        let mut p = params();
        p.hfrac = 0.0;
        assert!(p.validate().is_err());
    }

    #[test]
    fn test_monitoring_uses_significance_complement() {
        let mut p = params();
        p.level = 0.99;
        let m = p.monitoring();
        assert!((m.significance_level - 0.01).abs() < 1e-12);
        assert_eq!(m.monitor_start, date(2015, 1, 1));
        assert_eq!(m.harmonic_order, 3);
    }

    #[test]
    fn test_crop_window_spans_history_to_monitor_end() {
        let crop = params().crop_window();
        assert_eq!(crop.start, date(2010, 1, 1));
        assert_eq!(crop.end, date(2018, 12, 31));
    }

    #[test]
    fn test_history_warning() {
        let dates: Vec<NaiveDate> = (0..50)
            .map(|i| date(2012, 1, 1) + chrono::Duration::days(30 * i))
            .collect();
        let series = DateSeries::new(dates).unwrap();

        let p = ParameterSet::new(date(2012, 1, 1), date(2014, 1, 1), date(2016, 1, 1));
        assert!(p.history_len(&series) < MIN_HISTORY_IMAGES);
        assert!(p.history_warning(&series).is_some());

        let p = ParameterSet::new(date(2012, 1, 1), date(2015, 6, 1), date(2016, 1, 1));
        assert!(p.history_warning(&series).is_none());
    }

    #[test]
    fn test_backend_round_trip_names() {
        for backend in [Backend::OpenCl, Backend::Python, Backend::PythonMp] {
            assert_eq!(backend.as_str().parse::<Backend>().unwrap(), backend);
        }
        assert!("cuda".parse::<Backend>().is_err());
    }
}
