//! Observation dates of a tile's raster stack.
//!
//! Each tile folder carries a `dates.csv` file with one ISO `YYYY-MM-DD`
//! date per line, one line per raster band, in ascending order. This module
//! parses that file into a [`DateSeries`] and provides the date arithmetic
//! the worker pool needs:
//!
//! - cropping a series to the `[history_start, monitoring_end]` range
//!   ([`CropWindow`])
//! - locating the monitoring sub-series inside a cropped series
//! - converting break indices into decimal years ([`decimal`])

pub mod decimal;

use std::fs;
use std::ops::Range;
use std::path::Path;

use chrono::NaiveDate;
use thiserror::Error;

use crate::error::{PipelineError, PipelineResult};

pub use decimal::{break_to_decimal_year, decimal_year, to_decimal_years, NO_BREAK};

/// Date format used in date list files and configuration.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Errors raised while building a date series.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DateSeriesError {
    /// A line is not a valid `YYYY-MM-DD` date.
    #[error("line {line}: '{value}' is not a YYYY-MM-DD date")]
    Parse { line: usize, value: String },

    /// A date is not strictly after its predecessor.
    #[error("line {line}: {date} is not after the previous date")]
    NotIncreasing { line: usize, date: NaiveDate },

    /// The series holds no dates.
    #[error("no dates found")]
    Empty,
}

/// Parse a single `YYYY-MM-DD` date.
pub fn parse_date(value: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), DATE_FORMAT).ok()
}

/// Strictly increasing sequence of observation dates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DateSeries {
    dates: Vec<NaiveDate>,
}

impl DateSeries {
    /// Build a series, checking that dates are strictly increasing.
    pub fn new(dates: Vec<NaiveDate>) -> Result<Self, DateSeriesError> {
        if dates.is_empty() {
            return Err(DateSeriesError::Empty);
        }
        for (i, pair) in dates.windows(2).enumerate() {
            if pair[1] <= pair[0] {
                return Err(DateSeriesError::NotIncreasing {
                    line: i + 2,
                    date: pair[1],
                });
            }
        }
        Ok(Self { dates })
    }

    /// Parse the content of a date list file. Blank lines are ignored.
    pub fn parse(content: &str) -> Result<Self, DateSeriesError> {
        let mut dates = Vec::new();
        for (i, line) in content.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            let date = parse_date(line).ok_or_else(|| DateSeriesError::Parse {
                line: i + 1,
                value: line.trim().to_string(),
            })?;
            dates.push(date);
        }
        Self::new(dates)
    }

    /// Load a date list file from disk.
    pub fn load(path: &Path) -> PipelineResult<Self> {
        let content = fs::read_to_string(path).map_err(|e| PipelineError::io(path, e))?;
        Self::parse(&content).map_err(|e| PipelineError::Dates {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }

    /// Number of dates (equals the band count of the matching raster).
    pub fn len(&self) -> usize {
        self.dates.len()
    }

    /// Always false for a constructed series; provided for API symmetry.
    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    /// Borrow the dates as a slice.
    pub fn as_slice(&self) -> &[NaiveDate] {
        &self.dates
    }

    /// First date of the series.
    pub fn first(&self) -> NaiveDate {
        self.dates[0]
    }

    /// Last date of the series.
    pub fn last(&self) -> NaiveDate {
        self.dates[self.dates.len() - 1]
    }
}

/// Closed date range `[start, end]` used to crop a series before fitting.
///
/// `start` is the beginning of the history period and `end` the end of the
/// monitoring period.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CropWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl CropWindow {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    /// Index range of `dates` that falls inside the window.
    ///
    /// `dates` must be sorted ascending.
    pub fn index_range(&self, dates: &[NaiveDate]) -> Range<usize> {
        let lo = dates.partition_point(|d| *d < self.start);
        let hi = dates.partition_point(|d| *d <= self.end);
        lo..hi.max(lo)
    }
}

/// Locate the monitoring sub-series `[monitor_start, monitor_end]` inside
/// a (cropped) sorted series.
///
/// The start is the first date on or after `monitor_start` and the end the
/// last date on or before `monitor_end`, both inclusive. Returns `None`
/// when no date falls inside the monitoring period.
pub fn monitoring_range(
    dates: &[NaiveDate],
    monitor_start: NaiveDate,
    monitor_end: NaiveDate,
) -> Option<Range<usize>> {
    let range = CropWindow::new(monitor_start, monitor_end).index_range(dates);
    if range.is_empty() {
        None
    } else {
        Some(range)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_parse_ignores_blank_lines() {
        let series = DateSeries::parse("2015-01-01\n\n2015-02-01\n   \n2015-03-01\n").unwrap();
        assert_eq!(series.len(), 3);
        assert_eq!(series.first(), date(2015, 1, 1));
        assert_eq!(series.last(), date(2015, 3, 1));
    }

    #[test]
    fn test_parse_rejects_bad_line() {
        let err = DateSeries::parse("2015-01-01\n2015/02/01\n").unwrap_err();
        assert_eq!(
            err,
            DateSeriesError::Parse {
                line: 2,
                value: "2015/02/01".to_string()
            }
        );
    }

    #[test]
    fn test_parse_rejects_unordered_dates() {
        let err = DateSeries::parse("2015-03-01\n2015-02-01\n").unwrap_err();
        assert!(matches!(err, DateSeriesError::NotIncreasing { line: 2, .. }));
    }

    #[test]
    fn test_parse_rejects_duplicates() {
        let err = DateSeries::parse("2015-03-01\n2015-03-01\n").unwrap_err();
        assert!(matches!(err, DateSeriesError::NotIncreasing { .. }));
    }

    #[test]
    fn test_empty_file_is_rejected() {
        assert_eq!(DateSeries::parse("\n\n").unwrap_err(), DateSeriesError::Empty);
    }

    #[test]
    fn test_load_reports_path() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("dates.csv");
        std::fs::write(&path, "not-a-date\n").unwrap();

        let err = DateSeries::load(&path).unwrap_err();
        assert!(matches!(err, PipelineError::Dates { .. }));
        assert!(err.to_string().contains("dates.csv"));
    }

    #[test]
    fn test_crop_window_is_inclusive() {
        let dates = [
            date(2010, 1, 1),
            date(2011, 1, 1),
            date(2012, 1, 1),
            date(2013, 1, 1),
        ];
        let crop = CropWindow::new(date(2011, 1, 1), date(2012, 1, 1));
        assert_eq!(crop.index_range(&dates), 1..3);
    }

    #[test]
    fn test_crop_window_between_dates() {
        let dates = [date(2010, 1, 1), date(2011, 1, 1), date(2012, 1, 1)];
        let crop = CropWindow::new(date(2010, 6, 1), date(2011, 6, 1));
        assert_eq!(crop.index_range(&dates), 1..2);
    }

    #[test]
    fn test_monitoring_range_exact_dates() {
        let dates = [
            date(2015, 1, 1),
            date(2016, 1, 1),
            date(2017, 1, 1),
            date(2018, 1, 1),
        ];
        let range = monitoring_range(&dates, date(2016, 1, 1), date(2018, 1, 1)).unwrap();
        assert_eq!(range, 1..4);
    }

    #[test]
    fn test_monitoring_range_empty() {
        let dates = [date(2015, 1, 1), date(2016, 1, 1)];
        assert!(monitoring_range(&dates, date(2017, 1, 1), date(2018, 1, 1)).is_none());
    }
}
