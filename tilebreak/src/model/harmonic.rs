//! Trend + harmonic regression with a MOSUM monitor.
//!
//! For each pixel a season-trend model
//!
//! ```text
//! y(t) = a + b·t + Σⱼ₌₁ᵏ [cⱼ·sin(2πjt) + dⱼ·cos(2πjt)]
//! ```
//!
//! is fitted by ordinary least squares on the history period (the trend
//! term is optional). The residuals are then monitored over the
//! monitoring period with a moving sum of bandwidth `h = ⌊hfrac·n⌋`,
//! scaled by `σ̂·√n`, against the boundary
//!
//! ```text
//! λ · √(log⁺(t / n)),   λ = z(1 − α/2) · √hfrac
//! ```
//!
//! where `n` is the history length and `log⁺(x) = max(1, ln x)`. The first
//! crossing is the break (1-based in the monitoring period) and the
//! magnitude is the median monitoring residual.
//!
//! The critical value `λ` is a normal approximation. It is not taken from
//! the simulated OLS-MOSUM tables, which depend on both `hfrac` and the
//! level, so breaks close to the boundary can differ from a table-based
//! monitor.
//!
//! Time is measured in decimal years, so the seasonal period is one year
//! whatever the observation frequency. The design matrix depends only on
//! the dates, so it is factorized once per window and reused for every
//! pixel.

use std::f64::consts::PI;

use chrono::NaiveDate;
use nalgebra::{Cholesky, DMatrix, DVector, Dyn};
use statrs::distribution::{ContinuousCDF, Normal};
use tracing::trace;

use super::{ChangeDetectionModel, ModelError, ModelOutput, NOT_ENOUGH_DATA};
use crate::dates::{decimal_year, NO_BREAK};
use crate::params::MonitoringParameters;
use crate::raster::PixelCube;

/// Relative pivot size below which XᵀX is treated as singular.
const SINGULAR_EPS: f64 = 1e-10;

/// Reference CPU implementation of [`ChangeDetectionModel`].
#[derive(Debug, Clone, Default)]
pub struct HarmonicMosumModel;

impl HarmonicMosumModel {
    pub fn new() -> Self {
        Self
    }
}

impl ChangeDetectionModel for HarmonicMosumModel {
    fn name(&self) -> &str {
        "harmonic-mosum"
    }

    fn fit(
        &self,
        cube: &PixelCube,
        dates: &[NaiveDate],
        params: &MonitoringParameters,
    ) -> Result<ModelOutput, ModelError> {
        if cube.bands() != dates.len() {
            return Err(ModelError::LengthMismatch {
                bands: cube.bands(),
                dates: dates.len(),
            });
        }

        let n_hist = dates.partition_point(|d| *d < params.monitor_start);
        if n_hist == dates.len() {
            return Err(ModelError::EmptyMonitoring);
        }

        let pixels = cube.pixel_count();
        let times: Vec<f64> = dates.iter().map(|d| decimal_year(*d)).collect();
        let design = DesignMatrix::build(&times, params.harmonic_order, params.include_trend);

        let Some(factor) = design.factorize(n_hist) else {
            trace!(n_hist, cols = design.cols(), "History too short or singular design");
            return Ok(ModelOutput {
                breaks: vec![NOT_ENOUGH_DATA; pixels],
                magnitudes: vec![0.0; pixels],
            });
        };

        let monitor = Monitor::new(n_hist, params)?;

        let mut breaks = Vec::with_capacity(pixels);
        let mut magnitudes = Vec::with_capacity(pixels);

        for pixel in 0..pixels {
            let series =
                DVector::from_iterator(dates.len(), cube.pixel_series(pixel).map(f64::from));
            let beta = design.solve(&factor, &series, n_hist);
            let residuals = design.residuals(&series, &beta);

            let (brk, magnitude) = monitor.run(residuals.as_slice(), design.cols());
            breaks.push(brk);
            magnitudes.push(magnitude as f32);
        }

        Ok(ModelOutput { breaks, magnitudes })
    }
}

/// Design matrix over all observations, one row per date.
struct DesignMatrix {
    x: DMatrix<f64>,
}

impl DesignMatrix {
    fn build(times: &[f64], order: u32, trend: bool) -> Self {
        let t0 = times.first().copied().unwrap_or(0.0);
        let cols = 1 + usize::from(trend) + 2 * order as usize;

        let entries = times.iter().flat_map(|&t| {
            let mut row = Vec::with_capacity(cols);
            row.push(1.0);
            if trend {
                row.push(t - t0);
            }
            for j in 1..=order {
                let angle = 2.0 * PI * j as f64 * t;
                row.push(angle.sin());
                row.push(angle.cos());
            }
            row
        });

        Self {
            x: DMatrix::from_row_iterator(times.len(), cols, entries),
        }
    }

    fn cols(&self) -> usize {
        self.x.ncols()
    }

    /// Cholesky factor of XᵀX over the first `n` rows.
    ///
    /// `None` when the history is not longer than the number of
    /// coefficients or the matrix is numerically singular.
    fn factorize(&self, n: usize) -> Option<Cholesky<f64, Dyn>> {
        if n <= self.cols() {
            return None;
        }
        let history = self.x.rows(0, n);
        let gram = history.tr_mul(&history);
        let scale = gram.diagonal().max().max(1.0);

        let factor = gram.cholesky()?;
        let pivot = factor.l_dirty().diagonal().min();
        (pivot * pivot > SINGULAR_EPS * scale).then_some(factor)
    }

    /// OLS coefficients fitted on the first `n` observations of `y`.
    fn solve(&self, factor: &Cholesky<f64, Dyn>, y: &DVector<f64>, n: usize) -> DVector<f64> {
        factor.solve(&self.x.rows(0, n).tr_mul(&y.rows(0, n)))
    }

    fn residuals(&self, y: &DVector<f64>, beta: &DVector<f64>) -> DVector<f64> {
        y - &self.x * beta
    }
}

/// MOSUM monitor shared by all pixels of a window.
struct Monitor {
    n_hist: usize,
    bandwidth: usize,
    lambda: f64,
}

impl Monitor {
    fn new(n_hist: usize, params: &MonitoringParameters) -> Result<Self, ModelError> {
        let alpha = params.significance_level;
        let lambda = if alpha <= 0.0 {
            f64::INFINITY
        } else if alpha >= 1.0 {
            0.0
        } else {
            let normal = Normal::new(0.0, 1.0).map_err(|e| ModelError::Failed(e.to_string()))?;
            normal.inverse_cdf(1.0 - alpha / 2.0) * params.harmonic_fraction.sqrt()
        };
        let bandwidth =
            ((params.harmonic_fraction * n_hist as f64).floor() as usize).clamp(1, n_hist);

        Ok(Self {
            n_hist,
            bandwidth,
            lambda,
        })
    }

    /// Returns `(break index, magnitude)` for one pixel's residuals.
    fn run(&self, residuals: &[f64], params: usize) -> (i32, f64) {
        let n = self.n_hist;
        let mut monitoring: Vec<f64> = residuals[n..].to_vec();
        let magnitude = median(&mut monitoring);

        let rss: f64 = residuals[..n].iter().map(|r| r * r).sum();
        let sigma = (rss / (n - params) as f64).sqrt();
        if !(sigma.is_finite() && sigma > 0.0) {
            return (NO_BREAK, magnitude);
        }

        let scale = sigma * (n as f64).sqrt();
        // Running sum over residuals[g - h + 1..=g].
        let mut window: f64 = residuals[n - self.bandwidth..n].iter().sum();
        for g in n..residuals.len() {
            window += residuals[g] - residuals[g - self.bandwidth];
            let mosum = window / scale;
            let boundary = self.lambda * log_plus((g + 1) as f64 / n as f64).sqrt();
            if mosum.abs() > boundary {
                return ((g - n + 1) as i32, magnitude);
            }
        }
        (NO_BREAK, magnitude)
    }
}

fn log_plus(x: f64) -> f64 {
    x.ln().max(1.0)
}

/// Median of `values`, 0 for an empty slice. Reorders `values`.
fn median(values: &mut [f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.sort_by(|a, b| a.total_cmp(b));
    let mid = values.len() / 2;
    if values.len() % 2 == 0 {
        (values[mid - 1] + values[mid]) / 2.0
    } else {
        values[mid]
    }
}
