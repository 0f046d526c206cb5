//! Change-detection model abstraction.
//!
//! The pipeline treats the statistical model as an opaque collaborator: it
//! hands over a cropped pixel cube with its dates and receives, per pixel,
//! a break index and a magnitude.
//!
//! # Implementors
//!
//! - [`HarmonicMosumModel`] - trend + harmonic OLS fit with a MOSUM monitor

mod harmonic;

use chrono::NaiveDate;
use thiserror::Error;

use crate::params::MonitoringParameters;
use crate::raster::PixelCube;

pub use harmonic::HarmonicMosumModel;

/// Break index for pixels whose series cannot be modelled.
pub const NOT_ENOUGH_DATA: i32 = -2;

/// Errors raised by a model fit.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ModelError {
    /// The cube and the date list disagree on the number of observations.
    #[error("cube has {bands} bands but {dates} dates were given")]
    LengthMismatch { bands: usize, dates: usize },

    /// The model returned arrays that do not match the window.
    #[error("model returned {breaks} breaks and {magnitudes} magnitudes for {pixels} pixels")]
    OutputShape {
        pixels: usize,
        breaks: usize,
        magnitudes: usize,
    },

    /// No observation falls in the monitoring period.
    #[error("no observation in the monitoring period")]
    EmptyMonitoring,

    /// Any other model failure.
    #[error("{0}")]
    Failed(String),
}

/// Per-pixel output of a model fit, in the pixel order of the cube.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelOutput {
    /// 1-based index into the monitoring dates, negative when no break.
    pub breaks: Vec<i32>,
    /// Magnitude of the change.
    pub magnitudes: Vec<f32>,
}

impl ModelOutput {
    /// Check that the output covers exactly `pixels` pixels.
    pub fn check_shape(&self, pixels: usize) -> Result<(), ModelError> {
        if self.breaks.len() != pixels || self.magnitudes.len() != pixels {
            return Err(ModelError::OutputShape {
                pixels,
                breaks: self.breaks.len(),
                magnitudes: self.magnitudes.len(),
            });
        }
        Ok(())
    }
}

/// Pixel-wise structural break detection.
///
/// Implementations must be thread-safe: the worker pool calls `fit`
/// concurrently from several threads, one window per call.
pub trait ChangeDetectionModel: Send + Sync {
    /// Short name for logging.
    fn name(&self) -> &str;

    /// Fit the model on `cube`, whose bands align with `dates`.
    fn fit(
        &self,
        cube: &PixelCube,
        dates: &[NaiveDate],
        params: &MonitoringParameters,
    ) -> Result<ModelOutput, ModelError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_shape() {
        let out = ModelOutput {
            breaks: vec![1, -1],
            magnitudes: vec![0.5, 0.0],
        };
        assert!(out.check_shape(2).is_ok());
        assert_eq!(
            out.check_shape(3),
            Err(ModelError::OutputShape {
                pixels: 3,
                breaks: 2,
                magnitudes: 2
            })
        );
    }

    #[test]
    fn test_trait_is_send_sync() {
        fn assert_send_sync<T: Send + Sync + ?Sized>() {}
        assert_send_sync::<dyn ChangeDetectionModel>();
    }
}
