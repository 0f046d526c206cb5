//! Error types for the change-detection pipeline.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::model::ModelError;
use crate::raster::{PixelWindow, RasterError};

/// Result type for pipeline operations.
pub type PipelineResult<T> = Result<T, PipelineError>;

/// Errors that can occur while running the tiled pipeline.
///
/// Every variant is fatal for the run: nothing in the pipeline retries.
/// Resumability across runs comes from the resume log only.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Caller-supplied parameters are unusable (dates out of order, no tiles).
    #[error("invalid configuration: {0}")]
    Config(String),

    /// Filesystem operation failed.
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The raster backend failed to open, read or write a raster.
    #[error("raster error on {}: {source}", path.display())]
    Raster {
        path: PathBuf,
        #[source]
        source: RasterError,
    },

    /// A date list file is unreadable or inconsistent with its raster.
    #[error("invalid date list {}: {reason}", path.display())]
    Dates { path: PathBuf, reason: String },

    /// The change-detection model rejected a window.
    #[error("model fit failed for tile {tile} at window {window}: {source}")]
    ModelFit {
        tile: String,
        window: PixelWindow,
        #[source]
        source: ModelError,
    },

    /// The mosaic builder returned but no mosaic file exists.
    #[error("the vrt {} was not created", path.display())]
    MosaicNotCreated { path: PathBuf },

    /// The worker pool could not be created.
    #[error("failed to start worker pool: {0}")]
    WorkerPool(String),
}

impl PipelineError {
    /// Build an I/O error for the given path.
    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Build a raster error for the given path.
    pub(crate) fn raster(path: impl Into<PathBuf>, source: RasterError) -> Self {
        Self::Raster {
            path: path.into(),
            source,
        }
    }
}
