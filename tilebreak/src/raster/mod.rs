//! Raster access for the change-detection pipeline.
//!
//! Raster formats and codecs live behind the [`RasterStore`] trait. The
//! pipeline only ever opens a source stack, creates a two-band output and
//! asks the store to assemble a virtual mosaic.
//!
//! # Concurrency
//!
//! Backend handles are not assumed to be safe for concurrent use. Workers
//! never see them directly: an opened source is wrapped in a
//! [`SharedSource`] and an output in a [`SharedDestination`]. Each wrapper
//! owns its handle behind a mutex and exposes a single block operation.
//!
//! ```text
//! RasterStore ──open_source──────────► SharedSource::read_block   (read lock)
//!             ──create_destination───► SharedDestination::write_block (write lock)
//!             ──build_mosaic
//! ```
//!
//! # Backends
//!
//! - [`MemoryRasterStore`]: in-process rasters, used by tests and dry runs
//! - `GdalRasterStore`: GDAL-backed files (feature `gdal`)

#[cfg(feature = "gdal")]
mod gdal_store;
mod memory;
mod shared;
mod types;
mod window;

use std::path::{Path, PathBuf};

#[cfg(feature = "gdal")]
pub use gdal_store::GdalRasterStore;
pub use memory::{MemoryRaster, MemoryRasterStore};
pub use shared::{SharedDestination, SharedSource};
pub use types::{BreakBlock, DataType, PixelCube, PixelWindow, RasterError, RasterProfile};
pub use window::{block_windows, grid_windows};

/// An open multi-band source raster.
///
/// Samples are returned as `f64`, band-major, for the requested window.
pub trait SourceRaster: Send {
    /// Grid and layout of the raster.
    fn profile(&self) -> &RasterProfile;

    /// Read all bands of `window`.
    ///
    /// The result holds `band_count * window.height * window.width` values
    /// ordered `[band][row][col]`.
    fn read_window(&mut self, window: &PixelWindow) -> Result<Vec<f64>, RasterError>;
}

/// An open two-band output raster.
pub trait DestinationRaster: Send {
    /// Write a result block at the window's offset.
    fn write_window(&mut self, window: &PixelWindow, block: &BreakBlock) -> Result<(), RasterError>;

    /// Flush and close the raster.
    fn close(self: Box<Self>) -> Result<(), RasterError>;
}

/// Raster backend used by the pipeline.
pub trait RasterStore: Send + Sync {
    /// Open an existing raster for reading.
    fn open_source(&self, path: &Path) -> Result<Box<dyn SourceRaster>, RasterError>;

    /// Create (or truncate) an output raster with the given profile.
    fn create_destination(
        &self,
        path: &Path,
        profile: &RasterProfile,
    ) -> Result<Box<dyn DestinationRaster>, RasterError>;

    /// Build a virtual mosaic at `path` referencing `inputs`.
    ///
    /// Implementations may return `Ok` without producing a file; callers
    /// must verify the result (see [`crate::mosaic::MosaicBuilder`]).
    fn build_mosaic(&self, path: &Path, inputs: &[PathBuf]) -> Result<(), RasterError>;
}
