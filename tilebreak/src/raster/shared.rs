//! Mutex-guarded raster handles shared by the window workers of one tile.

use std::path::{Path, PathBuf};

use parking_lot::Mutex;

use super::types::{BreakBlock, PixelCube, PixelWindow, RasterError, RasterProfile};
use super::{DestinationRaster, SourceRaster};

/// Source raster shared across workers.
///
/// The handle is only reachable through [`read_block`](Self::read_block),
/// which serializes physical reads. The `i16` cast happens after the lock
/// is released.
pub struct SharedSource {
    path: PathBuf,
    profile: RasterProfile,
    raster: Mutex<Box<dyn SourceRaster>>,
}

impl SharedSource {
    /// Take ownership of an opened source raster.
    pub fn new(path: impl Into<PathBuf>, raster: Box<dyn SourceRaster>) -> Self {
        let profile = raster.profile().clone();
        Self {
            path: path.into(),
            profile,
            raster: Mutex::new(raster),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn profile(&self) -> &RasterProfile {
        &self.profile
    }

    /// Read the pixel cube of `window` as `i16` samples.
    pub fn read_block(&self, window: &PixelWindow) -> Result<PixelCube, RasterError> {
        if !window.fits_in(self.profile.width, self.profile.height) {
            return Err(RasterError::OutOfBounds {
                window: *window,
                width: self.profile.width,
                height: self.profile.height,
            });
        }

        let samples = {
            let mut raster = self.raster.lock();
            raster.read_window(window)?
        };

        PixelCube::from_samples(
            self.profile.band_count,
            window.height,
            window.width,
            &samples,
        )
    }
}

/// Destination raster shared across workers.
///
/// Writes are serialized so that blocks never interleave.
pub struct SharedDestination {
    path: PathBuf,
    width: usize,
    height: usize,
    raster: Mutex<Box<dyn DestinationRaster>>,
}

impl SharedDestination {
    /// Take ownership of a created destination raster.
    pub fn new(
        path: impl Into<PathBuf>,
        profile: &RasterProfile,
        raster: Box<dyn DestinationRaster>,
    ) -> Self {
        Self {
            path: path.into(),
            width: profile.width,
            height: profile.height,
            raster: Mutex::new(raster),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write `block` at the offset of `window`.
    pub fn write_block(&self, window: &PixelWindow, block: &BreakBlock) -> Result<(), RasterError> {
        self.write_block_then(window, block, || {})
    }

    /// Write `block`, then run `on_written` before the write lock is released.
    pub(crate) fn write_block_then<F: FnOnce()>(
        &self,
        window: &PixelWindow,
        block: &BreakBlock,
        on_written: F,
    ) -> Result<(), RasterError> {
        if !window.fits_in(self.width, self.height) {
            return Err(RasterError::OutOfBounds {
                window: *window,
                width: self.width,
                height: self.height,
            });
        }
        if block.width() != window.width || block.height() != window.height {
            return Err(RasterError::Shape {
                expected: window.pixel_count(),
                actual: block.width() * block.height(),
            });
        }

        let mut raster = self.raster.lock();
        raster.write_window(window, block)?;
        on_written();
        Ok(())
    }

    /// Flush and close the underlying raster.
    pub fn close(self) -> Result<(), RasterError> {
        self.raster.into_inner().close()
    }
}
