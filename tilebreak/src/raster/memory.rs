//! In-process raster store.
//!
//! Rasters live in a shared map keyed by path. Sources are registered up
//! front with [`MemoryRasterStore::insert`]; destinations become visible in
//! the map once they are closed, so an aborted tile leaves nothing behind.
//!
//! Mosaics are written to disk as a plain-text manifest listing one input
//! path per line. The store can also be told to fail reads for a path or
//! to "build" mosaics without writing anything, which mimics a mosaic tool
//! that fails silently.

use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::debug;

use super::types::{BreakBlock, PixelWindow, RasterError, RasterProfile};
use super::{DestinationRaster, RasterStore, SourceRaster};

/// Band-major raster held in memory.
#[derive(Debug, Clone, PartialEq)]
pub struct MemoryRaster {
    profile: RasterProfile,
    data: Vec<f64>,
}

impl MemoryRaster {
    /// Wrap band-major values, checking the buffer size.
    pub fn new(profile: RasterProfile, data: Vec<f64>) -> Result<Self, RasterError> {
        let expected = profile.band_count * profile.pixel_count();
        if data.len() != expected {
            return Err(RasterError::Shape {
                expected,
                actual: data.len(),
            });
        }
        Ok(Self { profile, data })
    }

    /// Raster filled with `value`.
    pub fn filled(profile: RasterProfile, value: f64) -> Self {
        let len = profile.band_count * profile.pixel_count();
        Self {
            profile,
            data: vec![value; len],
        }
    }

    /// Raster whose values are computed from `(band, row, col)`.
    pub fn from_fn<F>(profile: RasterProfile, f: F) -> Self
    where
        F: Fn(usize, usize, usize) -> f64,
    {
        let mut data = Vec::with_capacity(profile.band_count * profile.pixel_count());
        for band in 0..profile.band_count {
            for row in 0..profile.height {
                for col in 0..profile.width {
                    data.push(f(band, row, col));
                }
            }
        }
        Self { profile, data }
    }

    pub fn profile(&self) -> &RasterProfile {
        &self.profile
    }

    /// All values, band-major.
    pub fn data(&self) -> &[f64] {
        &self.data
    }

    /// Values of one zero-based band.
    pub fn band(&self, band: usize) -> &[f64] {
        let stride = self.profile.pixel_count();
        &self.data[band * stride..(band + 1) * stride]
    }

    /// Value at `(band, row, col)`.
    pub fn get(&self, band: usize, row: usize, col: usize) -> f64 {
        self.data[self.index(band, row, col)]
    }

    fn index(&self, band: usize, row: usize, col: usize) -> usize {
        band * self.profile.pixel_count() + row * self.profile.width + col
    }

    fn read(&self, window: &PixelWindow) -> Vec<f64> {
        let mut out = Vec::with_capacity(self.profile.band_count * window.pixel_count());
        for band in 0..self.profile.band_count {
            for row in window.row_off..window.row_off + window.height {
                let start = self.index(band, row, window.col_off);
                out.extend_from_slice(&self.data[start..start + window.width]);
            }
        }
        out
    }

    fn write(&mut self, window: &PixelWindow, block: &BreakBlock) {
        for band in 0..self.profile.band_count.min(2) {
            let values = block.band(band);
            for r in 0..window.height {
                let start = self.index(band, window.row_off + r, window.col_off);
                let src = &values[r * window.width..(r + 1) * window.width];
                for (dst, v) in self.data[start..start + window.width].iter_mut().zip(src) {
                    *dst = *v as f64;
                }
            }
        }
    }
}

type RasterMap = Arc<Mutex<HashMap<PathBuf, MemoryRaster>>>;

/// [`RasterStore`] keeping every raster in memory.
#[derive(Default)]
pub struct MemoryRasterStore {
    rasters: RasterMap,
    opened: Mutex<Vec<PathBuf>>,
    failing_reads: Mutex<HashSet<PathBuf>>,
    skip_mosaic_write: AtomicBool,
}

impl MemoryRasterStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a raster at `path`.
    pub fn insert(&self, path: impl AsRef<Path>, raster: MemoryRaster) {
        self.rasters
            .lock()
            .insert(path.as_ref().to_path_buf(), raster);
    }

    /// Copy of the raster stored at `path`.
    pub fn raster(&self, path: impl AsRef<Path>) -> Option<MemoryRaster> {
        self.rasters.lock().get(path.as_ref()).cloned()
    }

    /// Paths passed to `open_source`, in call order.
    pub fn opened_sources(&self) -> Vec<PathBuf> {
        self.opened.lock().clone()
    }

    /// Make every read from the source at `path` fail.
    pub fn fail_reads(&self, path: impl AsRef<Path>) {
        self.failing_reads
            .lock()
            .insert(path.as_ref().to_path_buf());
    }

    /// When set, `build_mosaic` returns `Ok` without writing the mosaic.
    pub fn set_skip_mosaic_write(&self, skip: bool) {
        self.skip_mosaic_write.store(skip, Ordering::SeqCst);
    }
}

impl RasterStore for MemoryRasterStore {
    fn open_source(&self, path: &Path) -> Result<Box<dyn SourceRaster>, RasterError> {
        self.opened.lock().push(path.to_path_buf());

        let raster = self.raster(path).ok_or(RasterError::NotFound)?;
        let fail_reads = self.failing_reads.lock().contains(path);
        Ok(Box::new(MemorySource { raster, fail_reads }))
    }

    fn create_destination(
        &self,
        path: &Path,
        profile: &RasterProfile,
    ) -> Result<Box<dyn DestinationRaster>, RasterError> {
        Ok(Box::new(MemoryDestination {
            path: path.to_path_buf(),
            raster: MemoryRaster::filled(profile.clone(), f64::NAN),
            rasters: Arc::clone(&self.rasters),
        }))
    }

    fn build_mosaic(&self, path: &Path, inputs: &[PathBuf]) -> Result<(), RasterError> {
        if self.skip_mosaic_write.load(Ordering::SeqCst) {
            debug!(path = %path.display(), "Skipping mosaic write");
            return Ok(());
        }

        let manifest: String = inputs
            .iter()
            .map(|p| format!("{}\n", p.display()))
            .collect();
        fs::write(path, manifest).map_err(|e| RasterError::Write(e.to_string()))
    }
}

struct MemorySource {
    raster: MemoryRaster,
    fail_reads: bool,
}

impl SourceRaster for MemorySource {
    fn profile(&self) -> &RasterProfile {
        self.raster.profile()
    }

    fn read_window(&mut self, window: &PixelWindow) -> Result<Vec<f64>, RasterError> {
        if self.fail_reads {
            return Err(RasterError::Read("simulated read failure".to_string()));
        }
        let profile = self.raster.profile();
        if !window.fits_in(profile.width, profile.height) {
            return Err(RasterError::OutOfBounds {
                window: *window,
                width: profile.width,
                height: profile.height,
            });
        }
        Ok(self.raster.read(window))
    }
}

struct MemoryDestination {
    path: PathBuf,
    raster: MemoryRaster,
    rasters: RasterMap,
}

impl DestinationRaster for MemoryDestination {
    fn write_window(
        &mut self,
        window: &PixelWindow,
        block: &BreakBlock,
    ) -> Result<(), RasterError> {
        let profile = self.raster.profile();
        if !window.fits_in(profile.width, profile.height) {
            return Err(RasterError::OutOfBounds {
                window: *window,
                width: profile.width,
                height: profile.height,
            });
        }
        self.raster.write(window, block);
        Ok(())
    }

    fn close(self: Box<Self>) -> Result<(), RasterError> {
        let MemoryDestination {
            path,
            raster,
            rasters,
        } = *self;
        rasters.lock().insert(path, raster);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raster::DataType;

    #[test]
    fn test_memory_raster_rejects_bad_size() {
        let profile = RasterProfile::new(2, 2, 3, DataType::Int16);
        assert!(MemoryRaster::new(profile.clone(), vec![0.0; 12]).is_ok());
        assert!(MemoryRaster::new(profile, vec![0.0; 11]).is_err());
    }

    #[test]
    fn test_open_missing_source() {
        let store = MemoryRasterStore::new();
        let result = store.open_source(Path::new("/missing/stack.vrt"));
        assert!(matches!(result, Err(RasterError::NotFound)));
        assert_eq!(store.opened_sources(), vec![PathBuf::from("/missing/stack.vrt")]);
    }

    #[test]
    fn test_failing_reads() {
        let store = MemoryRasterStore::new();
        let path = PathBuf::from("/tiles/1/stack.vrt");
        store.insert(
            &path,
            MemoryRaster::filled(RasterProfile::new(2, 2, 1, DataType::Int16), 1.0),
        );
        store.fail_reads(&path);

        let mut source = store.open_source(&path).unwrap();
        let err = source
            .read_window(&PixelWindow::new(0, 0, 2, 2))
            .unwrap_err();
        assert!(matches!(err, RasterError::Read(_)));
    }

    #[test]
    fn test_destination_visible_after_close_only() {
        let store = MemoryRasterStore::new();
        let path = PathBuf::from("/out/tile.tif");
        let profile = RasterProfile::new(2, 1, 2, DataType::Float32);

        let mut dest = store.create_destination(&path, &profile).unwrap();
        let block = BreakBlock::new(1, 2, vec![2016.5, f32::NAN], vec![-3.0, 0.0]).unwrap();
        dest.write_window(&PixelWindow::new(0, 0, 2, 1), &block)
            .unwrap();
        assert!(store.raster(&path).is_none());

        dest.close().unwrap();
        let raster = store.raster(&path).unwrap();
        assert_eq!(raster.band(0)[0], 2016.5);
        assert!(raster.band(0)[1].is_nan());
        assert_eq!(raster.band(1), &[-3.0, 0.0]);
    }

    #[test]
    fn test_mosaic_manifest() {
        let dir = tempfile::TempDir::new().unwrap();
        let store = MemoryRasterStore::new();
        let path = dir.path().join("bfast_outputs.vrt");
        let inputs = vec![PathBuf::from("/a/0.tif"), PathBuf::from("/a/1.tif")];

        store.build_mosaic(&path, &inputs).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "/a/0.tif\n/a/1.tif\n");
    }

    #[test]
    fn test_skip_mosaic_write() {
        let dir = tempfile::TempDir::new().unwrap();
        let store = MemoryRasterStore::new();
        store.set_skip_mosaic_write(true);
        let path = dir.path().join("bfast_outputs.vrt");

        store.build_mosaic(&path, &[]).unwrap();
        assert!(!path.exists());
    }
}
