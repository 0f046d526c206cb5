//! GDAL-backed raster store.
//!
//! Sources are opened with `GEOREF_SOURCES=INTERNAL` so that the
//! georeferencing embedded in the stack wins over side-car files. Outputs
//! are GeoTIFFs carrying the source geotransform and projection. Mosaics
//! are GDAL VRTs built with the `gdalbuildvrt` library entry point.

use std::path::{Path, PathBuf};

use gdal::errors::GdalError;
use gdal::raster::{Buffer, GdalDataType};
use gdal::{Dataset, DatasetOptions, DriverManager, GdalOpenFlags};
use tracing::debug;

use super::types::{BreakBlock, DataType, PixelWindow, RasterError, RasterProfile};
use super::{DestinationRaster, RasterStore, SourceRaster};

fn backend(err: GdalError) -> RasterError {
    RasterError::Backend(err.to_string())
}

fn data_type(dt: GdalDataType) -> DataType {
    match dt {
        GdalDataType::UInt8 => DataType::UInt8,
        GdalDataType::Int16 => DataType::Int16,
        GdalDataType::UInt16 => DataType::UInt16,
        GdalDataType::Int32 => DataType::Int32,
        GdalDataType::Float32 => DataType::Float32,
        _ => DataType::Float64,
    }
}

/// [`RasterStore`] reading and writing files through GDAL.
#[derive(Debug, Default)]
pub struct GdalRasterStore;

impl GdalRasterStore {
    pub fn new() -> Self {
        Self
    }
}

impl RasterStore for GdalRasterStore {
    fn open_source(&self, path: &Path) -> Result<Box<dyn SourceRaster>, RasterError> {
        if !path.exists() {
            return Err(RasterError::NotFound);
        }

        let options = DatasetOptions {
            open_flags: GdalOpenFlags::GDAL_OF_RASTER | GdalOpenFlags::GDAL_OF_READONLY,
            open_options: Some(&["GEOREF_SOURCES=INTERNAL"]),
            ..Default::default()
        };
        let dataset = Dataset::open_ex(path, options).map_err(backend)?;

        let (width, height) = dataset.raster_size();
        let band_count = dataset.raster_count() as usize;
        let first = dataset.rasterband(1).map_err(backend)?;
        let (block_width, block_height) = first.block_size();

        let profile = RasterProfile {
            driver: dataset.driver().short_name(),
            width,
            height,
            band_count,
            data_type: data_type(first.band_type()),
            block_width: block_width.max(1),
            block_height: block_height.max(1),
            geo_transform: dataset.geo_transform().ok(),
            projection: Some(dataset.projection()).filter(|p| !p.is_empty()),
        };
        drop(first);

        debug!(
            path = %path.display(),
            width,
            height,
            bands = band_count,
            block_width,
            block_height,
            "Opened source raster"
        );

        Ok(Box::new(GdalSource { dataset, profile }))
    }

    fn create_destination(
        &self,
        path: &Path,
        profile: &RasterProfile,
    ) -> Result<Box<dyn DestinationRaster>, RasterError> {
        let driver = DriverManager::get_driver_by_name("GTiff").map_err(backend)?;
        let mut dataset = driver
            .create_with_band_type::<f32, _>(
                path,
                profile.width,
                profile.height,
                profile.band_count,
            )
            .map_err(backend)?;

        if let Some(gt) = profile.geo_transform.as_ref() {
            dataset.set_geo_transform(gt).map_err(backend)?;
        }
        if let Some(wkt) = profile.projection.as_deref() {
            dataset.set_projection(wkt).map_err(backend)?;
        }

        Ok(Box::new(GdalDestination { dataset }))
    }

    fn build_mosaic(&self, path: &Path, inputs: &[PathBuf]) -> Result<(), RasterError> {
        let datasets = inputs
            .iter()
            .map(Dataset::open)
            .collect::<Result<Vec<_>, _>>()
            .map_err(backend)?;

        let vrt = gdal::programs::raster::build_vrt(Some(path), &datasets, None).map_err(backend)?;
        drop(vrt);
        Ok(())
    }
}

struct GdalSource {
    dataset: Dataset,
    profile: RasterProfile,
}

impl SourceRaster for GdalSource {
    fn profile(&self) -> &RasterProfile {
        &self.profile
    }

    fn read_window(&mut self, window: &PixelWindow) -> Result<Vec<f64>, RasterError> {
        let offset = (window.col_off as isize, window.row_off as isize);
        let size = (window.width, window.height);

        let mut out = Vec::with_capacity(self.profile.band_count * window.pixel_count());
        for b in 1..=self.profile.band_count {
            let band = self.dataset.rasterband(b as _).map_err(backend)?;
            let buffer = band
                .read_as::<f64>(offset, size, size, None)
                .map_err(|e| RasterError::Read(e.to_string()))?;
            out.extend_from_slice(buffer.data());
        }
        Ok(out)
    }
}

struct GdalDestination {
    dataset: Dataset,
}

impl DestinationRaster for GdalDestination {
    fn write_window(
        &mut self,
        window: &PixelWindow,
        block: &BreakBlock,
    ) -> Result<(), RasterError> {
        let offset = (window.col_off as isize, window.row_off as isize);
        let size = (window.width, window.height);

        for b in 0..2 {
            let mut band = self.dataset.rasterband((b + 1) as _).map_err(backend)?;
            let mut buffer = Buffer::new(size, block.band(b).to_vec());
            band.write(offset, size, &mut buffer)
                .map_err(|e| RasterError::Write(e.to_string()))?;
        }
        Ok(())
    }

    fn close(self: Box<Self>) -> Result<(), RasterError> {
        let mut dataset = self.dataset;
        dataset.flush_cache().map_err(backend)
    }
}
