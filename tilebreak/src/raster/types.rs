//! Value types exchanged with raster backends.

use std::fmt;

use thiserror::Error;

/// Errors reported by raster backends.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RasterError {
    /// No raster exists at the requested location.
    #[error("raster not found")]
    NotFound,

    /// Reading pixel data failed.
    #[error("read failed: {0}")]
    Read(String),

    /// Writing pixel data failed.
    #[error("write failed: {0}")]
    Write(String),

    /// A window reaches outside the raster grid.
    #[error("window {window} is outside the {width}x{height} grid")]
    OutOfBounds {
        window: PixelWindow,
        width: usize,
        height: usize,
    },

    /// A buffer does not have the size its shape implies.
    #[error("buffer holds {actual} values, expected {expected}")]
    Shape { expected: usize, actual: usize },

    /// Any other backend failure.
    #[error("{0}")]
    Backend(String),
}

/// Rectangular region of a raster grid, in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PixelWindow {
    /// Column of the top-left pixel.
    pub col_off: usize,
    /// Row of the top-left pixel.
    pub row_off: usize,
    pub width: usize,
    pub height: usize,
}

impl PixelWindow {
    pub fn new(col_off: usize, row_off: usize, width: usize, height: usize) -> Self {
        Self {
            col_off,
            row_off,
            width,
            height,
        }
    }

    /// Number of pixels covered by the window.
    pub fn pixel_count(&self) -> usize {
        self.width * self.height
    }

    /// True when the window lies entirely inside a `width` x `height` grid.
    pub fn fits_in(&self, width: usize, height: usize) -> bool {
        self.col_off + self.width <= width && self.row_off + self.height <= height
    }
}

impl fmt::Display for PixelWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}x{}@({},{})",
            self.width, self.height, self.col_off, self.row_off
        )
    }
}

/// Sample type of a raster band.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataType {
    UInt8,
    Int16,
    UInt16,
    Int32,
    Float32,
    Float64,
}

/// Grid, layout and georeferencing of a raster.
#[derive(Debug, Clone, PartialEq)]
pub struct RasterProfile {
    /// Driver or format name (e.g. `"VRT"`, `"GTiff"`).
    pub driver: String,
    pub width: usize,
    pub height: usize,
    pub band_count: usize,
    pub data_type: DataType,
    /// Native block width, the unit of efficient I/O.
    pub block_width: usize,
    /// Native block height.
    pub block_height: usize,
    /// Affine geotransform, when the raster is georeferenced.
    pub geo_transform: Option<[f64; 6]>,
    /// Coordinate reference system as WKT.
    pub projection: Option<String>,
}

impl RasterProfile {
    /// Profile with no georeferencing and a single block covering the grid.
    pub fn new(width: usize, height: usize, band_count: usize, data_type: DataType) -> Self {
        Self {
            driver: "MEM".to_string(),
            width,
            height,
            band_count,
            data_type,
            block_width: width.max(1),
            block_height: height.max(1),
            geo_transform: None,
            projection: None,
        }
    }

    /// Set the native block size.
    pub fn with_block_size(mut self, block_width: usize, block_height: usize) -> Self {
        self.block_width = block_width.max(1);
        self.block_height = block_height.max(1);
        self
    }

    /// Set the geotransform.
    pub fn with_geo_transform(mut self, geo_transform: [f64; 6]) -> Self {
        self.geo_transform = Some(geo_transform);
        self
    }

    /// Profile of a change-detection output for this source: same grid and
    /// georeferencing, two float32 bands, GeoTIFF driver.
    pub fn break_output(&self) -> Self {
        Self {
            driver: "GTiff".to_string(),
            band_count: 2,
            data_type: DataType::Float32,
            ..self.clone()
        }
    }

    /// Values in one band.
    pub fn pixel_count(&self) -> usize {
        self.width * self.height
    }
}

/// Window-local pixel time series as signed 16-bit samples.
///
/// Samples are band-major: `data[band * height * width + row * width + col]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelCube {
    bands: usize,
    height: usize,
    width: usize,
    data: Vec<i16>,
}

impl PixelCube {
    /// Wrap band-major samples, checking the buffer size.
    pub fn new(
        bands: usize,
        height: usize,
        width: usize,
        data: Vec<i16>,
    ) -> Result<Self, RasterError> {
        let expected = bands * height * width;
        if data.len() != expected {
            return Err(RasterError::Shape {
                expected,
                actual: data.len(),
            });
        }
        Ok(Self {
            bands,
            height,
            width,
            data,
        })
    }

    /// Cast raw samples to `i16`.
    ///
    /// The cast saturates at the `i16` bounds and maps NaN to 0.
    pub fn from_samples(
        bands: usize,
        height: usize,
        width: usize,
        samples: &[f64],
    ) -> Result<Self, RasterError> {
        Self::new(
            bands,
            height,
            width,
            samples.iter().map(|v| *v as i16).collect(),
        )
    }

    pub fn bands(&self) -> usize {
        self.bands
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn width(&self) -> usize {
        self.width
    }

    /// Pixels per band.
    pub fn pixel_count(&self) -> usize {
        self.height * self.width
    }

    /// Raw band-major samples.
    pub fn as_slice(&self) -> &[i16] {
        &self.data
    }

    /// Sample of one band at one pixel.
    pub fn get(&self, band: usize, row: usize, col: usize) -> i16 {
        self.data[band * self.pixel_count() + row * self.width + col]
    }

    /// Time series of the pixel at flat index `pixel` (`row * width + col`).
    pub fn pixel_series(&self, pixel: usize) -> impl Iterator<Item = i16> + '_ {
        let stride = self.pixel_count();
        (0..self.bands).map(move |b| self.data[b * stride + pixel])
    }

    /// Keep only the given contiguous band range.
    pub fn select_bands(&self, bands: std::ops::Range<usize>) -> Self {
        let stride = self.pixel_count();
        let data = self.data[bands.start * stride..bands.end * stride].to_vec();
        Self {
            bands: bands.len(),
            height: self.height,
            width: self.width,
            data,
        }
    }
}

/// Two-band float32 result of one window: decimal break year and magnitude.
#[derive(Debug, Clone, PartialEq)]
pub struct BreakBlock {
    height: usize,
    width: usize,
    breaks: Vec<f32>,
    magnitudes: Vec<f32>,
}

impl BreakBlock {
    /// Stack the two result planes, checking their sizes.
    pub fn new(
        height: usize,
        width: usize,
        breaks: Vec<f32>,
        magnitudes: Vec<f32>,
    ) -> Result<Self, RasterError> {
        let expected = height * width;
        for plane in [&breaks, &magnitudes] {
            if plane.len() != expected {
                return Err(RasterError::Shape {
                    expected,
                    actual: plane.len(),
                });
            }
        }
        Ok(Self {
            height,
            width,
            breaks,
            magnitudes,
        })
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn width(&self) -> usize {
        self.width
    }

    /// Band 1: decimal year of the break, NaN where no break was found.
    pub fn breaks(&self) -> &[f32] {
        &self.breaks
    }

    /// Band 2: break magnitude.
    pub fn magnitudes(&self) -> &[f32] {
        &self.magnitudes
    }

    /// Band by zero-based index (0 = breaks, 1 = magnitudes).
    pub fn band(&self, index: usize) -> &[f32] {
        match index {
            0 => &self.breaks,
            _ => &self.magnitudes,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_window_display() {
        let w = PixelWindow::new(256, 512, 128, 64);
        assert_eq!(w.to_string(), "128x64@(256,512)");
        assert_eq!(w.pixel_count(), 128 * 64);
    }

    #[test]
    fn test_window_fits_in() {
        let w = PixelWindow::new(2, 2, 2, 2);
        assert!(w.fits_in(4, 4));
        assert!(!w.fits_in(3, 4));
    }

    #[test]
    fn test_break_output_profile() {
        let src = RasterProfile::new(100, 50, 20, DataType::Int16)
            .with_block_size(32, 32)
            .with_geo_transform([500000.0, 30.0, 0.0, 4000000.0, 0.0, -30.0]);
        let out = src.break_output();

        assert_eq!(out.driver, "GTiff");
        assert_eq!(out.band_count, 2);
        assert_eq!(out.data_type, DataType::Float32);
        assert_eq!(out.width, 100);
        assert_eq!(out.height, 50);
        assert_eq!(out.block_width, 32);
        assert_eq!(out.geo_transform, src.geo_transform);
    }

    #[test]
    fn test_cube_cast_saturates_and_zeroes_nan() {
        let cube = PixelCube::from_samples(1, 1, 4, &[f64::NAN, 1e9, -1e9, 12.7]).unwrap();
        assert_eq!(cube.as_slice(), &[0, i16::MAX, i16::MIN, 12]);
    }

    #[test]
    fn test_cube_rejects_bad_shape() {
        let err = PixelCube::new(2, 2, 2, vec![0; 7]).unwrap_err();
        assert_eq!(
            err,
            RasterError::Shape {
                expected: 8,
                actual: 7
            }
        );
    }

    #[test]
    fn test_cube_pixel_series_and_select() {
        // 3 bands, 1x2 pixels
        let cube = PixelCube::new(3, 1, 2, vec![1, 2, 3, 4, 5, 6]).unwrap();
        assert_eq!(cube.pixel_series(1).collect::<Vec<_>>(), vec![2, 4, 6]);
        assert_eq!(cube.get(2, 0, 0), 5);

        let sub = cube.select_bands(1..3);
        assert_eq!(sub.bands(), 2);
        assert_eq!(sub.as_slice(), &[3, 4, 5, 6]);
    }

    #[test]
    fn test_break_block_shape() {
        assert!(BreakBlock::new(2, 2, vec![0.0; 4], vec![0.0; 4]).is_ok());
        assert!(BreakBlock::new(2, 2, vec![0.0; 4], vec![0.0; 3]).is_err());
    }
}
