//! Enumeration of processing windows from a raster's native block layout.

use super::types::{PixelWindow, RasterProfile};

/// Windows aligned on the native blocks of `profile`, row-major.
///
/// Edge windows are clipped to the grid, so the windows cover every pixel
/// exactly once.
pub fn block_windows(profile: &RasterProfile) -> Vec<PixelWindow> {
    grid_windows(
        profile.width,
        profile.height,
        profile.block_width,
        profile.block_height,
    )
}

/// Partition a `width` x `height` grid into `block_width` x `block_height`
/// windows, row-major. A zero block dimension is treated as 1.
pub fn grid_windows(
    width: usize,
    height: usize,
    block_width: usize,
    block_height: usize,
) -> Vec<PixelWindow> {
    let block_width = block_width.max(1);
    let block_height = block_height.max(1);

    let mut windows =
        Vec::with_capacity(width.div_ceil(block_width) * height.div_ceil(block_height));
    for row_off in (0..height).step_by(block_height) {
        let h = block_height.min(height - row_off);
        for col_off in (0..width).step_by(block_width) {
            let w = block_width.min(width - col_off);
            windows.push(PixelWindow::new(col_off, row_off, w, h));
        }
    }
    windows
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raster::DataType;
    use proptest::prelude::*;

    #[test]
    fn test_single_block_covers_grid() {
        let windows = grid_windows(4, 4, 256, 256);
        assert_eq!(windows, vec![PixelWindow::new(0, 0, 4, 4)]);
    }

    #[test]
    fn test_edge_windows_are_clipped() {
        let windows = grid_windows(5, 3, 2, 2);
        assert_eq!(windows.len(), 6);
        assert_eq!(windows[2], PixelWindow::new(4, 0, 1, 2));
        assert_eq!(windows[5], PixelWindow::new(4, 2, 1, 1));
    }

    #[test]
    fn test_empty_grid_has_no_windows() {
        assert!(grid_windows(0, 10, 4, 4).is_empty());
    }

    #[test]
    fn test_block_windows_uses_profile_blocks() {
        let profile = RasterProfile::new(10, 10, 3, DataType::Int16).with_block_size(10, 1);
        let windows = block_windows(&profile);
        assert_eq!(windows.len(), 10);
        assert!(windows.iter().all(|w| w.width == 10 && w.height == 1));
    }

    proptest! {
        #[test]
        fn prop_windows_partition_grid(
            width in 1usize..80,
            height in 1usize..80,
            bw in 1usize..40,
            bh in 1usize..40,
        ) {
            let windows = grid_windows(width, height, bw, bh);
            let mut hits = vec![0u8; width * height];
            for w in &windows {
                prop_assert!(w.fits_in(width, height));
                prop_assert!(w.width > 0 && w.height > 0);
                for r in w.row_off..w.row_off + w.height {
                    for c in w.col_off..w.col_off + w.width {
                        hits[r * width + c] += 1;
                    }
                }
            }
            prop_assert!(hits.iter().all(|h| *h == 1));
        }
    }
}
