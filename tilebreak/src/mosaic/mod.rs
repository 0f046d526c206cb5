//! Virtual mosaic assembly over the finished tiles.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::info;

use crate::error::{PipelineError, PipelineResult};
use crate::raster::RasterStore;

/// File name of the mosaic inside a run's save directory.
pub const MOSAIC_FILE: &str = "bfast_outputs.vrt";

/// Builds a mosaic through a [`RasterStore`] and checks that it exists.
///
/// Mosaic tools can report success without writing anything, so the file
/// is checked after every build.
pub struct MosaicBuilder {
    store: Arc<dyn RasterStore>,
}

impl MosaicBuilder {
    pub fn new(store: Arc<dyn RasterStore>) -> Self {
        Self { store }
    }

    /// Build the mosaic at `path` from `inputs`, in the given order.
    pub fn build(&self, path: &Path, inputs: &[PathBuf]) -> PipelineResult<PathBuf> {
        self.store
            .build_mosaic(path, inputs)
            .map_err(|e| PipelineError::raster(path, e))?;

        if !path.is_file() {
            return Err(PipelineError::MosaicNotCreated {
                path: path.to_path_buf(),
            });
        }

        info!(path = %path.display(), inputs = inputs.len(), "Mosaic built");
        Ok(path.to_path_buf())
    }
}
