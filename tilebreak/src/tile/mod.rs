//! Time-series input folders.
//!
//! An input folder holds one numbered sub-folder per tile:
//!
//! ```text
//! <folder>/
//! ├── 0/
//! │   ├── dates.csv
//! │   └── stack.vrt
//! ├── 1/
//! │   └── ...
//! └── 12/
//! ```
//!
//! Sub-folders whose name is not a number, or that lack either file, are
//! ignored.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::dates::DateSeries;
use crate::error::{PipelineError, PipelineResult};

/// Raster stack file of a tile.
pub const STACK_FILE: &str = "stack.vrt";

/// Date list file of a tile.
pub const DATES_FILE: &str = "dates.csv";

/// One tile of an input folder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tile {
    id: String,
    dir: PathBuf,
}

impl Tile {
    pub fn new(folder: &Path, id: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            dir: folder.join(&id),
            id,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn source_path(&self) -> PathBuf {
        self.dir.join(STACK_FILE)
    }

    pub fn dates_path(&self) -> PathBuf {
        self.dir.join(DATES_FILE)
    }

    /// Load the tile's date list.
    pub fn load_dates(&self) -> PipelineResult<DateSeries> {
        DateSeries::load(&self.dates_path())
    }
}

/// A validated time-series folder.
#[derive(Debug, Clone)]
pub struct TimeSeriesFolder {
    root: PathBuf,
    tiles: Vec<Tile>,
}

impl TimeSeriesFolder {
    /// Scan `root` for tiles.
    ///
    /// Fails with a configuration error when the folder holds no tile.
    pub fn open(root: impl Into<PathBuf>) -> PipelineResult<Self> {
        let root = root.into();
        let entries = fs::read_dir(&root).map_err(|e| PipelineError::io(&root, e))?;

        let mut ids: Vec<(u64, String)> = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| PipelineError::io(&root, e))?;
            let path = entry.path();
            if !path.is_dir() {
                continue;
            }
            let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            let Ok(number) = name.parse::<u64>() else {
                continue;
            };
            if path.join(DATES_FILE).is_file() && path.join(STACK_FILE).is_file() {
                ids.push((number, name.to_string()));
            }
        }

        if ids.is_empty() {
            return Err(PipelineError::Config(format!(
                "{} is not a time series folder (no numbered tile folder with {} and {})",
                root.display(),
                DATES_FILE,
                STACK_FILE
            )));
        }

        ids.sort();
        let tiles = ids.into_iter()
            .map(|(_, id)| Tile::new(&root, id))
            .collect::<Vec<_>>();
        debug!(folder = %root.display(), tiles = tiles.len(), "Opened time series folder");

        Ok(Self { root, tiles })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Folder name, used as the default run name.
    pub fn name(&self) -> String {
        self.root
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "results".to_string())
    }

    /// All tiles, sorted numerically.
    pub fn tiles(&self) -> &[Tile] {
        &self.tiles
    }

    /// Tiles matching `requested`, in request order. An empty request
    /// selects every tile.
    pub fn resolve(&self, requested: &[String]) -> PipelineResult<Vec<Tile>> {
        if requested.is_empty() {
            return Ok(self.tiles.clone());
        }

        requested
            .iter()
            .map(|id| {
                self.tiles
                    .iter()
                    .find(|t| same_tile(&t.id, id))
                    .cloned()
                    .ok_or_else(|| {
                        PipelineError::Config(format!(
                            "tile {} does not exist in {}",
                            id,
                            self.root.display()
                        ))
                    })
            })
            .collect()
    }

    /// Dates of the first tile. Tiles of one folder share their dates.
    pub fn reference_dates(&self) -> PipelineResult<DateSeries> {
        match self.tiles.first() {
            Some(tile) => tile.load_dates(),
            None => Err(PipelineError::Config("no tile".to_string())),
        }
    }
}

/// Tile ids name the same tile when their numbers match (`7` and `007`).
fn same_tile(a: &str, b: &str) -> bool {
    match (a.parse::<u64>(), b.parse::<u64>()) {
        (Ok(x), Ok(y)) => x == y,
        _ => a == b,
    }
}
