//! Per-tile completion markers.
//!
//! A tile is done, for a given parameter set, exactly when its marker
//! exists. Markers are written only after the tile's destination raster has
//! been closed, so a crash at any earlier point leaves the tile pending and
//! it is redone in full on the next run.
//!
//! ```text
//! <save_dir>/
//! ├── 0/
//! │   ├── bfast_outputs.tif
//! │   └── tile_0.log          <- marker
//! └── 1/
//!     └── bfast_outputs.tif   <- no marker: pending
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local, TimeDelta};
use tracing::debug;

use crate::error::{PipelineError, PipelineResult};

/// Timestamp format used inside marker files.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.6f";

/// Completion tracking for tiles.
///
/// Every call names the save directory of the run, so one log can serve
/// runs with different parameter sets without mixing their tiles up.
pub trait ResumeLog: Send + Sync {
    /// True when `tile` has been completed under `save_dir`.
    fn exists(&self, save_dir: &Path, tile: &str) -> bool;

    /// Record `tile` as completed under `save_dir`.
    fn write(
        &self,
        save_dir: &Path,
        tile: &str,
        started_at: DateTime<Local>,
        finished_at: DateTime<Local>,
    ) -> PipelineResult<()>;
}

/// Marker files next to each tile's output raster.
#[derive(Debug, Clone, Copy, Default)]
pub struct FileResumeLog;

impl FileResumeLog {
    pub fn new() -> Self {
        Self
    }

    /// Path of the marker of `tile` under `save_dir`.
    pub fn marker_path(save_dir: &Path, tile: &str) -> PathBuf {
        save_dir.join(tile).join(format!("tile_{}.log", tile))
    }
}

impl ResumeLog for FileResumeLog {
    fn exists(&self, save_dir: &Path, tile: &str) -> bool {
        Self::marker_path(save_dir, tile).is_file()
    }

    fn write(
        &self,
        save_dir: &Path,
        tile: &str,
        started_at: DateTime<Local>,
        finished_at: DateTime<Local>,
    ) -> PipelineResult<()> {
        let path = Self::marker_path(save_dir, tile);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| PipelineError::io(parent, e))?;
        }

        let tmp = path.with_extension("log.tmp");
        fs::write(&tmp, marker_content(started_at, finished_at))
            .map_err(|e| PipelineError::io(&tmp, e))?;
        fs::rename(&tmp, &path).map_err(|e| PipelineError::io(&path, e))?;

        debug!(tile, path = %path.display(), "Wrote resume marker");
        Ok(())
    }
}

/// Body of a marker file.
pub fn marker_content(started_at: DateTime<Local>, finished_at: DateTime<Local>) -> String {
    format!(
        "Computation finished!\n\n\
         Computation started on: {} \n\
         Computation finished on: {}\n\n\
         Elapsed time: {}",
        started_at.format(TIMESTAMP_FORMAT),
        finished_at.format(TIMESTAMP_FORMAT),
        format_elapsed(finished_at - started_at),
    )
}

/// Render a duration as `[D day[s], ]H:MM:SS[.ffffff]`.
///
/// Negative durations (clock adjustments) are clamped to zero.
pub fn format_elapsed(elapsed: TimeDelta) -> String {
    let micros = elapsed.num_microseconds().unwrap_or(i64::MAX).max(0);
    let total_secs = micros / 1_000_000;
    let frac = micros % 1_000_000;

    let days = total_secs / 86_400;
    let hours = (total_secs % 86_400) / 3_600;
    let minutes = (total_secs % 3_600) / 60;
    let seconds = total_secs % 60;

    let mut out = String::new();
    if days > 0 {
        out.push_str(&format!("{} day{}, ", days, if days == 1 { "" } else { "s" }));
    }
    out.push_str(&format!("{}:{:02}:{:02}", hours, minutes, seconds));
    if frac > 0 {
        out.push_str(&format!(".{:06}", frac));
    }
    out
}
