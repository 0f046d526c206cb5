//! Tile-by-tile execution of a change-detection run.
//!
//! The orchestrator owns the parameter set and the tile list of a [`Job`].
//! Tiles are processed sequentially, in the order given; the windows of a
//! tile run concurrently on the [`WindowWorkerPool`].
//!
//! ```text
//! for tile in job.tiles:
//!     marker exists? ── yes ──► skip (Info notice)
//!          │ no
//!          ▼
//!     open source ─► create output ─► pool.run(windows) ─► close ─► write marker
//!          │ error
//!          ▼
//!     abort the run (no marker)
//!
//! build mosaic over every finished tile ─► verify ─► Success notice
//! ```
//!
//! On-disk layout of a run:
//!
//! ```text
//! <result_root>/<run_name>/<directory_name>/
//! ├── bfast_outputs.vrt
//! ├── 0/
//! │   ├── bfast_outputs.tif
//! │   └── tile_0.log
//! └── ...
//! ```

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Local;
use tracing::{info, warn};

use crate::dates::{monitoring_range, DateSeries};
use crate::error::{PipelineError, PipelineResult};
use crate::model::ChangeDetectionModel;
use crate::mosaic::{MosaicBuilder, MOSAIC_FILE};
use crate::params::ParameterSet;
use crate::progress::{NotifyLevel, ProgressSink};
use crate::raster::{block_windows, RasterStore, SharedDestination, SharedSource};
use crate::resume::{FileResumeLog, ResumeLog};
use crate::tile::Tile;
use crate::worker::{default_workers, PoolReport, WindowTask, WindowWorkerPool};

/// File name of a tile's output raster.
pub const OUTPUT_FILE: &str = "bfast_outputs.tif";

/// What to run: input folder, output location, tiles and parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct Job {
    /// Time-series folder holding one sub-folder per tile.
    pub folder: PathBuf,
    /// Root of all result folders.
    pub result_root: PathBuf,
    /// Name of this run's result folder.
    pub run_name: String,
    /// Tile ids, processed in this order.
    pub tiles: Vec<String>,
    pub params: ParameterSet,
}

impl Job {
    /// Directory receiving the outputs of this parameter set.
    pub fn save_dir(&self) -> PathBuf {
        self.result_root
            .join(&self.run_name)
            .join(self.params.directory_name())
    }

    /// Output raster of `tile`.
    pub fn output_path(&self, tile: &str) -> PathBuf {
        self.save_dir().join(tile).join(OUTPUT_FILE)
    }

    /// Path of the run's mosaic.
    pub fn mosaic_path(&self) -> PathBuf {
        self.save_dir().join(MOSAIC_FILE)
    }
}

/// Outcome of a successful run.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RunSummary {
    /// Tiles computed during this run.
    pub processed: Vec<String>,
    /// Tiles skipped because they were already done.
    pub skipped: Vec<String>,
    /// Output rasters of all finished tiles, in tile order.
    pub outputs: Vec<PathBuf>,
    pub mosaic: PathBuf,
}

/// Drives a [`Job`] through the pipeline.
pub struct TileOrchestrator {
    store: Arc<dyn RasterStore>,
    model: Arc<dyn ChangeDetectionModel>,
    progress: Arc<dyn ProgressSink>,
    workers: usize,
    resume_log: Arc<dyn ResumeLog>,
}

impl TileOrchestrator {
    pub fn new(
        store: Arc<dyn RasterStore>,
        model: Arc<dyn ChangeDetectionModel>,
        progress: Arc<dyn ProgressSink>,
    ) -> Self {
        Self {
            store,
            model,
            progress,
            workers: default_workers(),
            resume_log: Arc::new(FileResumeLog::new()),
        }
    }

    /// Set the number of window workers. Zero selects one per core.
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = if workers == 0 {
            default_workers()
        } else {
            workers
        };
        self
    }

    /// Use `log` instead of marker files in the save directory.
    ///
    /// The log is queried with each job's save directory.
    pub fn with_resume_log(mut self, log: Arc<dyn ResumeLog>) -> Self {
        self.resume_log = log;
        self
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Run every tile of `job`, then build the mosaic.
    ///
    /// Stops at the first failing tile. Tiles finished before the failure
    /// keep their markers and are skipped by the next run.
    pub fn run(&self, job: &Job) -> PipelineResult<RunSummary> {
        job.params.validate()?;
        if job.tiles.is_empty() {
            return Err(PipelineError::Config("no tiles selected".to_string()));
        }

        let save_dir = job.save_dir();
        fs::create_dir_all(&save_dir).map_err(|e| PipelineError::io(&save_dir, e))?;

        let pool = WindowWorkerPool::new(
            self.workers,
            Arc::clone(&self.model),
            Arc::clone(&self.progress),
        )?;

        info!(
            run = %job.run_name,
            save_dir = %save_dir.display(),
            tiles = job.tiles.len(),
            workers = pool.workers(),
            model = self.model.name(),
            "Starting run"
        );

        let mut summary = RunSummary::default();
        for id in &job.tiles {
            let output = job.output_path(id);

            if self.resume_log.exists(&save_dir, id) {
                self.progress.notify(
                    &format!("Tile {} already computed, skipping", id),
                    NotifyLevel::Info,
                );
                summary.skipped.push(id.clone());
                summary.outputs.push(output);
                continue;
            }

            let started_at = Local::now();
            let tile = Tile::new(&job.folder, id.as_str());
            let report = self.process_tile(&pool, &tile, &output, &job.params)?;
            let finished_at = Local::now();

            self.resume_log.write(&save_dir, id, started_at, finished_at)?;
            info!(
                tile = %id,
                windows = report.windows,
                pixels = report.pixels,
                elapsed_ms = (finished_at - started_at).num_milliseconds(),
                "Tile finished"
            );

            summary.processed.push(id.clone());
            summary.outputs.push(output);
        }

        summary.mosaic = MosaicBuilder::new(Arc::clone(&self.store))
            .build(&job.mosaic_path(), &summary.outputs)?;

        self.progress.notify(
            &format!("Computation of {} finished", job.run_name),
            NotifyLevel::Success,
        );
        Ok(summary)
    }

    fn process_tile(
        &self,
        pool: &WindowWorkerPool,
        tile: &Tile,
        output: &Path,
        params: &ParameterSet,
    ) -> PipelineResult<PoolReport> {
        let dates = tile.load_dates()?;
        self.check_dates(tile, &dates, params)?;

        let source_path = tile.source_path();
        let raw = self
            .store
            .open_source(&source_path)
            .map_err(|e| PipelineError::raster(&source_path, e))?;
        let source = SharedSource::new(&source_path, raw);

        let bands = source.profile().band_count;
        if bands != dates.len() {
            return Err(PipelineError::Dates {
                path: tile.dates_path(),
                reason: format!("{} dates for {} raster bands", dates.len(), bands),
            });
        }

        if let Some(dir) = output.parent() {
            fs::create_dir_all(dir).map_err(|e| PipelineError::io(dir, e))?;
        }
        let profile = source.profile().break_output();
        let raw = self
            .store
            .create_destination(output, &profile)
            .map_err(|e| PipelineError::raster(output, e))?;
        let destination = SharedDestination::new(output, &profile, raw);

        let windows = block_windows(source.profile());
        self.progress
            .reset(windows.len(), &format!("Tile {}", tile.id()));

        let tasks: Vec<WindowTask> = windows
            .into_iter()
            .map(|window| WindowTask {
                tile: tile.id(),
                window,
                source: &source,
                destination: &destination,
                dates: dates.as_slice(),
                params,
            })
            .collect();

        let report = pool.run(tasks)?;
        destination
            .close()
            .map_err(|e| PipelineError::raster(output, e))?;
        Ok(report)
    }

    /// Reject date lists with no monitoring observation; warn on a short history.
    fn check_dates(
        &self,
        tile: &Tile,
        dates: &DateSeries,
        params: &ParameterSet,
    ) -> PipelineResult<()> {
        let cropped = &dates.as_slice()[params.crop_window().index_range(dates.as_slice())];
        if monitoring_range(cropped, params.monitor_start, params.monitor_end).is_none() {
            return Err(PipelineError::Config(format!(
                "tile {}: no observation between {} and {}",
                tile.id(),
                params.monitor_start,
                params.monitor_end
            )));
        }

        if let Some(warning) = params.history_warning(dates) {
            warn!(tile = tile.id(), "{}", warning);
            self.progress
                .notify(&format!("Tile {}: {}", tile.id(), warning), NotifyLevel::Warning);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::HarmonicMosumModel;
    use crate::progress::NoopProgress;
    use crate::raster::MemoryRasterStore;
    use chrono::NaiveDate;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn job(tiles: Vec<String>) -> Job {
        Job {
            folder: PathBuf::from("/ts"),
            result_root: PathBuf::from("/results"),
            run_name: "amazon".to_string(),
            tiles,
            params: ParameterSet::new(date(2010, 1, 1), date(2015, 1, 1), date(2018, 12, 31)),
        }
    }

    fn orchestrator() -> TileOrchestrator {
        TileOrchestrator::new(
            Arc::new(MemoryRasterStore::new()),
            Arc::new(HarmonicMosumModel::new()),
            Arc::new(NoopProgress),
        )
    }

    #[test]
    fn test_job_paths() {
        let job = job(vec!["4".to_string()]);
        let base = PathBuf::from("/results/amazon/2010_2015_2018_k3_f365_t0_h0.25_l0.95");
        assert_eq!(job.save_dir(), base);
        assert_eq!(job.output_path("4"), base.join("4").join("bfast_outputs.tif"));
        assert_eq!(job.mosaic_path(), base.join("bfast_outputs.vrt"));
    }

    #[test]
    fn test_empty_tile_list_is_config_error() {
        let err = orchestrator().run(&job(Vec::new())).unwrap_err();
        assert!(matches!(err, PipelineError::Config(_)));
    }

    #[test]
    fn test_invalid_dates_rejected_before_work() {
        let mut job = job(vec!["0".to_string()]);
        job.params.monitor_start = date(2009, 1, 1);
        let err = orchestrator().run(&job).unwrap_err();
        assert!(matches!(err, PipelineError::Config(_)));
        assert!(!job.save_dir().exists());
    }

    #[test]
    fn test_with_workers() {
        assert_eq!(orchestrator().with_workers(3).workers(), 3);
        assert_eq!(orchestrator().with_workers(0).workers(), default_workers());
    }
}
