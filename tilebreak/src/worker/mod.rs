//! Concurrent execution of the windows of one tile.
//!
//! Every window of a tile becomes a [`WindowTask`] holding explicit
//! references to the tile's shared source and destination. The
//! [`WindowWorkerPool`] runs the tasks on a bounded rayon thread pool:
//!
//! ```text
//!            ┌────────────────────── per task ──────────────────────┐
//! tasks ──►  │ read_block ─► crop ─► fit ─► to years ─► write_block │
//!            │ (read lock)           (no lock)         (write lock) │
//!            └──────────────────────────────────────────────────────┘
//! ```
//!
//! The first failing task stops the scheduling of further tasks and its
//! error is returned. Tasks already running finish their current window.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use chrono::NaiveDate;
use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};
use tracing::{debug, trace};

use crate::dates::{monitoring_range, to_decimal_years};
use crate::error::{PipelineError, PipelineResult};
use crate::model::{ChangeDetectionModel, ModelError};
use crate::params::ParameterSet;
use crate::progress::ProgressSink;
use crate::raster::{BreakBlock, PixelWindow, SharedDestination, SharedSource};

/// Worker count used when none is configured.
pub fn default_workers() -> usize {
    std::thread::available_parallelism()
        .map(|p| p.get())
        .unwrap_or(4)
}

/// One window of one tile, with everything needed to process it.
#[derive(Clone, Copy)]
pub struct WindowTask<'a> {
    pub tile: &'a str,
    pub window: PixelWindow,
    pub source: &'a SharedSource,
    pub destination: &'a SharedDestination,
    /// Full date series of the source, one date per band.
    pub dates: &'a [NaiveDate],
    pub params: &'a ParameterSet,
}

impl<'a> WindowTask<'a> {
    /// Read, fit, convert and write this window. Returns the pixel count.
    pub fn execute(
        &self,
        model: &dyn ChangeDetectionModel,
        progress: &dyn ProgressSink,
    ) -> PipelineResult<usize> {
        let window = self.window;
        let fit_error = |source: ModelError| PipelineError::ModelFit {
            tile: self.tile.to_string(),
            window,
            source,
        };

        let cube = self
            .source
            .read_block(&window)
            .map_err(|e| PipelineError::raster(self.source.path(), e))?;

        let crop = self.params.crop_window().index_range(self.dates);
        let dates = &self.dates[crop.clone()];
        let cube = cube.select_bands(crop);

        let output = model
            .fit(&cube, dates, &self.params.monitoring())
            .map_err(fit_error)?;
        output.check_shape(window.pixel_count()).map_err(fit_error)?;

        let (start, end) = (self.params.monitor_start, self.params.monitor_end);
        let monitoring = monitoring_range(dates, start, end).ok_or_else(|| {
            PipelineError::Config(format!(
                "tile {}: no observation between {} and {}",
                self.tile, start, end
            ))
        })?;
        let breaks = to_decimal_years(&output.breaks, &dates[monitoring]);

        let block = BreakBlock::new(window.height, window.width, breaks, output.magnitudes)
            .map_err(|e| PipelineError::raster(self.destination.path(), e))?;
        self.destination
            .write_block_then(&window, &block, || progress.increment())
            .map_err(|e| PipelineError::raster(self.destination.path(), e))?;

        trace!(tile = self.tile, window = %window, "Window written");
        Ok(window.pixel_count())
    }
}

/// Counters of a completed pool run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PoolReport {
    /// Windows written.
    pub windows: usize,
    /// Pixels written.
    pub pixels: usize,
}

/// Bounded pool of window workers.
pub struct WindowWorkerPool {
    pool: ThreadPool,
    workers: usize,
    model: Arc<dyn ChangeDetectionModel>,
    progress: Arc<dyn ProgressSink>,
}

impl WindowWorkerPool {
    /// Create a pool of `workers` threads (at least one).
    pub fn new(
        workers: usize,
        model: Arc<dyn ChangeDetectionModel>,
        progress: Arc<dyn ProgressSink>,
    ) -> PipelineResult<Self> {
        let workers = workers.max(1);
        let pool = ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|i| format!("tilebreak-worker-{}", i))
            .build()
            .map_err(|e| PipelineError::WorkerPool(e.to_string()))?;

        Ok(Self {
            pool,
            workers,
            model,
            progress,
        })
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Run every task, stopping at the first failure.
    pub fn run(&self, tasks: Vec<WindowTask<'_>>) -> PipelineResult<PoolReport> {
        let total = tasks.len();
        let windows = AtomicUsize::new(0);
        let pixels = AtomicUsize::new(0);
        let model = self.model.as_ref();
        let progress = self.progress.as_ref();

        debug!(
            windows = total,
            workers = self.workers,
            model = model.name(),
            "Running window tasks"
        );

        self.pool.install(|| {
            tasks.into_par_iter().try_for_each(|task| {
                let count = task.execute(model, progress)?;
                windows.fetch_add(1, Ordering::SeqCst);
                pixels.fetch_add(count, Ordering::SeqCst);
                Ok::<(), PipelineError>(())
            })
        })?;

        Ok(PoolReport {
            windows: windows.into_inner(),
            pixels: pixels.into_inner(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ModelOutput;
    use crate::params::MonitoringParameters;
    use crate::progress::RecordingProgress;
    use crate::raster::{
        block_windows, DataType, MemoryRaster, MemoryRasterStore, PixelCube, RasterProfile,
        RasterStore,
    };
    use std::path::PathBuf;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    /// Break at the monitoring index stored in the first cropped band.
    struct FirstBandModel;

    impl ChangeDetectionModel for FirstBandModel {
        fn name(&self) -> &str {
            "first-band"
        }

        fn fit(
            &self,
            cube: &PixelCube,
            _dates: &[NaiveDate],
            _params: &MonitoringParameters,
        ) -> Result<ModelOutput, ModelError> {
            let pixels = cube.pixel_count();
            let breaks: Vec<i32> = (0..pixels)
                .map(|p| cube.pixel_series(p).next().unwrap_or(-1) as i32)
                .collect();
            Ok(ModelOutput {
                breaks,
                magnitudes: vec![0.5; pixels],
            })
        }
    }

    struct FailingModel;

    impl ChangeDetectionModel for FailingModel {
        fn name(&self) -> &str {
            "failing"
        }

        fn fit(
            &self,
            _cube: &PixelCube,
            _dates: &[NaiveDate],
            _params: &MonitoringParameters,
        ) -> Result<ModelOutput, ModelError> {
            Err(ModelError::Failed("boom".to_string()))
        }
    }

    /// Dates 2014-01-01 .. 2014-01-04 then 2015-01-01 .. 2015-01-04.
    fn dates() -> Vec<NaiveDate> {
        let mut out: Vec<NaiveDate> = (1..=4).map(|d| date(2014, 1, d)).collect();
        out.extend((1..=4).map(|d| date(2015, 1, d)));
        out
    }

    fn params() -> ParameterSet {
        ParameterSet::new(date(2014, 1, 2), date(2015, 1, 1), date(2015, 1, 3))
    }

    struct Fixture {
        store: MemoryRasterStore,
        source_path: PathBuf,
        dest_path: PathBuf,
        profile: RasterProfile,
    }

    fn fixture() -> Fixture {
        let store = MemoryRasterStore::new();
        let source_path = PathBuf::from("/ts/0/stack.vrt");
        let dest_path = PathBuf::from("/out/0/bfast_outputs.tif");
        let profile = RasterProfile::new(4, 4, 8, DataType::Int16).with_block_size(2, 2);

        // Band 1 (first after cropping) holds a break index 1..=3 or -1.
        let raster = MemoryRaster::from_fn(profile.clone(), |band, row, col| {
            if band == 1 {
                match (row + col) % 4 {
                    3 => -1.0,
                    n => (n + 1) as f64,
                }
            } else {
                100.0
            }
        });
        store.insert(&source_path, raster);
        Fixture {
            store,
            source_path,
            dest_path,
            profile,
        }
    }

    fn run_with(
        fixture: &Fixture,
        model: Arc<dyn ChangeDetectionModel>,
        workers: usize,
        progress: Arc<RecordingProgress>,
    ) -> PipelineResult<PoolReport> {
        let dates = dates();
        let params = params();
        let source = SharedSource::new(
            &fixture.source_path,
            fixture.store.open_source(&fixture.source_path).unwrap(),
        );
        let out_profile = fixture.profile.break_output();
        let destination = SharedDestination::new(
            &fixture.dest_path,
            &out_profile,
            fixture
                .store
                .create_destination(&fixture.dest_path, &out_profile)
                .unwrap(),
        );

        let tasks: Vec<WindowTask> = block_windows(source.profile())
            .into_iter()
            .map(|window| WindowTask {
                tile: "0",
                window,
                source: &source,
                destination: &destination,
                dates: &dates,
                params: &params,
            })
            .collect();

        let pool = WindowWorkerPool::new(workers, model, progress)?;
        let report = pool.run(tasks)?;
        destination.close().unwrap();
        Ok(report)
    }

    #[test]
    fn test_pool_writes_decimal_years() {
        let fixture = fixture();
        let progress = Arc::new(RecordingProgress::new());
        let report = run_with(&fixture, Arc::new(FirstBandModel), 2, progress.clone()).unwrap();

        assert_eq!(
            report,
            PoolReport {
                windows: 4,
                pixels: 16
            }
        );
        assert_eq!(progress.increments(), 4);

        let out = fixture.store.raster(&fixture.dest_path).unwrap();
        let jan = |day: u32| 2015.0 + (day - 1) as f64 / 365.0;
        for row in 0..4 {
            for col in 0..4 {
                let value = out.get(0, row, col);
                match (row + col) % 4 {
                    3 => assert!(value.is_nan()),
                    n => assert!((value - jan(n as u32 + 1) as f32 as f64).abs() < 1e-9),
                }
                assert_eq!(out.get(1, row, col), 0.5);
            }
        }
    }

    #[test]
    fn test_single_and_many_workers_agree() {
        let a = fixture();
        let b = fixture();
        run_with(&a, Arc::new(FirstBandModel), 1, Arc::new(RecordingProgress::new())).unwrap();
        run_with(&b, Arc::new(FirstBandModel), 8, Arc::new(RecordingProgress::new())).unwrap();

        let bits = |f: &Fixture| -> Vec<u64> {
            f.store
                .raster(&f.dest_path)
                .unwrap()
                .data()
                .iter()
                .map(|v| v.to_bits())
                .collect()
        };
        assert_eq!(bits(&a), bits(&b));
    }

    #[test]
    fn test_model_failure_aborts() {
        let fixture = fixture();
        let progress = Arc::new(RecordingProgress::new());
        let err = run_with(&fixture, Arc::new(FailingModel), 2, progress.clone()).unwrap_err();

        assert!(matches!(err, PipelineError::ModelFit { ref tile, .. } if tile == "0"));
        assert_eq!(progress.increments(), 0);
    }

    #[test]
    fn test_read_failure_is_raster_error() {
        let fixture = fixture();
        fixture.store.fail_reads(&fixture.source_path);
        let err = run_with(
            &fixture,
            Arc::new(FirstBandModel),
            1,
            Arc::new(RecordingProgress::new()),
        )
        .unwrap_err();
        match err {
            PipelineError::Raster { path, .. } => assert_eq!(path, fixture.source_path),
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn test_zero_workers_clamped_to_one() {
        let pool = WindowWorkerPool::new(
            0,
            Arc::new(FirstBandModel),
            Arc::new(RecordingProgress::new()),
        )
        .unwrap();
        assert_eq!(pool.workers(), 1);
    }

    #[test]
    fn test_default_workers_positive() {
        assert!(default_workers() >= 1);
    }
}
