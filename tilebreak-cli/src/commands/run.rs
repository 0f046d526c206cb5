//! Run command - compute every pending tile and build the mosaic.

use std::sync::Arc;

use tilebreak::model::HarmonicMosumModel;
use tilebreak::orchestrator::TileOrchestrator;
use tilebreak::raster::RasterStore;
use tracing::info;

use super::common::ConfigArgs;
use crate::error::CliError;
use crate::progress::BarProgress;
use crate::runner::CliRunner;

/// Arguments for the run command.
pub struct RunArgs {
    pub config: ConfigArgs,
    pub workers: Option<usize>,
    pub debug: bool,
}

/// Run the run command.
pub fn run(args: RunArgs) -> Result<(), CliError> {
    let runner = CliRunner::with_debug(args.debug)?;
    runner.log_startup("run");

    let config = args.config.load()?;
    let folder = config.open_folder()?;
    let job = config.to_job(&folder)?;
    let workers = args.workers.unwrap_or(config.execution.workers);

    let store = raster_store()?;
    let model = Arc::new(HarmonicMosumModel::new());
    info!(
        backend = %job.params.backend,
        "Using the built-in harmonic MOSUM model"
    );

    let progress = Arc::new(BarProgress::new());
    let orchestrator = TileOrchestrator::new(store, model, progress.clone()).with_workers(workers);

    println!("Save directory: {}", job.save_dir().display());
    println!("Tiles: {}  Workers: {}", job.tiles.len(), orchestrator.workers());
    println!();

    let result = orchestrator.run(&job);
    progress.finish();
    let summary = result?;

    println!();
    println!(
        "{} tiles computed, {} already done.",
        summary.processed.len(),
        summary.skipped.len()
    );
    println!("Mosaic: {}", summary.mosaic.display());
    Ok(())
}

#[cfg(feature = "gdal")]
fn raster_store() -> Result<Arc<dyn RasterStore>, CliError> {
    Ok(Arc::new(tilebreak::raster::GdalRasterStore::new()))
}

#[cfg(not(feature = "gdal"))]
fn raster_store() -> Result<Arc<dyn RasterStore>, CliError> {
    Err(CliError::Config(
        "this build has no raster backend; rebuild with `--features gdal`".to_string(),
    ))
}
