//! tilebreak - Tiled change detection over satellite image time series
//!
//! This library runs a pixel-wise structural break model over large tiled
//! raster stacks. Each tile is split into windows that are processed
//! concurrently against one shared source and one shared output raster.
//! Finished tiles are recorded so that an interrupted run resumes where it
//! stopped, and all tile outputs are assembled into one virtual mosaic.
//!
//! # High-Level API
//!
//! ```ignore
//! use std::sync::Arc;
//! use tilebreak::config::RunConfig;
//! use tilebreak::model::HarmonicMosumModel;
//! use tilebreak::orchestrator::TileOrchestrator;
//! use tilebreak::progress::TracingProgress;
//! use tilebreak::raster::GdalRasterStore;
//!
//! let config = RunConfig::load_from(path)?;
//! let folder = config.open_folder()?;
//! let job = config.to_job(&folder)?;
//!
//! let summary = TileOrchestrator::new(
//!     Arc::new(GdalRasterStore::new()),
//!     Arc::new(HarmonicMosumModel::new()),
//!     Arc::new(TracingProgress::new()),
//! )
//! .with_workers(config.execution.workers)
//! .run(&job)?;
//! ```

pub mod config;
pub mod dates;
pub mod error;
pub mod logging;
pub mod model;
pub mod mosaic;
pub mod orchestrator;
pub mod params;
pub mod progress;
pub mod raster;
pub mod resume;
pub mod tile;
pub mod worker;

pub use error::{PipelineError, PipelineResult};

/// Version of the tilebreak library.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
