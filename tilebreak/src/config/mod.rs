//! Run configuration files.
//!
//! A run is described by an INI file:
//!
//! ```ini
//! [input]
//! folder = ~/downloads/amazon_ts
//! tiles = 0, 1, 2
//!
//! [periods]
//! history = 2010-01-01
//! monitoring_start = 2015-01-01
//! monitoring_end = 2018-12-31
//! ```
//!
//! Structs live in [`settings`], INI parsing in `parser`, serialization in
//! `writer` and file handling in `file`.

mod file;
mod parser;
pub mod settings;
mod writer;

pub use file::{default_config_path, ConfigFileError};
pub use parser::parse_tiles;
pub use settings::{
    ExecutionSettings, InputSettings, ModelSettings, OutputSettings, PeriodSettings, RunConfig,
};
