//! CLI command implementations.
//!
//! # Command Modules
//!
//! - [`init`] - Write a run configuration file
//! - [`plan`] - Validate a run and show tile status
//! - [`run`] - Compute pending tiles and build the mosaic

pub mod common;
pub mod init;
pub mod plan;
pub mod run;
