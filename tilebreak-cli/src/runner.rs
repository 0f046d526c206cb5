//! Shared setup for commands that run the pipeline.

use tilebreak::logging::{default_log_dir, default_log_file, init_logging, LoggingGuard};
use tracing::info;

use crate::error::CliError;

/// Keeps logging alive for the duration of a command.
pub struct CliRunner {
    _logging_guard: LoggingGuard,
}

impl CliRunner {
    /// Initialize logging.
    ///
    /// # Arguments
    ///
    /// * `debug_mode` - When true, enables debug-level logging regardless of RUST_LOG
    pub fn with_debug(debug_mode: bool) -> Result<Self, CliError> {
        // The progress bar owns the terminal when attached to one.
        let stdout_enabled = !atty::is(atty::Stream::Stdout);

        let logging_guard = init_logging(
            &default_log_dir(),
            default_log_file(),
            stdout_enabled,
            debug_mode,
        )
        .map_err(|e| CliError::LoggingInit(e.to_string()))?;

        Ok(Self {
            _logging_guard: logging_guard,
        })
    }

    /// Log startup information for a command.
    pub fn log_startup(&self, command: &str) {
        info!("tilebreak v{}", tilebreak::VERSION);
        info!("tilebreak CLI: {} command", command);
    }
}
