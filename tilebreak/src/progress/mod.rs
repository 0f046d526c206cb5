//! Progress reporting for tile runs.
//!
//! The orchestrator and the worker pool report through the [`ProgressSink`]
//! trait: `reset` when a tile starts, `increment` once per written window,
//! `notify` for user-facing messages (skips, warnings, completion).
//!
//! Implementations:
//!
//! - [`NoopProgress`] - discards everything
//! - [`TracingProgress`] - atomic counters, reported through `tracing`
//! - [`RecordingProgress`] - keeps every event for later inspection

use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::Mutex;
use tracing::{debug, error, info, warn};

/// Severity of a user-facing notice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotifyLevel {
    Info,
    Success,
    Warning,
    Error,
}

impl fmt::Display for NotifyLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            NotifyLevel::Info => "info",
            NotifyLevel::Success => "success",
            NotifyLevel::Warning => "warning",
            NotifyLevel::Error => "error",
        };
        f.write_str(s)
    }
}

/// Receiver of progress events.
///
/// `increment` is called from worker threads while the destination write
/// lock is held, so it must be cheap and must not block on other sinks.
pub trait ProgressSink: Send + Sync {
    /// Start a new progress bar of `total` steps.
    fn reset(&self, total: usize, label: &str);

    /// Advance the current bar by one step.
    fn increment(&self);

    /// Show a message to the user.
    fn notify(&self, message: &str, level: NotifyLevel);
}

/// Sink that ignores all events.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopProgress;

impl ProgressSink for NoopProgress {
    fn reset(&self, _total: usize, _label: &str) {}

    fn increment(&self) {}

    fn notify(&self, _message: &str, _level: NotifyLevel) {}
}

/// Sink that logs progress through `tracing`.
///
/// Completed steps are logged at debug level every `log_every` steps and at
/// info level when the bar completes.
#[derive(Debug)]
pub struct TracingProgress {
    label: Mutex<String>,
    total: AtomicUsize,
    done: AtomicUsize,
    log_every: usize,
}

impl TracingProgress {
    pub fn new() -> Self {
        Self {
            label: Mutex::new(String::new()),
            total: AtomicUsize::new(0),
            done: AtomicUsize::new(0),
            log_every: 100,
        }
    }

    /// Log a debug line every `steps` completed steps.
    pub fn with_log_every(mut self, steps: usize) -> Self {
        self.log_every = steps.max(1);
        self
    }

    /// Steps completed on the current bar.
    pub fn completed(&self) -> usize {
        self.done.load(Ordering::SeqCst)
    }

    /// Total steps of the current bar.
    pub fn total(&self) -> usize {
        self.total.load(Ordering::SeqCst)
    }
}

impl Default for TracingProgress {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressSink for TracingProgress {
    fn reset(&self, total: usize, label: &str) {
        *self.label.lock() = label.to_string();
        self.total.store(total, Ordering::SeqCst);
        self.done.store(0, Ordering::SeqCst);
        info!(label, total, "Starting");
    }

    fn increment(&self) {
        let done = self.done.fetch_add(1, Ordering::SeqCst) + 1;
        let total = self.total.load(Ordering::SeqCst);
        if done == total {
            info!(label = %self.label.lock(), done, total, "Completed");
        } else if done % self.log_every == 0 {
            debug!(label = %self.label.lock(), done, total, "Progress");
        }
    }

    fn notify(&self, message: &str, level: NotifyLevel) {
        match level {
            NotifyLevel::Info | NotifyLevel::Success => info!("{}", message),
            NotifyLevel::Warning => warn!("{}", message),
            NotifyLevel::Error => error!("{}", message),
        }
    }
}

/// Event captured by [`RecordingProgress`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgressEvent {
    Reset { total: usize, label: String },
    Notify { message: String, level: NotifyLevel },
}

/// Sink that records every event.
///
/// Increments are only counted; resets and notices are kept in order.
#[derive(Debug, Default)]
pub struct RecordingProgress {
    events: Mutex<Vec<ProgressEvent>>,
    increments: AtomicUsize,
}

impl RecordingProgress {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resets and notices, in call order.
    pub fn events(&self) -> Vec<ProgressEvent> {
        self.events.lock().clone()
    }

    /// Total number of `increment` calls.
    pub fn increments(&self) -> usize {
        self.increments.load(Ordering::SeqCst)
    }

    /// Messages notified at `level`.
    pub fn messages(&self, level: NotifyLevel) -> Vec<String> {
        self.events
            .lock()
            .iter()
            .filter_map(|e| match e {
                ProgressEvent::Notify { message, level: l } if *l == level => {
                    Some(message.clone())
                }
                _ => None,
            })
            .collect()
    }
}

impl ProgressSink for RecordingProgress {
    fn reset(&self, total: usize, label: &str) {
        self.events.lock().push(ProgressEvent::Reset {
            total,
            label: label.to_string(),
        });
    }

    fn increment(&self) {
        self.increments.fetch_add(1, Ordering::SeqCst);
    }

    fn notify(&self, message: &str, level: NotifyLevel) {
        self.events.lock().push(ProgressEvent::Notify {
            message: message.to_string(),
            level,
        });
    }
}
