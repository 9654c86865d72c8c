//! Status indicator outputs
//!
//! The dispatcher reports every status change here. What "display" means is
//! up to the implementation: a log line, a watch channel, or a file that an
//! LED daemon polls.

use std::path::PathBuf;

use tokio::sync::watch;

use crate::events::Status;

/// Receives status changes from the dispatcher
pub trait StatusIndicator: Send + Sync {
    /// Show a new status
    fn set_status(&self, status: Status);
}

/// Logs status changes
#[derive(Debug, Default)]
pub struct TracingIndicator;

impl StatusIndicator for TracingIndicator {
    fn set_status(&self, status: Status) {
        tracing::info!(%status, "status changed");
    }
}

/// Publishes status changes on a watch channel
#[derive(Debug)]
pub struct WatchIndicator {
    tx: watch::Sender<Status>,
}

impl WatchIndicator {
    /// Create an indicator and its receiver, starting at [`Status::Ready`]
    #[must_use]
    pub fn new() -> (Self, watch::Receiver<Status>) {
        let (tx, rx) = watch::channel(Status::Ready);
        (Self { tx }, rx)
    }
}

impl StatusIndicator for WatchIndicator {
    fn set_status(&self, status: Status) {
        // Always notify, even when the value repeats
        self.tx.send_replace(status);
    }
}

/// Writes the current status name to a file
///
/// Writes happen inline on the calling thread, one short line each, in
/// status order. Must also work on a current-thread runtime, so no
/// `block_in_place`.
#[derive(Debug)]
pub struct FileIndicator {
    path: PathBuf,
}

impl FileIndicator {
    /// Create an indicator writing to `path`
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl StatusIndicator for FileIndicator {
    fn set_status(&self, status: Status) {
        if let Err(e) = std::fs::write(&self.path, format!("{status}\n")) {
            tracing::warn!(
                path = %self.path.display(),
                error = %e,
                "failed to write status file"
            );
        }
    }
}

/// Fans a status change out to several indicators
#[derive(Default)]
pub struct CompositeIndicator {
    indicators: Vec<Box<dyn StatusIndicator>>,
}

impl CompositeIndicator {
    /// Create an empty composite
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an indicator
    #[must_use]
    pub fn with(mut self, indicator: impl StatusIndicator + 'static) -> Self {
        self.indicators.push(Box::new(indicator));
        self
    }
}

impl StatusIndicator for CompositeIndicator {
    fn set_status(&self, status: Status) {
        for indicator in &self.indicators {
            indicator.set_status(status);
        }
    }
}
