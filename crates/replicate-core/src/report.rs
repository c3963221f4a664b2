//! Reporting sinks for user-visible replication feedback.
//!
//! # Design
//! - Two channels: a console-style line log and a transient status line.
//! - Sinks receive bare messages; [`render`] adds the common prefix.
//! - Implementations must tolerate concurrent calls from several jobs.

use tracing::{debug, info};

/// Prefix shared by every rendered report line.
pub const REPORT_PREFIX: &str = "Replicate:";

/// Destination for console and status messages.
pub trait ReportSink: Send + Sync {
    /// Append a line to the console log.
    fn console(&self, message: &str);

    /// Replace the transient status line.
    fn status(&self, message: &str);

    /// Write the same message to both channels.
    fn both(&self, message: &str) {
        self.console(message);
        self.status(message);
    }
}

/// Render a message the way hosts display it.
#[must_use]
pub fn render(message: &str) -> String {
    format!("{REPORT_PREFIX} {message}")
}

/// Sink that forwards reports to the tracing subscriber.
///
/// Console lines log at `info`, status lines at `debug`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl ReportSink for TracingSink {
    fn console(&self, message: &str) {
        info!(target: "replicate::console", "{}", render(message));
    }

    fn status(&self, message: &str) {
        debug!(target: "replicate::status", "{}", render(message));
    }
}
