//! Terminal reporting: console lines on stdout, status lines on stderr.

use std::io::{self, Write};
use std::sync::{Mutex, PoisonError};

use replicate_core::{ReportSink, render};
use tracing::debug;

type Stream = Box<dyn Write + Send>;

/// Sink writing rendered report lines to two streams.
pub(crate) struct TerminalSink {
    console: Mutex<Stream>,
    status: Mutex<Stream>,
}

impl TerminalSink {
    pub(crate) fn new(console: Stream, status: Stream) -> Self {
        Self {
            console: Mutex::new(console),
            status: Mutex::new(status),
        }
    }

    pub(crate) fn stdio() -> Self {
        Self::new(Box::new(io::stdout()), Box::new(io::stderr()))
    }

    fn write(stream: &Mutex<Stream>, message: &str) {
        let mut stream = stream.lock().unwrap_or_else(PoisonError::into_inner);
        if let Err(err) = writeln!(stream, "{}", render(message)).and_then(|()| stream.flush()) {
            debug!(error = %err, "failed to write report line");
        }
    }
}

impl ReportSink for TerminalSink {
    fn console(&self, message: &str) {
        Self::write(&self.console, message);
    }

    fn status(&self, message: &str) {
        Self::write(&self.status, message);
    }
}
