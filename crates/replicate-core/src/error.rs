//! # Design
//!
//! - Provide structured, constant-message errors for the replication engine.
//! - Every variant renders a short report line for the user-facing sinks via
//!   [`ReplicateError::report_message`].
//! - Preserve source errors without interpolating context into `Display`.

use std::io;

use replicate_config::ConfigError;
use thiserror::Error;

/// Result type for replication operations.
pub type ReplicateResult<T> = Result<T, ReplicateError>;

/// Errors produced while dispatching or running replication jobs.
#[derive(Debug, Error)]
pub enum ReplicateError {
    /// The caller supplied an empty path.
    #[error("missing local file")]
    MissingLocalFile,
    /// A remote-copy mapping resolved without a host.
    #[error("missing host")]
    MissingHost {
        /// 1-based position of the mapping in the settings.
        mapping: usize,
    },
    /// The settings snapshot could not be read.
    #[error("invalid settings")]
    Settings {
        /// Underlying settings error.
        source: ConfigError,
    },
    /// Jobs were requested outside of a tokio runtime.
    #[error("no async runtime available")]
    NoRuntime,
    /// An external program could not be started.
    #[error("failed to launch command")]
    Spawn {
        /// Program that failed to start.
        program: String,
        /// Underlying IO error.
        source: io::Error,
    },
    /// Reading a program's output failed.
    #[error("failed to read command output")]
    Output {
        /// Program whose output could not be read.
        program: String,
        /// Underlying IO error.
        source: io::Error,
    },
    /// Waiting for a program to exit failed.
    #[error("failed to wait for command")]
    Wait {
        /// Program that could not be awaited.
        program: String,
        /// Underlying IO error.
        source: io::Error,
    },
    /// A program exited unsuccessfully.
    #[error("command exited unsuccessfully")]
    CommandFailed {
        /// Program that failed.
        program: String,
        /// Exit code, or `None` when terminated by a signal.
        code: Option<i32>,
    },
}

impl ReplicateError {
    /// Line written to the reporting sinks for this error.
    #[must_use]
    pub fn report_message(&self) -> String {
        match self {
            Self::MissingLocalFile => "Missing local file".to_string(),
            Self::MissingHost { .. } => "Missing host".to_string(),
            Self::Settings { source } => format!("Invalid settings: {}", source.summary()),
            Self::NoRuntime => "No async runtime available; replication skipped".to_string(),
            Self::Spawn { program, source } => format!("{program}: failed to launch ({source})"),
            Self::Output { program, source } => {
                format!("{program}: failed to read output ({source})")
            }
            Self::Wait { program, source } => format!("{program}: failed to wait ({source})"),
            Self::CommandFailed {
                program,
                code: Some(code),
            } => format!("{program} exited with status {code}"),
            Self::CommandFailed {
                program,
                code: None,
            } => format!("{program} terminated by signal"),
        }
    }
}
