//! Error types for settings operations.
//!
//! # Design
//! - Constant messages; the offending key and value travel as fields.
//! - Source errors are preserved rather than formatted into the message.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Primary error type for settings operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A setting held a value of the wrong shape.
    #[error("invalid setting value")]
    InvalidField {
        /// Setting key (or `replicate[N].field` for mapping records).
        field: String,
        /// Offending value when available.
        value: Option<String>,
        /// Machine-readable reason for the failure.
        reason: &'static str,
    },
    /// A mapping record could not be decoded.
    #[error("invalid mapping record")]
    InvalidMapping {
        /// 1-based position of the record in the `replicate` list.
        index: usize,
        /// Underlying decode error.
        source: serde_json::Error,
    },
    /// The settings document was not valid JSON.
    #[error("invalid settings document")]
    Parse {
        /// Document path when loaded from disk.
        path: Option<PathBuf>,
        /// Underlying JSON error.
        source: serde_json::Error,
    },
    /// The settings document was valid JSON but not an object.
    #[error("settings document must be an object")]
    NotAnObject {
        /// Document path when loaded from disk.
        path: Option<PathBuf>,
    },
    /// Reading the settings document failed.
    #[error("failed to read settings document")]
    Io {
        /// Document path.
        path: PathBuf,
        /// Underlying IO error.
        source: io::Error,
    },
}

impl ConfigError {
    pub(crate) fn invalid(
        field: impl Into<String>,
        value: Option<String>,
        reason: &'static str,
    ) -> Self {
        Self::InvalidField {
            field: field.into(),
            value,
            reason,
        }
    }

    /// Short single-line description suitable for the reporting sinks.
    #[must_use]
    pub fn summary(&self) -> String {
        match self {
            Self::InvalidField {
                field,
                value: Some(value),
                reason,
            } => format!("{field} {reason} (got {value})"),
            Self::InvalidField {
                field,
                value: None,
                reason,
            } => format!("{field} {reason}"),
            Self::InvalidMapping { index, source } => format!("replicate[{index}]: {source}"),
            Self::Parse { source, .. } => source.to_string(),
            Self::NotAnObject { .. } => self.to_string(),
            Self::Io { path, source } => format!("{}: {source}", path.display()),
        }
    }
}

/// Convenience alias for settings results.
pub type ConfigResult<T> = Result<T, ConfigError>;
