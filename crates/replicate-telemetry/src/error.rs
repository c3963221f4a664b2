//! Error types for telemetry operations.
//!
//! # Design
//! - Constant messages; the metric name or stage travels as a field.

use thiserror::Error;

/// Result alias for telemetry operations.
pub type Result<T> = std::result::Result<T, TelemetryError>;

/// Errors raised by telemetry helpers.
#[derive(Debug, Error)]
pub enum TelemetryError {
    /// Installing the tracing subscriber failed.
    #[error("failed to install tracing subscriber")]
    SubscriberInstall {
        /// Underlying tracing subscriber error.
        source: tracing_subscriber::util::TryInitError,
    },
    /// Building or registering a Prometheus collector failed.
    #[error("failed to set up metrics collector")]
    Collector {
        /// Metric identifier tied to the failure.
        name: &'static str,
        /// Whether the failure happened while building or registering.
        stage: &'static str,
        /// Underlying Prometheus error.
        source: prometheus::Error,
    },
    /// Encoding Prometheus metrics failed.
    #[error("failed to encode metrics")]
    Encode {
        /// Underlying Prometheus error.
        source: prometheus::Error,
    },
    /// Rendered metrics output was not valid UTF-8.
    #[error("metrics output was not valid utf-8")]
    Utf8 {
        /// Underlying UTF-8 conversion error.
        source: std::string::FromUtf8Error,
    },
}

impl TelemetryError {
    pub(crate) fn build(name: &'static str, source: prometheus::Error) -> Self {
        Self::Collector {
            name,
            stage: "build",
            source,
        }
    }

    pub(crate) fn register(name: &'static str, source: prometheus::Error) -> Self {
        Self::Collector {
            name,
            stage: "register",
            source,
        }
    }
}
