//! Mapping selection and merging.
//!
//! Raw records are checked in configuration order. A record that cannot be
//! decoded, or that is missing `local` or `remote`, is reported and skipped
//! without affecting its siblings; the rest apply only when the request path
//! starts with their `local` text. Applicable records are overlaid on the
//! global defaults.

use replicate_config::{ConfigError, GlobalConfig, Mapping, RawMapping};
use replicate_telemetry::Metrics;
use serde_json::Value;
use tracing::{debug, warn};

use crate::report::ReportSink;

/// Why a raw record was dropped before matching.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Rejection {
    Malformed(String),
    MissingLocal,
    MissingRemote,
}

impl Rejection {
    fn message(&self) -> String {
        match self {
            Self::Malformed(reason) => format!("Invalid mapping: {reason}"),
            Self::MissingLocal => "Missing local".to_string(),
            Self::MissingRemote => "Missing remote".to_string(),
        }
    }

    const fn metric_label(&self) -> &'static str {
        match self {
            Self::Malformed(_) => "malformed",
            Self::MissingLocal => "missing_local",
            Self::MissingRemote => "missing_remote",
        }
    }
}

/// Mappings that apply to `local_file`, merged with the global defaults.
///
/// Invalid records are reported to `sink` as `Mapping N: ...` where `N` is the
/// record's 1-based position in the configuration.
#[must_use]
pub fn resolve(
    config: &GlobalConfig,
    local_file: &str,
    sink: &dyn ReportSink,
    metrics: Option<&Metrics>,
) -> Vec<Mapping> {
    let mut resolved = Vec::new();

    for (offset, record) in config.replicate.iter().enumerate() {
        let index = offset + 1;
        let (raw, local, remote) = match accept(index, record) {
            Ok(accepted) => accepted,
            Err(rejection) => {
                warn!(mapping = index, reason = rejection.metric_label(), "mapping skipped");
                sink.console(&format!("Mapping {index}: {}", rejection.message()));
                if let Some(metrics) = metrics {
                    metrics.inc_mapping_rejected(rejection.metric_label());
                }
                continue;
            }
        };
        if !local_file.starts_with(local.as_str()) {
            continue;
        }

        debug!(mapping = index, local = %local, remote = %remote, "mapping matched");
        resolved.push(merge(index, &local, &remote, &raw, config));
    }

    resolved
}

/// Overlay the fields present on `raw` onto the global defaults.
///
/// An explicit `null` for `host` or `identity_file` clears the default.
#[must_use]
pub fn merge(
    index: usize,
    local: &str,
    remote: &str,
    raw: &RawMapping,
    config: &GlobalConfig,
) -> Mapping {
    Mapping {
        index,
        local: local.to_string(),
        remote: remote.to_string(),
        method: raw.method.clone().unwrap_or_else(|| config.method.clone()),
        host: overlay(raw.host.as_ref(), config.host.as_ref()),
        port: raw.port.unwrap_or(config.port),
        user_name: raw
            .user_name
            .as_deref()
            .filter(|name| !name.is_empty())
            .map_or_else(|| config.user_name.clone(), ToString::to_string),
        identity_file: overlay(raw.identity_file.as_ref(), config.identity_file.as_ref()),
        preserve_metadata: raw.preserve_metadata.unwrap_or(config.preserve_metadata),
    }
}

fn accept(index: usize, record: &Value) -> Result<(RawMapping, String, String), Rejection> {
    let raw = RawMapping::decode(index, record).map_err(|err| match err {
        ConfigError::InvalidMapping { source, .. } => Rejection::Malformed(source.to_string()),
        other => Rejection::Malformed(other.summary()),
    })?;
    let local = raw
        .local
        .clone()
        .filter(|value| !value.is_empty())
        .ok_or(Rejection::MissingLocal)?;
    let remote = raw
        .remote
        .clone()
        .filter(|value| !value.is_empty())
        .ok_or(Rejection::MissingRemote)?;
    Ok((raw, local, remote))
}

fn overlay(field: Option<&Option<String>>, default: Option<&String>) -> Option<String> {
    match field {
        Some(value) => value.clone().filter(|value| !value.is_empty()),
        None => default.cloned(),
    }
}
