//! Prometheus-backed counters for replication activity.
//!
//! # Design
//! - Encapsulates collector registration to keep the public API small.
//! - Counters only: dispatches, jobs by outcome, rejected mappings, and
//!   external commands by exit status.

use std::sync::Arc;

use prometheus::{Encoder, IntCounter, IntCounterVec, Opts, Registry, TextEncoder};
use serde::Serialize;

use crate::error::{Result, TelemetryError};

/// Outcome label for jobs whose commands all succeeded.
pub const JOB_SUCCEEDED: &str = "succeeded";
/// Outcome label for jobs that reported a failure.
pub const JOB_FAILED: &str = "failed";
/// Method labels that can appear on job counters.
pub const JOB_METHODS: &[&str] = &["cp", "scp"];
/// Reason labels that can appear on the rejected-mapping counter.
pub const REJECTION_REASONS: &[&str] = &[
    "malformed",
    "missing_local",
    "missing_remote",
    "unrecognised_method",
];

/// Prometheus registry shared by the dispatcher and its jobs.
#[derive(Clone)]
pub struct Metrics {
    inner: Arc<MetricsInner>,
}

struct MetricsInner {
    registry: Registry,
    dispatches_total: IntCounter,
    jobs_total: IntCounterVec,
    mappings_rejected_total: IntCounterVec,
    commands_total: IntCounterVec,
}

/// Point-in-time view of the aggregate counters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    /// Dispatch calls that reached mapping resolution.
    pub dispatches_total: u64,
    /// Jobs that finished with every command succeeding.
    pub jobs_succeeded: u64,
    /// Jobs that reported at least one failure.
    pub jobs_failed: u64,
    /// Mapping records rejected during resolution or dispatch.
    pub mappings_rejected: u64,
}

impl Metrics {
    /// Construct a new registry with the standard collectors registered.
    ///
    /// # Errors
    ///
    /// Returns an error if any of the Prometheus collectors cannot be built or
    /// registered.
    pub fn new() -> Result<Self> {
        let registry = Registry::new();

        let dispatches_total = IntCounter::with_opts(Opts::new(
            "replicate_dispatches_total",
            "Replication requests that reached mapping resolution",
        ))
        .map_err(|source| TelemetryError::build("replicate_dispatches_total", source))?;
        let jobs_total = IntCounterVec::new(
            Opts::new("replicate_jobs_total", "Replication jobs by method and outcome"),
            &["method", "outcome"],
        )
        .map_err(|source| TelemetryError::build("replicate_jobs_total", source))?;
        let mappings_rejected_total = IntCounterVec::new(
            Opts::new(
                "replicate_mappings_rejected_total",
                "Mapping records skipped by reason",
            ),
            &["reason"],
        )
        .map_err(|source| TelemetryError::build("replicate_mappings_rejected_total", source))?;
        let commands_total = IntCounterVec::new(
            Opts::new(
                "replicate_commands_total",
                "External commands executed by program and outcome",
            ),
            &["program", "outcome"],
        )
        .map_err(|source| TelemetryError::build("replicate_commands_total", source))?;

        registry
            .register(Box::new(dispatches_total.clone()))
            .map_err(|source| TelemetryError::register("replicate_dispatches_total", source))?;
        registry
            .register(Box::new(jobs_total.clone()))
            .map_err(|source| TelemetryError::register("replicate_jobs_total", source))?;
        registry
            .register(Box::new(mappings_rejected_total.clone()))
            .map_err(|source| {
                TelemetryError::register("replicate_mappings_rejected_total", source)
            })?;
        registry
            .register(Box::new(commands_total.clone()))
            .map_err(|source| TelemetryError::register("replicate_commands_total", source))?;

        Ok(Self {
            inner: Arc::new(MetricsInner {
                registry,
                dispatches_total,
                jobs_total,
                mappings_rejected_total,
                commands_total,
            }),
        })
    }

    /// Count a dispatch call.
    pub fn inc_dispatch(&self) {
        self.inner.dispatches_total.inc();
    }

    /// Count a finished job (`outcome` is `succeeded` or `failed`).
    pub fn inc_job(&self, method: &str, outcome: &str) {
        self.inner
            .jobs_total
            .with_label_values(&[method, outcome])
            .inc();
    }

    /// Count a skipped mapping record.
    pub fn inc_mapping_rejected(&self, reason: &str) {
        self.inner
            .mappings_rejected_total
            .with_label_values(&[reason])
            .inc();
    }

    /// Count an external command (`outcome` is `success`, `failure` or `spawn_error`).
    pub fn inc_command(&self, program: &str, outcome: &str) {
        self.inner
            .commands_total
            .with_label_values(&[program, outcome])
            .inc();
    }

    /// Current value of a single command counter.
    #[must_use]
    pub fn command_count(&self, program: &str, outcome: &str) -> u64 {
        self.inner
            .commands_total
            .with_label_values(&[program, outcome])
            .get()
    }

    /// Render the registry using the Prometheus text exposition format.
    ///
    /// # Errors
    ///
    /// Returns an error if the metrics cannot be encoded or if the encoded
    /// buffer is not valid UTF-8.
    pub fn render(&self) -> Result<String> {
        let encoder = TextEncoder::new();
        let metric_families = self.inner.registry.gather();
        let mut buffer = Vec::new();
        encoder
            .encode(&metric_families, &mut buffer)
            .map_err(|source| TelemetryError::Encode { source })?;
        String::from_utf8(buffer).map_err(|source| TelemetryError::Utf8 { source })
    }

    /// Take a point-in-time snapshot of the aggregate counters.
    #[must_use]
    pub fn snapshot(&self) -> MetricsSnapshot {
        let jobs = |outcome: &str| -> u64 {
            JOB_METHODS
                .iter()
                .map(|method| {
                    self.inner
                        .jobs_total
                        .with_label_values(&[*method, outcome])
                        .get()
                })
                .sum()
        };
        let mappings_rejected = REJECTION_REASONS
            .iter()
            .map(|reason| {
                self.inner
                    .mappings_rejected_total
                    .with_label_values(&[*reason])
                    .get()
            })
            .sum();

        MetricsSnapshot {
            dispatches_total: self.inner.dispatches_total.get(),
            jobs_succeeded: jobs(JOB_SUCCEEDED),
            jobs_failed: jobs(JOB_FAILED),
            mappings_rejected,
        }
    }
}
