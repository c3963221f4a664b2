//! Dispatch of replication jobs for a saved path.
//!
//! # Design
//! - Each dispatch reads a fresh settings snapshot and never writes it back.
//! - One tokio task per applicable mapping, launched in configuration order.
//! - [`Dispatcher::do_replicate`] returns immediately; the [`Dispatch`] handle
//!   may be awaited or dropped.

use std::fmt::{self, Debug, Formatter};
use std::sync::Arc;

use replicate_config::{GlobalConfig, Method, SettingsStore};
use replicate_telemetry::Metrics;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{Instrument, debug, info, info_span, warn};
use uuid::Uuid;

use crate::error::ReplicateError;
use crate::exec::{CommandRunner, ProcessRunner};
use crate::job::{JobContext, LocalCopyJob, RemoteCopyJob, ReplicationJob};
use crate::mapping::resolve;
use crate::model::ReplicationRequest;
use crate::path::label;
use crate::report::ReportSink;

/// Entry point used by hosts to replicate saved paths.
pub struct Dispatcher {
    settings: Arc<dyn SettingsStore>,
    sink: Arc<dyn ReportSink>,
    runner: Arc<dyn CommandRunner>,
    metrics: Option<Metrics>,
    runtime: Option<Handle>,
}

impl Debug for Dispatcher {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("Dispatcher")
            .field("metrics", &self.metrics.is_some())
            .field("runtime", &self.runtime.is_some())
            .finish_non_exhaustive()
    }
}

impl Dispatcher {
    /// Dispatcher running real processes through [`ProcessRunner`].
    #[must_use]
    pub fn new(settings: Arc<dyn SettingsStore>, sink: Arc<dyn ReportSink>) -> Self {
        Self {
            settings,
            sink,
            runner: Arc::new(ProcessRunner),
            metrics: None,
            runtime: None,
        }
    }

    /// Replace the command runner.
    #[must_use]
    pub fn with_runner(mut self, runner: Arc<dyn CommandRunner>) -> Self {
        self.runner = runner;
        self
    }

    /// Record counters into `metrics`.
    #[must_use]
    pub fn with_metrics(mut self, metrics: Metrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Spawn jobs on `handle` instead of the ambient runtime.
    #[must_use]
    pub fn with_runtime(mut self, handle: Handle) -> Self {
        self.runtime = Some(handle);
        self
    }

    /// File-saved hook: replicates only when `replicate_on_save` is enabled.
    pub fn on_post_save(&self, local_file: &str) -> Dispatch {
        match GlobalConfig::from_store(self.settings.as_ref()) {
            Ok(config) if config.replicate_on_save => self.do_replicate(local_file, false),
            Ok(_) => {
                debug!(local_file, "replicate_on_save disabled; save ignored");
                Dispatch::empty()
            }
            Err(source) => {
                self.report(&ReplicateError::Settings { source });
                Dispatch::empty()
            }
        }
    }

    /// Manual action replicating a single file.
    pub fn replicate_file(&self, local_file: &str) -> Dispatch {
        self.do_replicate(local_file, false)
    }

    /// Manual action replicating the directory containing `local_file`.
    pub fn replicate_directory(&self, local_file: &str) -> Dispatch {
        self.do_replicate(local_file, true)
    }

    /// Launch one job per mapping that applies to `local_file`.
    ///
    /// Returns as soon as the jobs are spawned. Problems are reported to the
    /// sink; nothing is returned to the caller except the job handles.
    pub fn do_replicate(&self, local_file: &str, directory_mode: bool) -> Dispatch {
        let id = Uuid::new_v4();
        let span = info_span!("dispatch", dispatch_id = %id, directory_mode);
        let _entered = span.enter();

        let config = match GlobalConfig::from_store(self.settings.as_ref()) {
            Ok(config) => config,
            Err(source) => {
                self.report(&ReplicateError::Settings { source });
                return Dispatch::empty();
            }
        };

        if config.debug {
            self.sink.console(&format!("Got local file: {local_file}"));
        }

        let request = match ReplicationRequest::new(local_file, directory_mode) {
            Ok(request) => request,
            Err(err) => {
                self.report(&err);
                return Dispatch::empty();
            }
        };

        if let Some(metrics) = &self.metrics {
            metrics.inc_dispatch();
        }

        let mappings = resolve(
            &config,
            &request.local_file,
            self.sink.as_ref(),
            self.metrics.as_ref(),
        );
        if mappings.is_empty() {
            debug!(local_file = %request.local_file, "no mappings apply");
            if config.debug {
                self.sink.console(&format!(
                    "{}: No mappings found",
                    label(&request.local_file)
                ));
            }
            return Dispatch::empty();
        }

        let Some(runtime) = self.runtime.clone().or_else(|| Handle::try_current().ok()) else {
            self.report(&ReplicateError::NoRuntime);
            return Dispatch::empty();
        };

        let context = JobContext {
            debug: config.debug,
            mkdir: config.mkdir,
            sink: Arc::clone(&self.sink),
            runner: Arc::clone(&self.runner),
            metrics: self.metrics.clone(),
        };

        let mut jobs = Vec::with_capacity(mappings.len());
        for (position, mapping) in mappings.into_iter().enumerate() {
            let index = mapping.index;
            let method = mapping.method.clone();
            let job: Box<dyn ReplicationJob> = match &method {
                Method::LocalCopy => Box::new(LocalCopyJob::new(
                    request.local_file.clone(),
                    mapping,
                    context.clone(),
                )),
                Method::RemoteCopy => Box::new(RemoteCopyJob::new(
                    request.local_file.clone(),
                    mapping,
                    context.clone(),
                )),
                Method::Unrecognised(value) => {
                    // Numbered among the matched mappings, not the configuration.
                    let matched = position + 1;
                    warn!(mapping = index, matched, method = %value, "unrecognised replication method");
                    self.sink
                        .console(&format!("Mapping {matched}: Unrecognised method: {value}"));
                    if let Some(metrics) = &self.metrics {
                        metrics.inc_mapping_rejected("unrecognised_method");
                    }
                    continue;
                }
            };

            let job_span = info_span!("replication_job", dispatch_id = %id, mapping = index, method = %method);
            let handle = runtime.spawn(async move { job.run().await }.instrument(job_span));
            jobs.push(LaunchedJob {
                index,
                method,
                handle,
            });
        }

        info!(jobs = jobs.len(), local_file = %request.local_file, "replication dispatched");
        Dispatch { id, jobs }
    }

    fn report(&self, err: &ReplicateError) {
        warn!(error = %err, detail = %err.report_message(), "replication not dispatched");
        self.sink.both(&err.report_message());
    }
}

/// A job spawned by a dispatch.
#[derive(Debug)]
pub struct LaunchedJob {
    /// 1-based configuration position of the mapping.
    pub index: usize,
    /// Method the job uses.
    pub method: Method,
    handle: JoinHandle<()>,
}

/// Handle over the jobs launched by one dispatch.
#[derive(Debug)]
#[must_use = "drop the dispatch to detach its jobs, or await `wait`"]
pub struct Dispatch {
    id: Uuid,
    jobs: Vec<LaunchedJob>,
}

impl Dispatch {
    fn empty() -> Self {
        Self {
            id: Uuid::new_v4(),
            jobs: Vec::new(),
        }
    }

    /// Identifier attached to the dispatch's log spans.
    #[must_use]
    pub const fn id(&self) -> Uuid {
        self.id
    }

    /// Launched jobs in configuration order.
    #[must_use]
    pub fn jobs(&self) -> &[LaunchedJob] {
        &self.jobs
    }

    /// Number of launched jobs.
    #[must_use]
    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    /// Whether no job was launched.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    /// Wait for every job to finish; returns how many ran to completion.
    pub async fn wait(self) -> usize {
        let mut completed = 0;
        for job in self.jobs {
            match job.handle.await {
                Ok(()) => completed += 1,
                Err(err) => {
                    warn!(mapping = job.index, error = %err, "replication job aborted");
                }
            }
        }
        completed
    }
}
