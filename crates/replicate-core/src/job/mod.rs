//! Replication jobs.
//!
//! # Design
//! - A job turns one resolved mapping into a [`CopyPlan`]: two announcement
//!   lines plus an optional `mkdir` step and the copy command.
//! - Planning is pure so command lines can be checked without running them.
//! - [`ReplicationJob::run`] executes the plan on the caller's task and
//!   reports every outcome to the sink; it never returns an error.
//! - A failed `mkdir` is reported and the copy is still attempted; a command
//!   that cannot be launched ends the job.

mod local;
mod remote;

use std::sync::Arc;

use async_trait::async_trait;
use replicate_config::Mapping;
use replicate_telemetry::Metrics;
use replicate_telemetry::metrics::{JOB_FAILED, JOB_SUCCEEDED};
use tracing::{debug, info, warn};

use crate::error::{ReplicateError, ReplicateResult};
use crate::exec::{CommandRunner, CommandSpec};
use crate::report::ReportSink;

pub use local::LocalCopyJob;
pub use remote::RemoteCopyJob;

/// Shared collaborators handed to every job of a dispatch.
#[derive(Clone)]
pub struct JobContext {
    /// Emit `-v` flags and command echoes.
    pub debug: bool,
    /// Create the destination's parent directory before copying.
    pub mkdir: bool,
    /// Where reports go.
    pub sink: Arc<dyn ReportSink>,
    /// Executes the external tools.
    pub runner: Arc<dyn CommandRunner>,
    /// Optional counters.
    pub metrics: Option<Metrics>,
}

impl std::fmt::Debug for JobContext {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("JobContext")
            .field("debug", &self.debug)
            .field("mkdir", &self.mkdir)
            .field("metrics", &self.metrics.is_some())
            .finish_non_exhaustive()
    }
}

/// Which sinks receive a command's output lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputChannel {
    /// Console only.
    Console,
    /// Console and status.
    Both,
}

/// One external command together with where its output is shown.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedCommand {
    /// Command to run.
    pub command: CommandSpec,
    /// Output routing.
    pub channel: OutputChannel,
}

/// Everything a job will announce and execute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CopyPlan {
    /// Console announcement, e.g. `a.txt -> deploy@host:/srv/a.txt`.
    pub console: String,
    /// Status announcement, e.g. `a.txt -> host`.
    pub status: String,
    /// Directory creation step, when enabled.
    pub mkdir: Option<PlannedCommand>,
    /// Copy step.
    pub copy: PlannedCommand,
}

impl CopyPlan {
    /// Commands in execution order.
    pub fn commands(&self) -> impl Iterator<Item = &PlannedCommand> {
        self.mkdir.iter().chain(std::iter::once(&self.copy))
    }
}

/// A unit of replication work for one mapping.
#[async_trait]
pub trait ReplicationJob: Send + Sync {
    /// Resolved mapping this job serves.
    fn mapping(&self) -> &Mapping;

    /// Collaborators shared with the rest of the dispatch.
    fn context(&self) -> &JobContext;

    /// Build the announcements and commands.
    ///
    /// # Errors
    ///
    /// Returns an error when the mapping cannot be served, before any
    /// command is issued.
    fn plan(&self) -> ReplicateResult<CopyPlan>;

    /// Execute the plan, reporting every outcome to the sink.
    async fn run(&self) {
        let context = self.context();
        let mapping = self.mapping();
        let method = mapping.method.metric_label();

        if context.debug {
            context.sink.console(&format!(
                "Mapping {}: starting {} job",
                mapping.index, mapping.method
            ));
        }

        let succeeded = match self.plan() {
            Ok(plan) => execute(context, &plan).await,
            Err(err) => {
                report(context, &err);
                false
            }
        };

        if succeeded {
            info!(mapping = mapping.index, method, "replication job finished");
        } else {
            warn!(mapping = mapping.index, method, "replication job failed");
        }
        if let Some(metrics) = &context.metrics {
            metrics.inc_job(method, if succeeded { JOB_SUCCEEDED } else { JOB_FAILED });
        }
    }
}

/// `mkdir -p [-v] <directory>` on the local machine.
pub(crate) fn local_mkdir(directory: &str, verbose: bool) -> CommandSpec {
    CommandSpec::new("mkdir")
        .arg("-p")
        .flag(verbose, "-v")
        .arg(directory)
}

async fn execute(context: &JobContext, plan: &CopyPlan) -> bool {
    context.sink.console(&plan.console);
    context.sink.status(&plan.status);

    let mut succeeded = true;
    for step in plan.commands() {
        match run_step(context, step).await {
            StepOutcome::Completed => {}
            StepOutcome::Failed => succeeded = false,
            StepOutcome::NotLaunched => return false,
        }
    }
    succeeded
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StepOutcome {
    Completed,
    Failed,
    NotLaunched,
}

async fn run_step(context: &JobContext, step: &PlannedCommand) -> StepOutcome {
    let command = &step.command;
    let program = command.program();
    if context.debug {
        context
            .sink
            .console(&format!("Executing command: {command}"));
    }
    debug!(command = %command, "executing external command");

    let sink = context.sink.as_ref();
    let forward = |line: &str| match step.channel {
        OutputChannel::Console => sink.console(line),
        OutputChannel::Both => sink.both(line),
    };

    let (label, outcome, failure) = match context.runner.run(command, Some(&forward)).await {
        Ok(exit) if exit.success() => ("success", StepOutcome::Completed, None),
        Ok(exit) => (
            "failure",
            StepOutcome::Failed,
            Some(ReplicateError::CommandFailed {
                program: program.to_string(),
                code: exit.code,
            }),
        ),
        Err(err @ ReplicateError::Spawn { .. }) => {
            ("spawn_error", StepOutcome::NotLaunched, Some(err))
        }
        Err(err) => ("failure", StepOutcome::Failed, Some(err)),
    };

    if let Some(metrics) = &context.metrics {
        metrics.inc_command(program, label);
    }
    if let Some(err) = failure {
        report(context, &err);
    }
    outcome
}

fn report(context: &JobContext, err: &ReplicateError) {
    warn!(error = %err, detail = %err.report_message(), "replication step failed");
    context.sink.both(&err.report_message());
}
