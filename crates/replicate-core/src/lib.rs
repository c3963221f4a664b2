#![forbid(unsafe_code)]
#![deny(
    unused_must_use,
    unreachable_pub,
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    rustdoc::broken_intra_doc_links,
    rustdoc::bare_urls,
    missing_docs
)]
#![allow(clippy::module_name_repetitions)]

//! Mapping resolution and replication dispatch.
//!
//! Layout: `path.rs` (normalisation and local-to-remote rewriting),
//! `mapping.rs` (selection and merging of configured mappings), `job/`
//! (local and remote copy jobs), `exec.rs` (external command runner),
//! `dispatch.rs` (per-save fan-out), `report.rs` (console/status sinks).

pub mod dispatch;
pub mod error;
pub mod exec;
pub mod job;
pub mod mapping;
pub mod model;
pub mod path;
pub mod report;

pub use dispatch::{Dispatch, Dispatcher, LaunchedJob};
pub use error::{ReplicateError, ReplicateResult};
pub use exec::{CommandOutcome, CommandRunner, CommandSpec, LineCallback, ProcessRunner};
pub use job::{CopyPlan, JobContext, LocalCopyJob, RemoteCopyJob, ReplicationJob};
pub use model::ReplicationRequest;
pub use report::{ReportSink, TracingSink, render};
