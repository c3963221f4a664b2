use replicate_config::Mapping;

use super::{CopyPlan, JobContext, OutputChannel, PlannedCommand, ReplicationJob, local_mkdir};
use crate::error::ReplicateResult;
use crate::exec::CommandSpec;
use crate::path::{copy_destination, label, parent_dir, to_remote_path};

/// Copies through the local filesystem with `cp -R`.
#[derive(Debug, Clone)]
pub struct LocalCopyJob {
    local_file: String,
    mapping: Mapping,
    context: JobContext,
}

impl LocalCopyJob {
    /// Create a job for `local_file` under `mapping`.
    #[must_use]
    pub const fn new(local_file: String, mapping: Mapping, context: JobContext) -> Self {
        Self {
            local_file,
            mapping,
            context,
        }
    }
}

impl ReplicationJob for LocalCopyJob {
    fn mapping(&self) -> &Mapping {
        &self.mapping
    }

    fn context(&self) -> &JobContext {
        &self.context
    }

    fn plan(&self) -> ReplicateResult<CopyPlan> {
        let verbose = self.context.debug;
        let remote_path = to_remote_path(&self.local_file, &self.mapping);
        let destination = copy_destination(&self.local_file, &remote_path);
        let name = label(&self.local_file);

        let mkdir = self.context.mkdir.then(|| PlannedCommand {
            command: local_mkdir(&parent_dir(&remote_path), verbose),
            channel: OutputChannel::Console,
        });
        let copy = PlannedCommand {
            command: CommandSpec::new("cp")
                .arg("-R")
                .flag(verbose, "-v")
                .flag(self.mapping.preserve_metadata, "-p")
                .arg(self.local_file.as_str())
                .arg(destination),
            channel: OutputChannel::Both,
        };

        Ok(CopyPlan {
            console: format!("{name} -> {remote_path}"),
            status: format!("{name} -> localhost"),
            mkdir,
            copy,
        })
    }
}
