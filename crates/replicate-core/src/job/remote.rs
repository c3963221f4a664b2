use replicate_config::Mapping;

use super::{CopyPlan, JobContext, OutputChannel, PlannedCommand, ReplicationJob};
use crate::error::{ReplicateError, ReplicateResult};
use crate::exec::{CommandSpec, shell_quote};
use crate::path::{copy_destination, label, parent_dir, to_remote_path};

/// Copies to another host with `scp`, creating directories over `ssh`.
#[derive(Debug, Clone)]
pub struct RemoteCopyJob {
    local_file: String,
    mapping: Mapping,
    context: JobContext,
}

impl RemoteCopyJob {
    /// Create a job for `local_file` under `mapping`.
    #[must_use]
    pub const fn new(local_file: String, mapping: Mapping, context: JobContext) -> Self {
        Self {
            local_file,
            mapping,
            context,
        }
    }

    fn identity_args(&self) -> Vec<String> {
        self.mapping
            .identity_file
            .as_deref()
            .filter(|identity| !identity.is_empty())
            .map(|identity| vec!["-i".to_string(), identity.to_string()])
            .unwrap_or_default()
    }

    /// `ssh` invocation creating `directory` on the remote side.
    ///
    /// The remote command is the only string a shell evaluates, so the path
    /// inside it is quoted.
    fn remote_mkdir(&self, user_host: &str, directory: &str) -> CommandSpec {
        let mut remote_command = String::from("mkdir -p");
        if self.context.debug {
            remote_command.push_str(" -v");
        }
        remote_command.push(' ');
        remote_command.push_str(&shell_quote(directory));

        CommandSpec::new("ssh")
            .arg("-n")
            .arg("-p")
            .arg(self.mapping.port.to_string())
            .args(self.identity_args())
            .arg(user_host)
            .arg(remote_command)
    }
}

impl ReplicationJob for RemoteCopyJob {
    fn mapping(&self) -> &Mapping {
        &self.mapping
    }

    fn context(&self) -> &JobContext {
        &self.context
    }

    fn plan(&self) -> ReplicateResult<CopyPlan> {
        let host = self
            .mapping
            .host
            .as_deref()
            .filter(|host| !host.is_empty())
            .ok_or(ReplicateError::MissingHost {
                mapping: self.mapping.index,
            })?;
        let user_host = format!("{}@{host}", self.mapping.user_name);
        let remote_path = to_remote_path(&self.local_file, &self.mapping);
        let destination = copy_destination(&self.local_file, &remote_path);
        let target = format!("{user_host}:{destination}");
        let name = label(&self.local_file);

        let mkdir = self.context.mkdir.then(|| PlannedCommand {
            command: self.remote_mkdir(&user_host, &parent_dir(&remote_path)),
            channel: OutputChannel::Console,
        });
        let copy = PlannedCommand {
            command: CommandSpec::new("scp")
                .arg("-B")
                .arg("-r")
                .arg("-P")
                .arg(self.mapping.port.to_string())
                .flag(self.mapping.preserve_metadata, "-p")
                .args(self.identity_args())
                .arg(self.local_file.as_str())
                .arg(target.as_str()),
            channel: OutputChannel::Both,
        };

        Ok(CopyPlan {
            console: format!("{name} -> {target}"),
            status: format!("{name} -> {host}"),
            mkdir,
            copy,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exec::ProcessRunner;
    use crate::report::TracingSink;
    use anyhow::Result;
    use replicate_config::Method;
    use std::sync::Arc;

    fn context(debug: bool, mkdir: bool) -> JobContext {
        JobContext {
            debug,
            mkdir,
            sink: Arc::new(TracingSink),
            runner: Arc::new(ProcessRunner),
            metrics: None,
        }
    }

    fn mapping() -> Mapping {
        Mapping {
            index: 2,
            local: "/proj".to_string(),
            remote: "/srv/www".to_string(),
            method: Method::RemoteCopy,
            host: Some("example.org".to_string()),
            port: 2222,
            user_name: "deploy".to_string(),
            identity_file: None,
            preserve_metadata: false,
        }
    }

    fn args(command: &CommandSpec) -> Vec<&str> {
        command.arguments().iter().map(String::as_str).collect()
    }

    #[test]
    fn scp_targets_user_at_host() -> Result<()> {
        let job = RemoteCopyJob::new("/proj/a.txt".into(), mapping(), context(false, false));
        let plan = job.plan()?;
        assert_eq!(plan.console, "a.txt -> deploy@example.org:/srv/www/a.txt");
        assert_eq!(plan.status, "a.txt -> example.org");
        assert!(plan.mkdir.is_none());
        assert_eq!(plan.copy.command.program(), "scp");
        assert_eq!(
            args(&plan.copy.command),
            vec![
                "-B",
                "-r",
                "-P",
                "2222",
                "/proj/a.txt",
                "deploy@example.org:/srv/www/a.txt"
            ]
        );
        Ok(())
    }

    #[test]
    fn identity_and_metadata_flags_reach_both_commands() -> Result<()> {
        let mut mapping = mapping();
        mapping.identity_file = Some("/home/deploy/.ssh/id_ed25519".to_string());
        mapping.preserve_metadata = true;
        let job = RemoteCopyJob::new("/proj/a.txt".into(), mapping, context(true, true));
        let plan = job.plan()?;

        let mkdir = plan.mkdir.as_ref().expect("mkdir step");
        assert_eq!(mkdir.command.program(), "ssh");
        assert_eq!(
            args(&mkdir.command),
            vec![
                "-n",
                "-p",
                "2222",
                "-i",
                "/home/deploy/.ssh/id_ed25519",
                "deploy@example.org",
                "mkdir -p -v /srv/www"
            ]
        );
        assert_eq!(
            args(&plan.copy.command),
            vec![
                "-B",
                "-r",
                "-P",
                "2222",
                "-p",
                "-i",
                "/home/deploy/.ssh/id_ed25519",
                "/proj/a.txt",
                "deploy@example.org:/srv/www/a.txt"
            ]
        );
        Ok(())
    }

    #[test]
    fn remote_mkdir_quotes_hostile_paths() -> Result<()> {
        let mut mapping = mapping();
        mapping.remote = "/srv/it's here; rm -rf ~".to_string();
        let job = RemoteCopyJob::new("/proj/sub/a.txt".into(), mapping, context(false, true));
        let plan = job.plan()?;
        let mkdir = plan.mkdir.expect("mkdir step");
        assert_eq!(
            mkdir.command.arguments().last().map(String::as_str),
            Some("mkdir -p '/srv/it'\\''s here; rm -rf ~/sub'")
        );
        Ok(())
    }

    #[test]
    fn missing_host_fails_before_any_command() {
        let mut mapping = mapping();
        mapping.host = None;
        let job = RemoteCopyJob::new("/proj/a.txt".into(), mapping.clone(), context(false, true));
        assert!(matches!(
            job.plan(),
            Err(ReplicateError::MissingHost { mapping: 2 })
        ));

        mapping.host = Some(String::new());
        let job = RemoteCopyJob::new("/proj/a.txt".into(), mapping, context(false, true));
        assert!(job.plan().is_err());
    }
}
