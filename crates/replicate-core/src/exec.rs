//! External command execution.
//!
//! # Design
//! - Commands are structured argument lists; no local shell is involved.
//! - stdout and stderr are read incrementally and merged line by line.
//! - Blank lines are dropped; the rest are trimmed before reaching the callback.

use std::fmt::{self, Display, Formatter};
use std::io;
use std::process::Stdio;

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{Child, Command};
use tokio_stream::StreamExt;
use tokio_stream::wrappers::SplitStream;
use tracing::{debug, warn};

use crate::error::{ReplicateError, ReplicateResult};

/// Callback receiving each non-empty output line.
pub type LineCallback<'a> = dyn Fn(&str) + Send + Sync + 'a;

/// Program and arguments for one external invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    program: String,
    args: Vec<String>,
}

impl CommandSpec {
    /// Start a command for `program` with no arguments.
    #[must_use]
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    /// Append one argument.
    #[must_use]
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Append `arg` only when `enabled` holds.
    #[must_use]
    pub fn flag(self, enabled: bool, arg: &str) -> Self {
        if enabled { self.arg(arg) } else { self }
    }

    /// Append every argument from `args`.
    #[must_use]
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Program name.
    #[must_use]
    pub fn program(&self) -> &str {
        &self.program
    }

    /// Arguments in order.
    #[must_use]
    pub fn arguments(&self) -> &[String] {
        &self.args
    }
}

impl Display for CommandSpec {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        formatter.write_str(&shell_quote(&self.program))?;
        for arg in &self.args {
            write!(formatter, " {}", shell_quote(arg))?;
        }
        Ok(())
    }
}

/// Quote `value` for a POSIX shell, leaving plain words untouched.
#[must_use]
pub fn shell_quote(value: &str) -> String {
    if value.is_empty() {
        return "''".to_string();
    }
    let plain = value
        .chars()
        .all(|ch| ch.is_ascii_alphanumeric() || "@%+=:,./-_".contains(ch));
    if plain {
        value.to_string()
    } else {
        format!("'{}'", value.replace('\'', "'\\''"))
    }
}

/// How an external program finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandOutcome {
    /// Exit code, or `None` when the process was terminated by a signal.
    pub code: Option<i32>,
}

impl CommandOutcome {
    /// Whether the program exited with status zero.
    #[must_use]
    pub const fn success(&self) -> bool {
        matches!(self.code, Some(0))
    }
}

/// Executes external commands on behalf of replication jobs.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Run `command` to completion, passing each output line to `on_line`.
    ///
    /// # Errors
    ///
    /// Returns an error when the program cannot be launched or awaited.
    /// A non-zero exit is reported through [`CommandOutcome`], not as an error.
    async fn run(
        &self,
        command: &CommandSpec,
        on_line: Option<&LineCallback<'_>>,
    ) -> ReplicateResult<CommandOutcome>;
}

/// Runner backed by `tokio::process`.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessRunner;

#[async_trait]
impl CommandRunner for ProcessRunner {
    async fn run(
        &self,
        command: &CommandSpec,
        on_line: Option<&LineCallback<'_>>,
    ) -> ReplicateResult<CommandOutcome> {
        let program = command.program().to_string();
        let mut child = Command::new(command.program())
            .args(command.arguments())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| ReplicateError::Spawn {
                program: program.clone(),
                source,
            })?;

        let (Some(stdout), Some(stderr)) = (child.stdout.take(), child.stderr.take()) else {
            let source = io::Error::other("output pipes unavailable");
            return Err(abandon(child, program, source).await);
        };

        let mut lines = SplitStream::new(BufReader::new(stdout).split(b'\n'))
            .merge(SplitStream::new(BufReader::new(stderr).split(b'\n')));

        while let Some(chunk) = lines.next().await {
            let chunk = match chunk {
                Ok(chunk) => chunk,
                Err(source) => {
                    drop(lines);
                    return Err(abandon(child, program, source).await);
                }
            };
            let text = String::from_utf8_lossy(&chunk);
            let line = text.trim();
            if line.is_empty() {
                continue;
            }
            if let Some(callback) = on_line {
                callback(line);
            }
        }

        let status = child
            .wait()
            .await
            .map_err(|source| ReplicateError::Wait {
                program: program.clone(),
                source,
            })?;
        debug!(program = %program, code = ?status.code(), "external command finished");
        Ok(CommandOutcome {
            code: status.code(),
        })
    }
}

/// Kill and reap a child whose output can no longer be read.
async fn abandon(mut child: Child, program: String, source: io::Error) -> ReplicateError {
    if let Err(err) = child.kill().await {
        warn!(program = %program, error = %err, "failed to stop external command");
    }
    ReplicateError::Output { program, source }
}
