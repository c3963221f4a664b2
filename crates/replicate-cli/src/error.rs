//! CLI error type distinguishing bad input from operational failures.

use std::fmt::{self, Display, Formatter};

/// CLI-level error carrying the exit code policy.
#[derive(Debug)]
pub(crate) enum CliError {
    /// The invocation or the settings document is unusable.
    Validation(String),
    /// The environment could not be prepared.
    Failure(anyhow::Error),
    /// At least one replication job reported a failure.
    JobsFailed(u64),
}

/// Convenience alias for functions returning a `CliError`.
pub(crate) type CliResult<T> = Result<T, CliError>;

impl CliError {
    pub(crate) fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub(crate) fn failure(error: impl Into<anyhow::Error>) -> Self {
        Self::Failure(error.into())
    }

    pub(crate) const fn exit_code(&self) -> i32 {
        match self {
            Self::JobsFailed(_) => 1,
            Self::Validation(_) => 2,
            Self::Failure(_) => 3,
        }
    }

    pub(crate) fn display_message(&self) -> String {
        match self {
            Self::Validation(message) => message.clone(),
            Self::Failure(error) => format!("{error:#}"),
            Self::JobsFailed(count) => format!("{count} replication job(s) failed"),
        }
    }
}

impl Display for CliError {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        formatter.write_str("cli error")
    }
}

impl std::error::Error for CliError {}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;

    #[test]
    fn exit_codes_follow_error_kind() {
        assert_eq!(CliError::JobsFailed(2).exit_code(), 1);
        assert_eq!(CliError::validation("bad").exit_code(), 2);
        assert_eq!(CliError::failure(anyhow!("boom")).exit_code(), 3);
    }

    #[test]
    fn display_message_includes_context_chain() {
        let err = CliError::failure(anyhow!("root cause").context("installing logger"));
        assert_eq!(err.display_message(), "installing logger: root cause");
        assert_eq!(
            CliError::JobsFailed(2).display_message(),
            "2 replication job(s) failed"
        );
        assert_eq!(err.to_string(), "cli error");
    }
}
