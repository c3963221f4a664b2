//! Argument parsing and command dispatch for the `replicate` binary.

use std::path::{self, Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use replicate_config::{GlobalConfig, MemorySettings, apply_defaults};
use replicate_core::{Dispatch, Dispatcher, ReportSink};
use replicate_telemetry::{
    DEFAULT_LOG_LEVEL, LogFormat, LoggingConfig, Metrics, MetricsSnapshot, build_sha,
    init_logging,
};
use tracing::{debug, info};

use crate::error::{CliError, CliResult};
use crate::output::TerminalSink;

/// Parses CLI arguments, replicates the requested path, and waits for every
/// job. Returns the process exit code.
pub async fn run() -> i32 {
    let cli = Cli::parse();

    let logging = LoggingConfig {
        level: &cli.log_level,
        format: cli
            .log_format
            .as_deref()
            .map_or_else(LogFormat::infer, LogFormat::from_name),
        ..LoggingConfig::default()
    };
    if let Err(err) = init_logging(&logging).context("failed to install logger") {
        let err = CliError::failure(err);
        eprintln!("error: {}", err.display_message());
        return err.exit_code();
    }
    info!(build_sha = build_sha(), "replicate starting");

    let result = execute(cli, Arc::new(TerminalSink::stdio())).await;
    match result.and_then(Execution::into_result) {
        Ok(()) => 0,
        Err(err) => {
            eprintln!("error: {}", err.display_message());
            err.exit_code()
        }
    }
}

#[derive(Parser, Debug)]
#[command(
    name = "replicate",
    version,
    about = "Mirror saved files to local or remote destinations"
)]
pub(crate) struct Cli {
    #[arg(
        long,
        global = true,
        env = "REPLICATE_SETTINGS",
        help = "JSON settings document; built-in defaults when omitted"
    )]
    settings: Option<PathBuf>,
    #[arg(
        long,
        global = true,
        env = "RUST_LOG",
        default_value = DEFAULT_LOG_LEVEL,
        help = "Log level directive for diagnostics on stderr"
    )]
    log_level: String,
    #[arg(
        long,
        global = true,
        value_parser = ["pretty", "json"],
        help = "Log output format; pretty for debug builds and json otherwise"
    )]
    log_format: Option<String>,
    #[arg(
        long,
        global = true,
        help = "Print Prometheus metrics to stdout after the jobs finish"
    )]
    print_metrics: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub(crate) enum Command {
    /// Post-save hook; does nothing unless `replicate_on_save` is enabled.
    Save(PathArgs),
    /// Replicate a single file.
    File(PathArgs),
    /// Replicate the directory containing a path.
    Directory(PathArgs),
}

#[derive(Args, Debug, Clone, PartialEq, Eq)]
pub(crate) struct PathArgs {
    #[arg(help = "Saved file or directory")]
    path: PathBuf,
}

/// Result of one CLI invocation.
#[derive(Debug)]
pub(crate) struct Execution {
    pub(crate) launched: usize,
    pub(crate) snapshot: MetricsSnapshot,
    pub(crate) rendered_metrics: Option<String>,
}

impl Execution {
    fn into_result(self) -> CliResult<()> {
        debug!(
            launched = self.launched,
            failed = self.snapshot.jobs_failed,
            "cli run complete"
        );
        if let Some(text) = &self.rendered_metrics {
            print!("{text}");
        }
        if self.snapshot.jobs_failed > 0 {
            return Err(CliError::JobsFailed(self.snapshot.jobs_failed));
        }
        Ok(())
    }
}

pub(crate) async fn execute(cli: Cli, sink: Arc<dyn ReportSink>) -> CliResult<Execution> {
    let store = load_settings(cli.settings.as_deref())?;
    let metrics = Metrics::new()
        .context("failed to create metrics registry")
        .map_err(CliError::failure)?;
    let dispatcher = Dispatcher::new(Arc::new(store), sink).with_metrics(metrics.clone());

    let dispatch = dispatch(&dispatcher, &cli.command)?;
    let launched = dispatch.len();
    let completed = dispatch.wait().await;
    info!(launched, completed, "replication finished");

    let rendered_metrics = if cli.print_metrics {
        Some(
            metrics
                .render()
                .context("failed to render metrics")
                .map_err(CliError::failure)?,
        )
    } else {
        None
    };

    Ok(Execution {
        launched,
        snapshot: metrics.snapshot(),
        rendered_metrics,
    })
}

fn dispatch(dispatcher: &Dispatcher, command: &Command) -> CliResult<Dispatch> {
    let dispatch = match command {
        Command::Save(args) => dispatcher.on_post_save(&absolute(&args.path)?),
        Command::File(args) => dispatcher.replicate_file(&absolute(&args.path)?),
        Command::Directory(args) => dispatcher.replicate_directory(&absolute(&args.path)?),
    };
    Ok(dispatch)
}

fn load_settings(path: Option<&Path>) -> CliResult<MemorySettings> {
    let store = match path {
        Some(path) => MemorySettings::load(path).map_err(|err| {
            CliError::validation(format!(
                "failed to load settings from {}: {}",
                path.display(),
                err.summary()
            ))
        })?,
        None => MemorySettings::new(),
    };
    apply_defaults(&store);
    GlobalConfig::from_store(&store).map_err(|err| {
        CliError::validation(format!("Invalid settings: {}", err.summary()))
    })?;
    Ok(store)
}

fn absolute(path: &Path) -> CliResult<String> {
    if path.as_os_str().is_empty() {
        return Err(CliError::validation("path must not be empty"));
    }
    let absolute = path::absolute(path).map_err(|err| {
        CliError::validation(format!("cannot resolve {}: {err}", path.display()))
    })?;
    Ok(absolute.to_string_lossy().into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::tests::SharedBuffer;
    use anyhow::Result;
    use replicate_test_support::fixtures::{
        path_str, scratch_dir, tool_available, write_file, write_settings,
    };
    use serde_json::json;
    use std::fs;

    fn parse(args: &[&str]) -> Result<Cli> {
        Ok(Cli::try_parse_from(
            std::iter::once("replicate").chain(args.iter().copied()),
        )?)
    }

    fn terminal() -> (Arc<TerminalSink>, SharedBuffer, SharedBuffer) {
        let console = SharedBuffer::default();
        let status = SharedBuffer::default();
        let sink = TerminalSink::new(Box::new(console.clone()), Box::new(status.clone()));
        (Arc::new(sink), console, status)
    }

    #[test]
    fn parses_subcommands_and_global_flags() -> Result<()> {
        let cli = parse(&[
            "--settings",
            "/etc/replicate.json",
            "directory",
            "/proj/a.txt",
            "--print-metrics",
            "--log-format",
            "json",
        ])?;
        assert_eq!(cli.settings, Some(PathBuf::from("/etc/replicate.json")));
        assert!(cli.print_metrics);
        assert_eq!(cli.log_format.as_deref(), Some("json"));
        assert_eq!(
            cli.command,
            Command::Directory(PathArgs {
                path: PathBuf::from("/proj/a.txt")
            })
        );
        Ok(())
    }

    #[test]
    fn subcommand_is_required() {
        assert!(parse(&[]).is_err());
        assert!(parse(&["file"]).is_err());
    }

    #[test]
    fn relative_paths_are_made_absolute() -> Result<()> {
        let resolved = absolute(Path::new("notes/a.txt")).map_err(|err| {
            anyhow::anyhow!(err.display_message())
        })?;
        assert!(Path::new(&resolved).is_absolute());
        assert!(resolved.ends_with("notes/a.txt"));
        assert!(absolute(Path::new("")).is_err());
        Ok(())
    }

    #[test]
    fn unreadable_settings_are_a_validation_error() {
        let err = load_settings(Some(Path::new("/nonexistent/replicate.json")))
            .expect_err("missing file");
        assert_eq!(err.exit_code(), 2);
        assert!(err.display_message().starts_with("failed to load settings from"));
    }

    #[test]
    fn log_format_is_restricted_to_known_names() -> Result<()> {
        assert!(parse(&["--log-format", "yaml", "file", "/proj/a.txt"]).is_err());
        let cli = parse(&["file", "/proj/a.txt"])?;
        assert_eq!(cli.log_format, None);
        Ok(())
    }

    #[test]
    fn badly_typed_settings_are_a_validation_error() -> Result<()> {
        let scratch = scratch_dir()?;
        let settings = write_settings(scratch.path(), &json!({"mkdir": "yes"}))?;
        let err = load_settings(Some(settings.as_path())).expect_err("mkdir must be a boolean");
        assert_eq!(err.exit_code(), 2);
        assert!(err.display_message().starts_with("Invalid settings: "));
        Ok(())
    }

    #[tokio::test]
    async fn badly_typed_settings_launch_nothing() -> Result<()> {
        let scratch = scratch_dir()?;
        let settings = write_settings(
            scratch.path(),
            &json!({"port": "22", "replicate": [{"local": "/proj", "remote": "/srv"}]}),
        )?;
        let cli = parse(&["--settings", &path_str(&settings), "file", "/proj/a.txt"])?;
        let (sink, console, _status) = terminal();

        let err = execute(cli, sink).await.expect_err("port must be numeric");

        assert_eq!(err.exit_code(), 2);
        assert!(console.text().is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn file_command_copies_and_reports_to_the_terminal() -> Result<()> {
        if !tool_available("cp") {
            return Ok(());
        }
        let scratch = scratch_dir()?;
        let root = path_str(scratch.path());
        let source = write_file(scratch.path(), "src/a.txt", "payload")?;
        fs::create_dir_all(scratch.path().join("dst"))?;
        let settings = write_settings(
            scratch.path(),
            &json!({
                "method": "cp",
                "replicate": [{"local": format!("{root}/src"), "remote": format!("{root}/dst")}]
            }),
        )?;

        let cli = parse(&[
            "--settings",
            &path_str(&settings),
            "--print-metrics",
            "file",
            &path_str(&source),
        ])?;
        let (sink, console, status) = terminal();
        let execution = execute(cli, sink)
            .await
            .map_err(|err| anyhow::anyhow!(err.display_message()))?;

        assert_eq!(execution.launched, 1);
        assert_eq!(execution.snapshot.jobs_succeeded, 1);
        assert!(
            execution
                .rendered_metrics
                .as_deref()
                .is_some_and(|text| text.contains("replicate_jobs_total"))
        );
        assert_eq!(fs::read_to_string(format!("{root}/dst/a.txt"))?, "payload");
        assert_eq!(
            console.text(),
            format!("Replicate: a.txt -> {root}/dst/a.txt\n")
        );
        assert_eq!(status.text(), "Replicate: a.txt -> localhost\n");
        Ok(())
    }

    #[tokio::test]
    async fn failed_jobs_map_to_exit_code_one() -> Result<()> {
        let scratch = scratch_dir()?;
        let settings = write_settings(
            scratch.path(),
            &json!({
                "user_name": "deploy",
                "replicate": [{"local": "/proj", "remote": "/srv"}]
            }),
        )?;
        let cli = parse(&["--settings", &path_str(&settings), "file", "/proj/a.txt"])?;
        let (sink, console, _status) = terminal();

        let execution = execute(cli, sink)
            .await
            .map_err(|err| anyhow::anyhow!(err.display_message()))?;

        assert_eq!(execution.snapshot.jobs_failed, 1);
        assert_eq!(console.text(), "Replicate: Missing host\n");
        let err = execution.into_result().expect_err("job failed");
        assert_eq!(err.exit_code(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn save_command_respects_replicate_on_save() -> Result<()> {
        let scratch = scratch_dir()?;
        let settings = write_settings(
            scratch.path(),
            &json!({
                "replicate_on_save": false,
                "replicate": [{"local": "/proj", "remote": "/srv", "host": "example.org"}]
            }),
        )?;
        let cli = parse(&["--settings", &path_str(&settings), "save", "/proj/a.txt"])?;
        let (sink, console, status) = terminal();

        let execution = execute(cli, sink)
            .await
            .map_err(|err| anyhow::anyhow!(err.display_message()))?;

        assert_eq!(execution.launched, 0);
        assert!(console.text().is_empty());
        assert!(status.text().is_empty());
        Ok(())
    }
}
