//! Test fixtures and environment helpers.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde_json::Value;
use tempfile::TempDir;

/// File name used for settings documents written by [`write_settings`].
pub const SETTINGS_FILE_NAME: &str = "Replicate.settings.json";

/// Create a scratch directory that is removed when dropped.
///
/// # Errors
///
/// Returns an error if the temporary directory cannot be created.
pub fn scratch_dir() -> Result<TempDir> {
    tempfile::Builder::new()
        .prefix("replicate-")
        .tempdir()
        .context("failed to create scratch directory")
}

/// Write `contents` to `root/relative`, creating parent directories.
///
/// # Errors
///
/// Returns an error if a directory or the file cannot be written.
pub fn write_file(root: &Path, relative: &str, contents: &str) -> Result<PathBuf> {
    let path = root.join(relative);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    fs::write(&path, contents).with_context(|| format!("failed to write {}", path.display()))?;
    Ok(path)
}

/// Serialise `settings` into a settings document inside `root`.
///
/// # Errors
///
/// Returns an error if the document cannot be serialised or written.
pub fn write_settings(root: &Path, settings: &Value) -> Result<PathBuf> {
    let text = serde_json::to_string_pretty(settings).context("failed to encode settings")?;
    write_file(root, SETTINGS_FILE_NAME, &text)
}

/// Render a path as the `String` form the engine works with.
#[must_use]
pub fn path_str(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

/// Returns `true` if `program` resolves to an executable on `PATH`.
#[must_use]
pub fn tool_available(program: &str) -> bool {
    tool_available_in(program, env::var_os("PATH"))
}

fn tool_available_in(program: &str, search_path: Option<std::ffi::OsString>) -> bool {
    search_path.is_some_and(|paths| {
        env::split_paths(&paths).any(|directory| directory.join(program).is_file())
    })
}
