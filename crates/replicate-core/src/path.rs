//! Path normalisation, labelling, and local-to-remote rewriting.
//!
//! Paths are handled as `/`-separated strings because mapping matching and
//! rewriting are textual; the filesystem is consulted only to tell files from
//! directories.

use std::path::{MAIN_SEPARATOR, Path};

use replicate_config::Mapping;

/// Separator used by every path this module produces.
pub const SEPARATOR: char = '/';

/// Lexically normalise `path`.
///
/// Converts the platform separator to `/`, collapses repeated separators,
/// drops `.` segments, resolves `..` against the preceding segment and removes
/// any trailing separator. An empty path normalises to `.`.
#[must_use]
pub fn normalize(path: &str) -> String {
    let path = canonical_separators(path);
    let absolute = path.starts_with(SEPARATOR);
    let mut segments: Vec<&str> = Vec::new();

    for segment in path.split(SEPARATOR) {
        match segment {
            "" | "." => {}
            ".." => {
                if segments.last().is_some_and(|last| *last != "..") {
                    segments.pop();
                } else if !absolute {
                    segments.push("..");
                }
            }
            other => segments.push(other),
        }
    }

    let joined = segments.join("/");
    if absolute {
        format!("{SEPARATOR}{joined}")
    } else if joined.is_empty() {
        ".".to_string()
    } else {
        joined
    }
}

/// Final component of the normalised path (empty for `/`).
#[must_use]
pub fn base_name(path: &str) -> String {
    let normalized = normalize(path);
    normalized
        .rsplit(SEPARATOR)
        .next()
        .unwrap_or_default()
        .to_string()
}

/// Parent of the normalised path: `/a/b` gives `/a`, `/a` gives `/`, and a
/// bare relative name gives the empty string.
#[must_use]
pub fn parent_dir(path: &str) -> String {
    let normalized = normalize(path);
    match normalized.rfind(SEPARATOR) {
        None => String::new(),
        Some(0) => SEPARATOR.to_string(),
        Some(position) => normalized[..position].to_string(),
    }
}

/// Human-readable label for reports: `name` for files and `name/*` for
/// directories or paths written with a trailing separator.
#[must_use]
pub fn label(path: &str) -> String {
    let trailing = canonical_separators(path).ends_with(SEPARATOR);
    let normalized = normalize(path);
    let base = base_name(&normalized);
    let on_disk = Path::new(&normalized);

    if on_disk.is_file() {
        base
    } else if on_disk.is_dir() || trailing {
        format!("{base}/*")
    } else {
        base
    }
}

/// Rewrite `local_path` into its destination-side equivalent.
///
/// Every occurrence of the mapping's `local` text is replaced by its `remote`
/// text, not just a leading prefix: `/src/x/src/y` under `/src -> /dst`
/// becomes `/dst/x/dst/y`. Existing configurations rely on this.
#[must_use]
pub fn to_remote_path(local_path: &str, mapping: &Mapping) -> String {
    local_path.replace(&mapping.local, &mapping.remote)
}

/// Copy target for `local_path` once mapped to `remote_path`.
///
/// A directory is copied into the parent of its mapped path so the copy tool
/// does not nest it one level too deep; a file is copied onto the mapped path.
#[must_use]
pub fn copy_destination(local_path: &str, remote_path: &str) -> String {
    if Path::new(local_path).is_dir() {
        parent_dir(remote_path)
    } else {
        remote_path.to_string()
    }
}

/// Append a separator unless `path` already ends with one.
#[must_use]
pub fn with_trailing_separator(path: &str) -> String {
    if path.ends_with(SEPARATOR) {
        path.to_string()
    } else {
        format!("{path}{SEPARATOR}")
    }
}

fn canonical_separators(path: &str) -> String {
    if MAIN_SEPARATOR == SEPARATOR {
        path.to_string()
    } else {
        path.replace(MAIN_SEPARATOR, "/")
    }
}
