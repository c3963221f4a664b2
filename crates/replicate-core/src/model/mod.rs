//! Per-dispatch request state.

use std::path::Path;

use crate::error::{ReplicateError, ReplicateResult};
use crate::path::{normalize, parent_dir, with_trailing_separator};

/// Path and mode for a single dispatch, owned by that dispatch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplicationRequest {
    /// Normalised path matched against mappings and handed to the jobs.
    pub local_file: String,
    /// Whether the whole containing directory is replicated.
    pub directory_mode: bool,
}

impl ReplicationRequest {
    /// Build a request from the raw path supplied by the host.
    ///
    /// In directory mode a file path is replaced by its parent and the result
    /// always ends with a separator, so directory and file mode agree on what
    /// a directory path means.
    ///
    /// # Errors
    ///
    /// Returns [`ReplicateError::MissingLocalFile`] for an empty path.
    pub fn new(local_file: &str, directory_mode: bool) -> ReplicateResult<Self> {
        if local_file.is_empty() {
            return Err(ReplicateError::MissingLocalFile);
        }

        let mut local_file = normalize(local_file);
        if directory_mode {
            if Path::new(&local_file).is_file() {
                local_file = parent_dir(&local_file);
            }
            local_file = with_trailing_separator(&local_file);
        }

        Ok(Self {
            local_file,
            directory_mode,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use std::fs;

    #[test]
    fn empty_path_is_rejected() {
        assert!(matches!(
            ReplicationRequest::new("", false),
            Err(ReplicateError::MissingLocalFile)
        ));
    }

    #[test]
    fn file_mode_only_normalises() -> Result<()> {
        let request = ReplicationRequest::new("/proj//src/./a.txt", false)?;
        assert_eq!(request.local_file, "/proj/src/a.txt");
        assert!(!request.directory_mode);
        Ok(())
    }

    #[test]
    fn directory_mode_uses_parent_of_existing_file() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let file = dir.path().join("a.txt");
        fs::write(&file, "x")?;
        let request = ReplicationRequest::new(&file.to_string_lossy(), true)?;
        let expected = format!("{}/", normalize(&dir.path().to_string_lossy()));
        assert_eq!(request.local_file, expected);
        Ok(())
    }

    #[test]
    fn directory_mode_on_directory_matches_trailing_separator_form() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let plain = ReplicationRequest::new(&dir.path().to_string_lossy(), true)?;
        let slashed = ReplicationRequest::new(&format!("{}/", dir.path().display()), true)?;
        assert_eq!(plain, slashed);
        assert!(plain.local_file.ends_with('/'));
        Ok(())
    }
}
