//! Native filesystem provider using `tokio::fs` for reads and a
//! write-then-rename strategy for outputs.

use std::io::Write;
use std::path::Path;

use tempfile::NamedTempFile;
use tokio::fs;

use crate::error::{AssemblyError, AssemblyResult};

#[derive(Debug, Clone)]
pub struct FileSystemProvider;

impl FileSystemProvider {
    /// Read the entire contents of a file as a UTF-8 string.
    pub async fn read_file(path: impl AsRef<Path>) -> AssemblyResult<String> {
        fs::read_to_string(path.as_ref())
            .await
            .map_err(|e| AssemblyError::io("read", path.as_ref(), e))
    }

    /// Replace `path` with `contents` in a single rename.
    ///
    /// The data is written to a temporary file in the destination directory
    /// first, so readers see either the previous file or the complete new one.
    /// Missing parent directories are created.
    pub fn write_atomically(path: &Path, contents: &[u8]) -> AssemblyResult<()> {
        let parent = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        std::fs::create_dir_all(parent)
            .map_err(|e| AssemblyError::io("create directory", parent, e))?;

        let mut staging = NamedTempFile::new_in(parent)
            .map_err(|e| AssemblyError::io("create temporary file in", parent, e))?;
        staging
            .write_all(contents)
            .and_then(|()| staging.flush())
            .map_err(|e| AssemblyError::io("write", staging.path(), e))?;
        staging
            .persist(path)
            .map_err(|e| AssemblyError::io("replace", path, e.error))?;
        Ok(())
    }
}
