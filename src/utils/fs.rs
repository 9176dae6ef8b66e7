use std::fs;
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;
use tracing::debug;

use crate::error::{NotebookError, NotebookResult};

/// Read a file's contents as string
pub fn read_file_to_string(path: impl AsRef<Path>) -> NotebookResult<String> {
    let path = path.as_ref();
    debug!("Reading file: {}", path.display());

    fs::read_to_string(path).map_err(|e| NotebookError::io_error(e, Some(path)))
}

/// Write string content to a file through a temporary sibling that is renamed
/// over the target. The target is untouched if any step fails. A symlinked
/// path is resolved first so the link keeps pointing at the updated file.
pub fn write_file_atomic(path: impl AsRef<Path>, content: &str) -> NotebookResult<()> {
    let requested = path.as_ref();
    let resolved = match fs::canonicalize(requested) {
        Ok(resolved) => resolved,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => requested.to_path_buf(),
        Err(e) => return Err(NotebookError::io_error(e, Some(requested))),
    };
    let path = resolved.as_path();
    debug!("Writing file atomically: {}", path.display());

    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut tmp = NamedTempFile::new_in(dir).map_err(|e| NotebookError::io_error(e, Some(dir)))?;

    // Temp files are created 0600; carry over the target's permissions
    if let Ok(metadata) = fs::metadata(path) {
        tmp.as_file()
            .set_permissions(metadata.permissions())
            .map_err(|e| NotebookError::io_error(e, Some(path)))?;
    }

    tmp.write_all(content.as_bytes())
        .map_err(|e| NotebookError::io_error(e, Some(tmp.path())))?;
    tmp.as_file()
        .sync_all()
        .map_err(|e| NotebookError::io_error(e, Some(tmp.path())))?;

    tmp.persist(path)
        .map_err(|e| NotebookError::io_error(e.error, Some(path)))?;

    Ok(())
}

/// Check if a file exists
pub fn file_exists(path: impl AsRef<Path>) -> bool {
    let path = path.as_ref();
    path.exists() && path.is_file()
}
