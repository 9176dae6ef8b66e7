use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::{NotebookError, NotebookResult};
use crate::patch::{CellPatch, DEFAULT_MARKER, DEFAULT_REPLACEMENT};

pub const DEFAULT_NOTEBOOK_PATH: &str = "Fibonacci_Hashing_Demo.ipynb";
pub const DEFAULT_STATUS_MESSAGE: &str = "✓ Removed unused imports: subprocess, os, tempfile";

/// Parameters of a single patch run
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PatchConfig {
    /// Notebook to rewrite in place
    pub notebook_path: PathBuf,

    /// Substring identifying the target code cell
    pub marker: String,

    /// Text that becomes the cell's only source fragment
    pub replacement: String,

    /// Line printed when a cell was replaced
    pub status_message: String,
}

impl Default for PatchConfig {
    fn default() -> Self {
        Self {
            notebook_path: PathBuf::from(DEFAULT_NOTEBOOK_PATH),
            marker: DEFAULT_MARKER.to_string(),
            replacement: DEFAULT_REPLACEMENT.to_string(),
            status_message: DEFAULT_STATUS_MESSAGE.to_string(),
        }
    }
}

impl PatchConfig {
    /// Reject settings that cannot describe a meaningful patch
    pub fn validate(&self) -> NotebookResult<()> {
        if self.marker.is_empty() {
            // An empty marker would match the first code cell unconditionally
            return Err(NotebookError::config_error("marker must not be empty"));
        }
        if self.notebook_path.as_os_str().is_empty() {
            return Err(NotebookError::config_error("notebook_path must not be empty"));
        }
        Ok(())
    }

    pub fn to_patch(&self) -> CellPatch {
        CellPatch::new(self.marker.clone(), self.replacement.clone())
    }
}
