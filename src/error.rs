use std::path::PathBuf;
use thiserror::Error;

/// Main error type for nbpatch
#[derive(Error, Debug)]
pub enum NotebookError {
    #[error("IO error: {source}")]
    Io {
        source: std::io::Error,
        path: Option<PathBuf>,
    },

    #[error("Failed to parse notebook JSON: {source}")]
    Parse {
        source: serde_json::Error,
        path: Option<PathBuf>,
    },

    #[error("Invalid notebook structure: {message}")]
    InvalidStructure { message: String },

    #[error("Invalid configuration: {message}")]
    Config { message: String },

    #[error("No code cell contains marker {marker:?}")]
    NoMatch { marker: String },
}

impl NotebookError {
    /// Create a new IO error with path context
    pub fn io_error(err: std::io::Error, path: Option<impl Into<PathBuf>>) -> Self {
        Self::Io {
            source: err,
            path: path.map(|p| p.into()),
        }
    }

    /// Create a new JSON parse error with path context
    pub fn parse_error(err: serde_json::Error, path: Option<impl Into<PathBuf>>) -> Self {
        Self::Parse {
            source: err,
            path: path.map(|p| p.into()),
        }
    }

    pub fn invalid_structure(message: impl Into<String>) -> Self {
        Self::InvalidStructure {
            message: message.into(),
        }
    }

    pub fn config_error(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    pub fn no_match(marker: impl Into<String>) -> Self {
        Self::NoMatch {
            marker: marker.into(),
        }
    }

    /// Path the error refers to, when known
    pub fn path(&self) -> Option<&PathBuf> {
        match self {
            NotebookError::Io { path, .. } | NotebookError::Parse { path, .. } => path.as_ref(),
            _ => None,
        }
    }

    /// True for errors caused by the document content rather than the filesystem
    pub fn is_format_error(&self) -> bool {
        matches!(
            self,
            NotebookError::Parse { .. } | NotebookError::InvalidStructure { .. }
        )
    }
}

/// Result type alias for nbpatch operations
pub type NotebookResult<T> = Result<T, NotebookError>;
