use std::path::{Path, PathBuf};
use tracing::{debug, info};

use super::config::PatchConfig;
use crate::error::{NotebookError, NotebookResult};
use crate::utils::fs::{file_exists, read_file_to_string};

/// Config file picked up from the working directory when no path is given
pub const DEFAULT_CONFIG_FILE: &str = "nbpatch.toml";

/// The configuration loader
pub struct ConfigLoader {
    config_path: PathBuf,
    explicit: bool,
}

impl ConfigLoader {
    /// Create a loader that reads `nbpatch.toml` from the working directory
    /// when present and falls back to the built-in defaults otherwise
    pub fn new() -> Self {
        Self {
            config_path: PathBuf::from(DEFAULT_CONFIG_FILE),
            explicit: false,
        }
    }

    /// Set a custom config path. The file must exist.
    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self {
            config_path: path.into(),
            explicit: true,
        }
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    /// Load the configuration
    pub fn load(&self) -> NotebookResult<PatchConfig> {
        if !self.explicit && !file_exists(&self.config_path) {
            debug!("No config file at {}, using defaults", self.config_path.display());
            return Ok(PatchConfig::default());
        }

        let content = read_file_to_string(&self.config_path)?;
        let config = Self::parse(&content).map_err(|e| match e {
            NotebookError::Config { message } => NotebookError::config_error(format!(
                "{}: {}",
                self.config_path.display(),
                message
            )),
            other => other,
        })?;

        info!("Loaded configuration from {}", self.config_path.display());
        Ok(config)
    }

    /// Parse TOML text; unspecified keys keep their defaults
    pub fn parse(content: &str) -> NotebookResult<PatchConfig> {
        let config: PatchConfig =
            toml::from_str(content).map_err(|e| NotebookError::config_error(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}
