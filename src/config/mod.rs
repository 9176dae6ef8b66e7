// Configuration for nbpatch: what to patch and where

#[allow(clippy::module_inception)]
pub mod config;
pub mod config_loader;

pub use config::{PatchConfig, DEFAULT_NOTEBOOK_PATH, DEFAULT_STATUS_MESSAGE};
pub use config_loader::ConfigLoader;
