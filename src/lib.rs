// nbpatch - rewrite the imports cell of a Jupyter notebook in place

pub mod config;
pub mod error;
pub mod notebook;
pub mod patch;
pub mod utils;

use anyhow::{anyhow, Result};
use tracing::debug;

pub use error::{NotebookError, NotebookResult};
pub use notebook::{Cell, CellType, Notebook};
pub use patch::{patch_file, CellPatch, PatchOptions, PatchOutcome, PatchReport};

pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

/// Initialize the tracing subscriber.
///
/// Logs go to stderr so stdout only carries status lines. `RUST_LOG` wins over
/// the default level, which is `debug` when `verbose` is set and `warn`
/// otherwise.
pub fn init_with_logger(verbose: bool) -> Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::EnvFilter;

    let default_level = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    fmt::Subscriber::builder()
        .with_writer(std::io::stderr)
        .with_env_filter(filter)
        .with_target(verbose)
        .try_init()
        .map_err(|e| anyhow!("Failed to initialize logger: {}", e))?;

    debug!("Initialized nbpatch v{}", version());
    Ok(())
}
