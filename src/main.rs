use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tracing::{debug, info};

use nbpatch::config::ConfigLoader;
use nbpatch::utils::read_file_to_string;
use nbpatch::{patch_file, PatchOptions};

#[derive(Parser)]
#[command(author, version, about = "Replace the imports cell of a Jupyter notebook", long_about = None)]
struct Cli {
    /// Notebook to patch (defaults to Fibonacci_Hashing_Demo.ipynb)
    path: Option<PathBuf>,

    /// Substring identifying the code cell to replace
    #[arg(short, long)]
    marker: Option<String>,

    /// File whose contents become the new cell source
    #[arg(short, long)]
    replacement_file: Option<PathBuf>,

    /// TOML config file (defaults to ./nbpatch.toml when present)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Fail when no code cell contains the marker
    #[arg(long)]
    strict: bool,

    /// Show the change without writing the notebook
    #[arg(long)]
    dry_run: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    nbpatch::init_with_logger(cli.verbose)?;

    let loader = match &cli.config {
        Some(path) => ConfigLoader::with_path(path),
        None => ConfigLoader::new(),
    };
    debug!("Configuration source: {}", loader.config_path().display());
    let mut config = loader.load().context("Failed to load configuration")?;

    if let Some(path) = cli.path {
        config.notebook_path = path;
    }
    if let Some(marker) = cli.marker {
        config.marker = marker;
    }
    if let Some(file) = &cli.replacement_file {
        config.replacement = read_file_to_string(file)
            .with_context(|| format!("Failed to read replacement file: {}", file.display()))?;
    }
    config.validate().context("Invalid settings")?;

    info!(
        "Patching {} (marker {:?})",
        config.notebook_path.display(),
        config.marker
    );

    let options = PatchOptions {
        dry_run: cli.dry_run,
        strict: cli.strict,
    };
    let report = patch_file(&config.notebook_path, &config.to_patch(), options)
        .with_context(|| format!("Failed to patch notebook: {}", config.notebook_path.display()))?;

    if let Some(diff) = &report.diff {
        print!("{}", diff);
    }
    if report.outcome.is_replaced() {
        println!("{}", config.status_message);
    }

    if cli.dry_run {
        println!("Dry run: {} not written", report.path.display());
    } else {
        // Printed even when nothing matched
        println!("✓ Notebook updated successfully");
    }

    Ok(())
}
