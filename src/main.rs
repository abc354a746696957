mod analyst;
mod backend;
mod cli;
mod metrics;
mod model;
mod orchestrator;
mod pipeline;
mod text_summary;
#[cfg(feature = "tui")]
mod tui;

use anyhow::{Context, Result};
use clap::Parser;
use std::fs::{File, OpenOptions};
use std::path::PathBuf;
use std::sync::Mutex;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let args = cli::Cli::parse();
    let headless = args.headless();
    init_tracing(&args)?;
    tracing::info!(version = env!("CARGO_PKG_VERSION"), mock = args.mock, "quanteye starting");

    match cli::run(args).await {
        Ok(()) => {
            // Explicitly exit with code 0 on success for non-TUI modes
            if headless {
                std::process::exit(0);
            }
            Ok(())
        }
        Err(e) => {
            tracing::error!(error = %format!("{e:#}"), "quanteye exited with an error");
            Err(e)
        }
    }
}

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Headless modes log to stderr. The TUI owns the terminal, so it logs to a file.
fn init_tracing(args: &cli::Cli) -> Result<()> {
    if args.headless() || cfg!(not(feature = "tui")) {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter())
            .with_writer(std::io::stderr)
            .init();
        return Ok(());
    }

    let path = match &args.log_file {
        Some(p) => p.clone(),
        None => default_log_path()?,
    };
    let file = open_log_file(&path)?;
    tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_ansi(false)
        .with_writer(Mutex::new(file))
        .init();
    Ok(())
}

fn default_log_path() -> Result<PathBuf> {
    let base = dirs::cache_dir()
        .or_else(dirs::home_dir)
        .context("no cache or home directory to place the log file in")?;
    Ok(base.join("quanteye").join("quanteye.log"))
}

fn open_log_file(path: &std::path::Path) -> Result<File> {
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("create log directory {}", dir.display()))?;
    }
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("open log file {}", path.display()))
}
