//! Log setup: console plus an append-only log file next to the executable.

use std::fs::OpenOptions;
use std::sync::Mutex;

use anyhow::{Context, Result};
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

use crate::paths;

const LOG_FILE_NAME: &str = "dashcam_stamp.log";

/// Installs the global subscriber.
///
/// `RUST_LOG` wins when set; otherwise `info`, or `debug` when `verbose`.
/// If the log file cannot be opened, logging continues on the console only.
pub fn init(verbose: bool) -> Result<()> {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let console = fmt::layer().with_target(false);

    let file_layer = paths::ensure_directories()
        .ok()
        .and_then(|_| {
            OpenOptions::new()
                .create(true)
                .append(true)
                .open(paths::get_logs_dir().join(LOG_FILE_NAME))
                .ok()
        })
        .map(|file| fmt::layer().with_ansi(false).with_writer(Mutex::new(file)));

    tracing_subscriber::registry()
        .with(filter)
        .with(console)
        .with(file_layer)
        .try_init()
        .context("Failed to install log subscriber")?;

    Ok(())
}
