//! Logging setup
//!
//! Console output always; a plain-text file layer when a log file is given.

use anyhow::Result;
use std::path::PathBuf;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Default filter: dependencies at info, this crate at debug.
pub const DEFAULT_FILTER: &str = "info,drawdrive=debug";

/// Initialise the global tracing subscriber.
///
/// # Arguments
/// * `log_level` - filter directive (`debug`, `drawdrive=trace`, ...); falls back to `RUST_LOG`
/// * `log_file` - optional file that receives an un-coloured copy of every event
///
/// # Examples
/// ```no_run
/// use drawdrive::utils::logger::init_logger;
///
/// init_logger(None, None).unwrap();
/// init_logger(Some("debug"), None).unwrap();
/// ```
pub fn init_logger(log_level: Option<&str>, log_file: Option<PathBuf>) -> Result<()> {
    let env_filter = match log_level {
        Some(level) => EnvFilter::try_new(level)?,
        None => EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER)),
    };

    // Logs go to stderr so `open` can stream a drawing on stdout.
    let fmt_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_level(true)
        .with_ansi(true)
        .compact();

    let registry = tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer);

    if let Some(log_path) = log_file {
        if let Some(parent) = log_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_path)?;

        let file_layer = fmt::layer()
            .with_writer(std::sync::Arc::new(file))
            .with_target(true)
            .with_ansi(false)
            .with_level(true);

        registry.with(file_layer).try_init()?;
    } else {
        registry.try_init()?;
    }

    tracing::debug!("Logger initialized");
    Ok(())
}
