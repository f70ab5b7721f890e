//! Logging setup for the CLI.
//!
//! Every event goes to two places:
//! - the log file (default `./ingester.log`), appended to across runs
//! - stdout, for watching an ingest as it happens
//!
//! Verbosity follows `RUST_LOG` and defaults to `info`.

use std::ffi::OsString;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

pub const DEFAULT_LOG_FILE: &str = "./ingester.log";

/// Keep alive for as long as events should reach the log file; dropping it
/// flushes the background writer.
pub struct LoggingGuard {
    _file_guard: WorkerGuard,
}

/// Directory and file name of `log_path`; a bare file name lives in `.`.
pub fn split_log_path(log_path: &Path) -> (PathBuf, OsString) {
    let dir = match log_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    let file = log_path
        .file_name()
        .map(|name| name.to_os_string())
        .unwrap_or_else(|| OsString::from("ingester.log"));
    (dir, file)
}

pub fn init_logging(log_path: &Path) -> Result<LoggingGuard> {
    let (dir, file) = split_log_path(log_path);
    fs::create_dir_all(&dir)
        .with_context(|| format!("Failed to create log directory {}", dir.display()))?;

    let file_appender = tracing_appender::rolling::never(&dir, &file);
    let (non_blocking_file, file_guard) = tracing_appender::non_blocking(file_appender);

    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(non_blocking_file)
        .with_ansi(false);

    let stdout_layer = tracing_subscriber::fmt::layer()
        .with_writer(io::stdout)
        .with_ansi(true);

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .with(stdout_layer)
        .try_init()
        .context("Failed to install the global tracing subscriber")?;

    Ok(LoggingGuard {
        _file_guard: file_guard,
    })
}
