//! Logging init: one file per stream under the configured log directory,
//! or graceful fallback to stderr.

use anyhow::{Context, Result};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::Subscriber;
use tracing_subscriber::EnvFilter;

const DEFAULT_FILTER: &str = "info,vidlink_core=debug";

/// Which log file a command writes to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogStream {
    Collect,
    Dispatch,
}

impl LogStream {
    pub fn file_name(&self) -> &'static str {
        match self {
            LogStream::Collect => "collect.log",
            LogStream::Dispatch => "dispatch.log",
        }
    }
}

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

/// Open `<log_dir>/<stream>.log` for appending, creating the directory.
pub fn open_log_file(log_dir: &Path, stream: LogStream) -> Result<(fs::File, PathBuf)> {
    fs::create_dir_all(log_dir)
        .with_context(|| format!("creating log directory {}", log_dir.display()))?;
    let path = log_dir.join(stream.file_name());
    let file = fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .with_context(|| format!("opening log file {}", path.display()))?;
    Ok((file, path))
}

/// Plain-text subscriber appending events to an open log file.
/// Events from concurrent tasks are serialized through the mutex.
fn file_subscriber(file: fs::File, filter: EnvFilter) -> impl Subscriber + Send + Sync {
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .finish()
}

/// Initialize structured logging to the stream's file.
/// On failure, returns Err so the caller can fall back to stderr.
pub fn init_logging(log_dir: &Path, stream: LogStream) -> Result<PathBuf> {
    let (file, path) = open_log_file(log_dir, stream)?;
    tracing::subscriber::set_global_default(file_subscriber(file, env_filter()))
        .context("installing log subscriber")?;

    tracing::info!("vidlink logging initialized at {}", path.display());
    Ok(path)
}

/// Initialize logging to stderr only (no file).
pub fn init_logging_stderr() {
    // a subscriber may already be installed; keeping it is fine
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_writer(io::stderr)
        .with_ansi(false)
        .try_init();
}

/// File logging for `stream`, or stderr if the file cannot be used.
pub fn init_for(log_dir: &Path, stream: LogStream) {
    if let Err(e) = init_logging(log_dir, stream) {
        init_logging_stderr();
        tracing::warn!("file logging unavailable ({:#}), logging to stderr", e);
    }
}
