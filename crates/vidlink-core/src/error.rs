//! Error types for vidlink
//!
//! This module defines the error taxonomy of the link-resolution pipeline.
//! Per-ID failures (`Network`) are contained by the collector and recorded,
//! `LayoutExhausted` is the only error that aborts a collection run.
//! Per-link dispatch failures live in [`DispatchError`] and end up in a report.

use std::path::PathBuf;

use thiserror::Error;

/// Error type for vidlink operations
#[derive(Error, Debug)]
pub enum VidlinkError {
    /// HTTP client could not be built or a request could not be constructed
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    /// Page fetch failed after all retry attempts
    #[error("Fetching {url} failed after {attempts} attempt(s): {reason}")]
    Network {
        url: String,
        attempts: u32,
        reason: String,
    },

    /// The season layout cannot cover the requested video index
    #[error("Season layout exhausted: index {index} requested but only {capacity} episode slot(s) remain")]
    LayoutExhausted { index: u64, capacity: u64 },

    /// The season layout itself is inconsistent
    #[error("Invalid season layout: {0}")]
    InvalidLayout(String),

    /// A URL pattern or title selector could not be compiled
    #[error("Invalid pattern: {0}")]
    InvalidPattern(String),

    /// Start and end of the ID range are out of order
    #[error("Invalid ID range: start {start} is greater than end {end}")]
    InvalidRange { start: u32, end: u32 },

    /// Configuration could not be read or is incomplete
    #[error("Configuration error: {0}")]
    Config(String),

    /// Persisted link list is malformed
    #[error("Malformed link list at line {line}: {reason}")]
    Artifact { line: usize, reason: String },

    /// Filesystem error with the path involved
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

impl VidlinkError {
    /// Attach a path to an I/O error.
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Result type alias for vidlink operations
pub type Result<T> = std::result::Result<T, VidlinkError>;

/// Per-link failure raised while handing a link to an external handler.
///
/// These never abort a dispatch run; they are collected into the
/// [`DispatchReport`](crate::dispatch::DispatchReport).
#[derive(Error, Debug)]
pub enum DispatchError {
    /// The external program is not installed or not on PATH
    #[error("{program} not found; install it or add it to PATH")]
    NotFound { program: String },

    /// The external program could not be started
    #[error("failed to start {program}: {source}")]
    Spawn {
        program: String,
        source: std::io::Error,
    },

    /// The external program ran but reported failure
    #[error("{program} exited with {status}: {stderr}")]
    ExitStatus {
        program: String,
        status: String,
        stderr: String,
    },

    /// Talking to the external program failed midway
    #[error("I/O error while talking to {program}: {source}")]
    Io {
        program: String,
        source: std::io::Error,
    },
}

impl DispatchError {
    /// Copy of this error for another link that shared the same call.
    ///
    /// I/O sources are rebuilt from their kind and message.
    pub fn replicate(&self) -> Self {
        let copy_io = |e: &std::io::Error| std::io::Error::new(e.kind(), e.to_string());
        match self {
            DispatchError::NotFound { program } => DispatchError::NotFound {
                program: program.clone(),
            },
            DispatchError::Spawn { program, source } => DispatchError::Spawn {
                program: program.clone(),
                source: copy_io(source),
            },
            DispatchError::ExitStatus {
                program,
                status,
                stderr,
            } => DispatchError::ExitStatus {
                program: program.clone(),
                status: status.clone(),
                stderr: stderr.clone(),
            },
            DispatchError::Io { program, source } => DispatchError::Io {
                program: program.clone(),
                source: copy_io(source),
            },
        }
    }
}
