//! Error types for pidfile I/O operations

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while reading, writing, or locking the pidfile
#[derive(Error, Debug)]
pub enum PidFileError {
    /// The directory that should hold the pidfile does not exist
    #[error("pidfile directory {path} does not exist")]
    MissingDirectory { path: PathBuf },

    /// Failed to acquire the advisory lock after multiple retries
    #[error("failed to acquire lock on {path} after {retries} retries")]
    LockTimeout { path: PathBuf, retries: u32 },

    /// File I/O error
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Path has no file name or parent component
    #[error("invalid pidfile path: {path}")]
    InvalidPath { path: PathBuf },
}

impl PidFileError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        PidFileError::Io {
            path: path.into(),
            source,
        }
    }
}
