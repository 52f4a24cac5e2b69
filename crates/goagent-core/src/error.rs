//! Top-level launch errors and their process exit codes

use crate::io::PidFileError;
use crate::launcher::SpawnError;
use thiserror::Error;

/// Agent could not be spawned
pub const EXIT_SPAWN_FAILED: u8 = 1;
/// Bad command line or missing pidfile directory
pub const EXIT_INVALID_ARGS: u8 = 2;
/// Unexpected I/O error on the pidfile
pub const EXIT_PIDFILE_IO: u8 = 3;

/// Errors that end a launcher invocation
#[derive(Error, Debug)]
pub enum LaunchError {
    /// Command line failed validation
    #[error("{0}")]
    InvalidArgs(String),

    #[error(transparent)]
    PidFile(#[from] PidFileError),

    #[error(transparent)]
    Spawn(#[from] SpawnError),
}

impl LaunchError {
    /// Process exit code for this error.
    pub fn exit_code(&self) -> u8 {
        match self {
            LaunchError::InvalidArgs(_) => EXIT_INVALID_ARGS,
            LaunchError::PidFile(
                PidFileError::MissingDirectory { .. } | PidFileError::InvalidPath { .. },
            ) => EXIT_INVALID_ARGS,
            LaunchError::PidFile(_) => EXIT_PIDFILE_IO,
            LaunchError::Spawn(_) => EXIT_SPAWN_FAILED,
        }
    }
}
