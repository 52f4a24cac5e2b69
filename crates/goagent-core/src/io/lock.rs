//! Exclusive launch lock on `<pidfile>.lock`
//!
//! Serializes launchers that share a pidfile when `--exclusive` is given. The
//! lock is an advisory OS lock on an open handle, so it vanishes with the
//! holder; the lock file itself is left in place and reused by later runs.
//! std opens files close-on-exec, so the spawned agent never inherits it.

use crate::io::error::PidFileError;
use fs2::FileExt;
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default number of retries used by the launcher
pub const DEFAULT_LOCK_RETRIES: u32 = 5;

/// First backoff step; each retry doubles it.
const BASE_BACKOFF: Duration = Duration::from_millis(50);

/// Held launch lock; released on drop
#[derive(Debug)]
pub struct FileLock {
    file: File,
    path: PathBuf,
}

impl FileLock {
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for FileLock {
    fn drop(&mut self) {
        if let Err(e) = FileExt::unlock(&self.file) {
            tracing::debug!(path = %self.path.display(), error = %e, "launch lock unlock failed");
        }
    }
}

fn is_contended(err: &std::io::Error) -> bool {
    err.kind() == std::io::ErrorKind::WouldBlock
        || err.raw_os_error() == fs2::lock_contended_error().raw_os_error()
}

/// Take the exclusive launch lock at `path`, waiting 50ms, 100ms, 200ms, ...
/// between up to `max_retries` further attempts.
///
/// The lock file is created if missing; its directory must exist.
///
/// # Errors
///
/// Returns `PidFileError::LockTimeout` if another holder still has the lock
/// after the last retry, or `PidFileError::Io` if the lock file cannot be
/// opened or locking fails for another reason.
pub fn acquire_lock(path: &Path, max_retries: u32) -> Result<FileLock, PidFileError> {
    let file = OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .truncate(false)
        .open(path)
        .map_err(|e| PidFileError::io(path, e))?;

    let mut backoff = BASE_BACKOFF;
    for attempt in 0..=max_retries {
        match file.try_lock_exclusive() {
            Ok(()) => {
                tracing::debug!(path = %path.display(), attempt, "acquired launch lock");
                return Ok(FileLock {
                    file,
                    path: path.to_path_buf(),
                });
            }
            Err(e) if is_contended(&e) => {
                if attempt < max_retries {
                    tracing::debug!(path = %path.display(), attempt, ?backoff, "launch lock busy");
                    std::thread::sleep(backoff);
                    backoff *= 2;
                }
            }
            Err(e) => return Err(PidFileError::io(path, e)),
        }
    }

    Err(PidFileError::LockTimeout {
        path: path.to_path_buf(),
        retries: max_retries,
    })
}
