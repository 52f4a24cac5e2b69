//! Write-to-temp-then-rename replacement of small files

use crate::io::error::PidFileError;
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;

/// Atomically replace the contents of `path` with `contents`
///
/// The bytes go to a randomly named temp file created exclusively in the same
/// directory (never through an existing file or symlink), are synced, and the
/// temp file is then renamed over the target. `rename(2)` within one
/// filesystem is atomic, so a concurrent reader observes either the previous
/// file or the complete new one, never an empty or partial write.
///
/// # Errors
///
/// Returns `PidFileError::InvalidPath` if `path` has no file name, or
/// `PidFileError::Io` if writing or renaming fails. On failure the temp file
/// is removed and `path` is left untouched.
pub fn atomic_replace(path: &Path, contents: &[u8]) -> Result<(), PidFileError> {
    if path.file_name().is_none() {
        return Err(PidFileError::InvalidPath {
            path: path.to_path_buf(),
        });
    }
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };

    // Dropping `tmp` on any early return deletes the temp file.
    let mut tmp = NamedTempFile::new_in(dir).map_err(|e| PidFileError::io(dir, e))?;
    tmp.write_all(contents)
        .and_then(|()| tmp.as_file().sync_all())
        .map_err(|e| PidFileError::io(tmp.path(), e))?;

    tmp.persist(path).map_err(|e| PidFileError::io(path, e.error))?;
    Ok(())
}
