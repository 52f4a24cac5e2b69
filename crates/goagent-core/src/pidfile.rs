//! On-disk record of the running agent's process id.
//!
//! The file holds an ASCII decimal pid, optionally followed by a newline.
//! Readers accept either form; [`PidFile::write`] always emits the newline and
//! goes through [`atomic_replace`], so an observer never sees a half-written
//! record.

use crate::io::{PidFileError, atomic_replace};
use std::fmt;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

/// Pidfile location used when none is given on the command line.
pub const DEFAULT_PIDFILE_PATH: &str = "/tmp/goagent.pid";

/// Most bytes ever read from a pidfile. A pid is at most 10 digits; the rest
/// leaves room for trailing whitespace. Longer files are malformed.
pub const MAX_PIDFILE_LEN: usize = 32;

/// A strictly positive process id.
///
/// `0` and negative values are never representable: `kill(0, 0)` and
/// `kill(-1, 0)` address process groups rather than a single process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Pid(i32);

impl Pid {
    /// Wrap a raw pid, rejecting zero and negative values.
    pub fn new(raw: i32) -> Option<Self> {
        (raw > 0).then_some(Self(raw))
    }

    /// Convert a pid reported by [`std::process::Child::id`].
    pub fn from_u32(raw: u32) -> Option<Self> {
        i32::try_from(raw).ok().and_then(Self::new)
    }

    pub fn get(self) -> i32 {
        self.0
    }
}

impl fmt::Display for Pid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Result of reading the pidfile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PidRecord {
    /// No file at the path.
    Absent,
    /// File parsed to a positive pid.
    Present(Pid),
    /// File exists but does not hold a positive decimal pid. Carries at most
    /// [`MAX_PIDFILE_LEN`] bytes of the contents, lossily decoded, for
    /// diagnostics.
    Malformed(String),
}

/// Parse pidfile contents: trailing whitespace is trimmed, everything else
/// must be ASCII digits forming a pid in `1..=i32::MAX`.
pub fn parse_pid(contents: &str) -> Option<Pid> {
    let digits = contents.trim_end();
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse::<i32>().ok().and_then(Pid::new)
}

/// Handle to a pidfile at an explicit path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PidFile {
    path: PathBuf,
}

impl Default for PidFile {
    fn default() -> Self {
        Self::new(DEFAULT_PIDFILE_PATH)
    }
}

impl PidFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Sibling lock file used by the exclusive launch mode: `<pidfile>.lock`.
    pub fn lock_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".lock");
        self.path.with_file_name(name)
    }

    /// Check that the directory holding the pidfile exists.
    ///
    /// The launcher never creates it.
    ///
    /// # Errors
    ///
    /// Returns `PidFileError::MissingDirectory` if the parent is missing or is
    /// not a directory, and `PidFileError::InvalidPath` if the path has no
    /// file name.
    pub fn ensure_directory(&self) -> Result<(), PidFileError> {
        if self.path.file_name().is_none() {
            return Err(PidFileError::InvalidPath {
                path: self.path.clone(),
            });
        }
        let parent = match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            // Bare file name: relative to the working directory.
            _ => Path::new("."),
        };
        if parent.is_dir() {
            Ok(())
        } else {
            Err(PidFileError::MissingDirectory {
                path: parent.to_path_buf(),
            })
        }
    }

    /// Read and classify the pidfile.
    ///
    /// Unparseable contents are reported as [`PidRecord::Malformed`], never as
    /// an error. At most `MAX_PIDFILE_LEN + 1` bytes are read.
    ///
    /// # Errors
    ///
    /// Returns `PidFileError::Io` for any OS error other than "not found".
    pub fn read(&self) -> Result<PidRecord, PidFileError> {
        let file = match File::open(&self.path) {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(PidRecord::Absent),
            Err(e) => return Err(PidFileError::io(&self.path, e)),
        };
        let mut bytes = Vec::with_capacity(MAX_PIDFILE_LEN + 1);
        file.take(MAX_PIDFILE_LEN as u64 + 1)
            .read_to_end(&mut bytes)
            .map_err(|e| PidFileError::io(&self.path, e))?;

        let parsed = if bytes.len() > MAX_PIDFILE_LEN {
            None
        } else {
            std::str::from_utf8(&bytes).ok().and_then(parse_pid)
        };
        let record = match parsed {
            Some(pid) => PidRecord::Present(pid),
            None => {
                bytes.truncate(MAX_PIDFILE_LEN);
                PidRecord::Malformed(String::from_utf8_lossy(&bytes).into_owned())
            }
        };
        tracing::debug!(path = %self.path.display(), ?record, "read pidfile");
        Ok(record)
    }

    /// Record `pid`, replacing any existing file atomically.
    ///
    /// # Errors
    ///
    /// Returns `PidFileError::Io` if the temp file cannot be written or renamed.
    pub fn write(&self, pid: Pid) -> Result<(), PidFileError> {
        atomic_replace(&self.path, format!("{pid}\n").as_bytes())?;
        tracing::debug!(path = %self.path.display(), %pid, "wrote pidfile");
        Ok(())
    }

    /// Delete the pidfile. A missing file is not an error.
    ///
    /// # Errors
    ///
    /// Returns `PidFileError::Io` for any OS error other than "not found".
    pub fn remove(&self) -> Result<(), PidFileError> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => {
                tracing::debug!(path = %self.path.display(), "removed pidfile");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(PidFileError::io(&self.path, e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::thread;
    use tempfile::TempDir;

    fn pid(raw: i32) -> Pid {
        Pid::new(raw).unwrap()
    }

    #[test]
    fn test_parse_pid_with_and_without_newline() {
        assert_eq!(parse_pid("1234"), Some(pid(1234)));
        assert_eq!(parse_pid("1234\n"), Some(pid(1234)));
        assert_eq!(parse_pid("1234\r\n  "), Some(pid(1234)));
    }

    #[test]
    fn test_parse_pid_rejects_garbage() {
        for input in ["", "\n", "garbage", "12ab", " 12", "+12", "-5", "0", "0\n", "1.5"] {
            assert_eq!(parse_pid(input), None, "input {input:?}");
        }
    }

    #[test]
    fn test_parse_pid_rejects_out_of_range() {
        assert_eq!(parse_pid("2147483647"), Some(pid(i32::MAX)));
        assert_eq!(parse_pid("2147483648"), None);
        assert_eq!(parse_pid("99999999999999999999"), None);
    }

    #[test]
    fn test_pid_from_u32() {
        assert_eq!(Pid::from_u32(42), Some(pid(42)));
        assert_eq!(Pid::from_u32(0), None);
        assert_eq!(Pid::from_u32(u32::MAX), None);
    }

    #[test]
    fn test_default_path() {
        assert_eq!(PidFile::default().path(), Path::new("/tmp/goagent.pid"));
    }

    #[test]
    fn test_lock_path_is_sibling() {
        let pidfile = PidFile::new("/var/run/agent.pid");
        assert_eq!(pidfile.lock_path(), PathBuf::from("/var/run/agent.pid.lock"));
    }

    #[test]
    fn test_read_absent() {
        let temp_dir = TempDir::new().unwrap();
        let pidfile = PidFile::new(temp_dir.path().join("agent.pid"));

        assert_eq!(pidfile.read().unwrap(), PidRecord::Absent);
    }

    #[test]
    fn test_read_present() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("agent.pid");
        fs::write(&path, "99999\n").unwrap();

        assert_eq!(PidFile::new(&path).read().unwrap(), PidRecord::Present(pid(99999)));
    }

    #[test]
    fn test_read_malformed() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("agent.pid");
        fs::write(&path, "garbage").unwrap();

        assert_eq!(
            PidFile::new(&path).read().unwrap(),
            PidRecord::Malformed("garbage".to_string())
        );
    }

    #[test]
    fn test_read_non_utf8_is_malformed() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("agent.pid");
        fs::write(&path, [0xff, 0xfe, b'1']).unwrap();

        assert!(matches!(
            PidFile::new(&path).read().unwrap(),
            PidRecord::Malformed(_)
        ));
    }

    #[test]
    fn test_read_oversized_file_is_malformed_and_truncated() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("agent.pid");
        fs::write(&path, "x".repeat(1 << 20)).unwrap();

        let PidRecord::Malformed(contents) = PidFile::new(&path).read().unwrap() else {
            panic!("expected Malformed");
        };
        assert_eq!(contents.len(), MAX_PIDFILE_LEN);
    }

    #[test]
    fn test_read_digits_padded_past_limit_is_malformed() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("agent.pid");
        fs::write(&path, format!("1234{}", " ".repeat(MAX_PIDFILE_LEN))).unwrap();

        assert!(matches!(
            PidFile::new(&path).read().unwrap(),
            PidRecord::Malformed(_)
        ));
    }

    #[test]
    fn test_read_directory_is_io_error() {
        let temp_dir = TempDir::new().unwrap();
        let pidfile = PidFile::new(temp_dir.path());

        assert!(matches!(pidfile.read(), Err(PidFileError::Io { .. })));
    }

    #[test]
    fn test_write_emits_trailing_newline() {
        let temp_dir = TempDir::new().unwrap();
        let pidfile = PidFile::new(temp_dir.path().join("agent.pid"));

        pidfile.write(pid(4321)).unwrap();

        assert_eq!(fs::read_to_string(pidfile.path()).unwrap(), "4321\n");
        assert_eq!(pidfile.read().unwrap(), PidRecord::Present(pid(4321)));
    }

    #[test]
    fn test_remove_existing_and_missing() {
        let temp_dir = TempDir::new().unwrap();
        let pidfile = PidFile::new(temp_dir.path().join("agent.pid"));
        pidfile.write(pid(1)).unwrap();

        pidfile.remove().unwrap();
        assert!(!pidfile.path().exists());

        // Second remove is a no-op.
        pidfile.remove().unwrap();
    }

    #[test]
    fn test_ensure_directory() {
        let temp_dir = TempDir::new().unwrap();

        PidFile::new(temp_dir.path().join("agent.pid"))
            .ensure_directory()
            .unwrap();

        let missing = PidFile::new(temp_dir.path().join("missing").join("agent.pid"));
        assert!(matches!(
            missing.ensure_directory(),
            Err(PidFileError::MissingDirectory { .. })
        ));
    }

    #[test]
    fn test_ensure_directory_parent_is_file() {
        let temp_dir = TempDir::new().unwrap();
        let file = temp_dir.path().join("plain");
        fs::write(&file, "x").unwrap();

        let pidfile = PidFile::new(file.join("agent.pid"));
        assert!(matches!(
            pidfile.ensure_directory(),
            Err(PidFileError::MissingDirectory { .. })
        ));
    }

    #[test]
    fn test_concurrent_reader_never_sees_torn_write() {
        let temp_dir = TempDir::new().unwrap();
        let pidfile = PidFile::new(temp_dir.path().join("agent.pid"));
        pidfile.write(pid(1)).unwrap();

        let done = Arc::new(AtomicBool::new(false));
        let reader_done = Arc::clone(&done);
        let reader_path = pidfile.path().to_path_buf();
        let reader = thread::spawn(move || {
            let mut reads = 0u64;
            while !reader_done.load(Ordering::Relaxed) {
                let contents = fs::read_to_string(&reader_path).unwrap();
                assert!(
                    parse_pid(&contents).is_some(),
                    "observed torn pidfile contents {contents:?}"
                );
                reads += 1;
            }
            reads
        });

        for raw in 1..=2000 {
            pidfile.write(pid(raw * 7919)).unwrap();
        }
        done.store(true, Ordering::Relaxed);

        let reads = reader.join().unwrap();
        assert!(reads > 0);
    }
}
