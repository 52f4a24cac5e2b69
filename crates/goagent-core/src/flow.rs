//! The launcher's single control path.
//!
//! ```text
//! check directory -> [lock] -> read pidfile -> classify -> spawn -> atomic write
//! ```
//!
//! A live record ends the run without side effects. Stale and malformed
//! records are not deleted up front: the successful spawn's atomic rename
//! replaces them, so a failed spawn leaves the previous file byte-for-byte
//! as it was.
//!
//! Two launchers racing on an absent pidfile may both spawn; the last rename
//! wins and the other agent runs unrecorded. [`LaunchRequest::exclusive`]
//! closes that window with an advisory lock on `<pidfile>.lock`.

use crate::error::LaunchError;
use crate::io::lock::{DEFAULT_LOCK_RETRIES, acquire_lock};
use crate::launcher::{AgentCommand, Spawner};
use crate::liveness::LivenessProbe;
use crate::pidfile::{Pid, PidFile, PidRecord};
use std::fmt;

/// One launcher invocation.
#[derive(Debug, Clone)]
pub struct LaunchRequest {
    pub pidfile: PidFile,
    pub agent: AgentCommand,
    /// Replace the record even when its pid is alive. The old process is left
    /// running.
    pub force: bool,
    /// Hold an exclusive lock on `<pidfile>.lock` for the whole run.
    pub exclusive: bool,
}

impl LaunchRequest {
    pub fn new(pidfile: PidFile, agent: AgentCommand) -> Self {
        Self {
            pidfile,
            agent,
            force: false,
            exclusive: false,
        }
    }
}

/// Why an existing pidfile was overwritten.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Replaced {
    /// Recorded pid was not alive.
    Stale(Pid),
    /// Contents did not parse as a pid.
    Malformed,
    /// Recorded pid was alive but `force` was set.
    Forced(Pid),
}

impl fmt::Display for Replaced {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Replaced::Stale(pid) => write!(f, "replaced stale pidfile (pid {pid} not running)"),
            Replaced::Malformed => write!(f, "replaced malformed pidfile"),
            Replaced::Forced(pid) => {
                write!(f, "replaced pidfile of running pid {pid} (forced)")
            }
        }
    }
}

/// Successful end states of a launcher invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// A live agent was already recorded; nothing was spawned or written.
    AlreadyRunning(Pid),
    /// A new agent was spawned and recorded.
    Started { pid: Pid, replaced: Option<Replaced> },
}

/// Decide what to do with the current pidfile contents: `Ok` means spawn
/// (possibly replacing something), `Err` carries the live pid to defer to.
fn classify(
    record: PidRecord,
    force: bool,
    probe: &impl LivenessProbe,
) -> Result<Option<Replaced>, Pid> {
    match record {
        PidRecord::Absent => Ok(None),
        PidRecord::Malformed(contents) => {
            tracing::info!(contents = %contents.escape_debug(), "malformed pidfile, replacing");
            Ok(Some(Replaced::Malformed))
        }
        PidRecord::Present(pid) if probe.is_alive(pid) => {
            if force {
                tracing::info!(%pid, "agent alive but force set, replacing pidfile");
                Ok(Some(Replaced::Forced(pid)))
            } else {
                Err(pid)
            }
        }
        PidRecord::Present(pid) => {
            tracing::info!(%pid, "stale pidfile, recorded agent is not running");
            Ok(Some(Replaced::Stale(pid)))
        }
    }
}

/// Run the launcher: start the agent unless a live one is already recorded.
///
/// # Errors
///
/// - `LaunchError::PidFile` if the pidfile directory is missing, the lock
///   cannot be taken, or the pidfile cannot be read or written
/// - `LaunchError::Spawn` if the agent could not be started; the pidfile is
///   not touched in that case
pub fn run(
    request: &LaunchRequest,
    probe: &impl LivenessProbe,
    spawner: &impl Spawner,
) -> Result<Outcome, LaunchError> {
    let pidfile = &request.pidfile;
    pidfile.ensure_directory()?;

    let _lock = if request.exclusive {
        Some(acquire_lock(&pidfile.lock_path(), DEFAULT_LOCK_RETRIES)?)
    } else {
        None
    };

    let record = pidfile.read()?;
    let replaced = match classify(record, request.force, probe) {
        Ok(replaced) => replaced,
        Err(pid) => {
            tracing::info!(%pid, "agent already running");
            return Ok(Outcome::AlreadyRunning(pid));
        }
    };

    let pid = spawner.spawn(&request.agent)?;

    if let Err(e) = pidfile.write(pid) {
        tracing::error!(%pid, error = %e, "agent started but pidfile could not be written");
        return Err(e.into());
    }
    tracing::info!(%pid, path = %pidfile.path().display(), "agent recorded");

    Ok(Outcome::Started { pid, replaced })
}
