//! Detached agent spawning.
//!
//! The agent is started in its own session with its standard streams pointed
//! away from the launcher, then forgotten: the launcher keeps no handle and
//! never waits on it. When the launcher exits the agent is reparented to init
//! (or the nearest subreaper).

use crate::pidfile::Pid;
use std::ffi::OsString;
use std::fs::{File, OpenOptions};
use std::path::PathBuf;
use std::process::{Command, Stdio};
use thiserror::Error;

/// Where the agent's stdout and stderr go.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum OutputTarget {
    /// `/dev/null`
    #[default]
    Null,
    /// A log file opened for append, created if missing.
    AppendLog(PathBuf),
}

/// Everything needed to start the agent.
///
/// The agent inherits the launcher's environment; `env` entries are layered
/// on top of it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentCommand {
    pub program: PathBuf,
    pub args: Vec<OsString>,
    pub env: Vec<(OsString, OsString)>,
    pub output: OutputTarget,
}

impl AgentCommand {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            env: Vec::new(),
            output: OutputTarget::Null,
        }
    }

    pub fn arg(mut self, arg: impl Into<OsString>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn env(mut self, key: impl Into<OsString>, value: impl Into<OsString>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    pub fn output(mut self, output: OutputTarget) -> Self {
        self.output = output;
        self
    }
}

/// Errors raised while starting the agent. Any of them means no process was
/// left running.
#[derive(Error, Debug)]
pub enum SpawnError {
    /// The agent log file could not be opened for append
    #[error("cannot open agent log {path}: {source}")]
    LogFile {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The OS refused to create or exec the process
    #[error("failed to spawn {program}: {source}")]
    Exec {
        program: PathBuf,
        source: std::io::Error,
    },
}

/// Starts the agent and reports its pid without waiting for it.
pub trait Spawner {
    /// # Errors
    ///
    /// Returns `SpawnError` if the process could not be started.
    fn spawn(&self, command: &AgentCommand) -> Result<Pid, SpawnError>;
}

/// [`Spawner`] that creates a real, session-detached child process.
#[derive(Debug, Default, Clone, Copy)]
pub struct DetachedSpawner;

impl Spawner for DetachedSpawner {
    fn spawn(&self, command: &AgentCommand) -> Result<Pid, SpawnError> {
        let (stdout, stderr) = open_output(&command.output)?;

        let mut cmd = Command::new(&command.program);
        cmd.args(&command.args)
            .envs(command.env.iter().map(|(k, v)| (k, v)))
            .stdin(Stdio::null())
            .stdout(stdout)
            .stderr(stderr);
        detach(&mut cmd);

        let exec_err = |source: std::io::Error| SpawnError::Exec {
            program: command.program.clone(),
            source,
        };
        let child = cmd.spawn().map_err(exec_err)?;
        let pid = Pid::from_u32(child.id()).ok_or_else(|| {
            exec_err(std::io::Error::other(format!(
                "kernel reported unusable pid {}",
                child.id()
            )))
        })?;

        tracing::info!(
            program = %command.program.display(),
            args = ?command.args,
            %pid,
            "spawned detached agent"
        );
        // Dropping `Child` neither kills nor waits on the process.
        drop(child);
        Ok(pid)
    }
}

fn open_output(output: &OutputTarget) -> Result<(Stdio, Stdio), SpawnError> {
    match output {
        OutputTarget::Null => Ok((Stdio::null(), Stdio::null())),
        OutputTarget::AppendLog(path) => {
            let log_err = |source: std::io::Error| SpawnError::LogFile {
                path: path.clone(),
                source,
            };
            let file: File = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .map_err(log_err)?;
            let dup = file.try_clone().map_err(log_err)?;
            Ok((Stdio::from(file), Stdio::from(dup)))
        }
    }
}

/// Put the child in a new session so terminal signals aimed at the launcher's
/// process group never reach it.
#[cfg(unix)]
fn detach(cmd: &mut Command) {
    use std::os::unix::process::CommandExt;

    // SAFETY: runs in the forked child before exec; setsid is
    // async-signal-safe and touches no shared state.
    unsafe {
        cmd.pre_exec(|| {
            if libc::setsid() == -1 {
                return Err(std::io::Error::last_os_error());
            }
            Ok(())
        });
    }
}

#[cfg(not(unix))]
fn detach(_cmd: &mut Command) {}
