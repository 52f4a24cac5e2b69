//! Command line parsing and execution

use clap::{CommandFactory, Parser};
use goagent_core::{
    AgentCommand, DEFAULT_PIDFILE_PATH, DetachedSpawner, LaunchError, LaunchRequest, Outcome,
    OutputTarget, PidFile, SignalProbe,
};
use std::ffi::OsString;
use std::path::PathBuf;
use thiserror::Error;

/// start-goagent - start the background agent unless one is already running
#[derive(Parser, Debug)]
#[command(
    name = "start-goagent",
    version,
    about = "Start the background agent unless one is already running",
    long_about = "Reads the pidfile, probes the recorded pid, and spawns the agent detached \
                  from the terminal only when no live agent is recorded."
)]
pub struct Cli {
    /// Pidfile recording the running agent's pid
    #[arg(long, value_name = "PATH", default_value = DEFAULT_PIDFILE_PATH)]
    pidfile: PathBuf,

    /// Absolute path of the agent executable
    #[arg(long, value_name = "PATH")]
    agent: Option<PathBuf>,

    /// Argument passed to the agent (repeatable, kept in order)
    #[arg(long = "arg", value_name = "VALUE", allow_hyphen_values = true)]
    args: Vec<OsString>,

    /// Extra environment variable for the agent (repeatable)
    #[arg(long = "env", value_name = "KEY=VALUE", value_parser = parse_env_var)]
    env: Vec<EnvVar>,

    /// Append agent stdout/stderr to this file instead of discarding it
    #[arg(long, value_name = "PATH")]
    log: Option<PathBuf>,

    /// Replace the pidfile even if its pid is alive (the old process is not killed)
    #[arg(long)]
    force: bool,

    /// Serialize concurrent launchers with a lock on <pidfile>.lock
    #[arg(long)]
    exclusive: bool,
}

/// A `KEY=VALUE` pair from `--env`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvVar {
    key: String,
    value: String,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum EnvVarError {
    #[error("expected KEY=VALUE, got '{0}'")]
    MissingSeparator(String),

    #[error("environment variable name must not be empty")]
    EmptyKey,
}

fn parse_env_var(raw: &str) -> Result<EnvVar, EnvVarError> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| EnvVarError::MissingSeparator(raw.to_string()))?;
    if key.is_empty() {
        return Err(EnvVarError::EmptyKey);
    }
    Ok(EnvVar {
        key: key.to_string(),
        value: value.to_string(),
    })
}

impl Cli {
    /// Validate the parsed options into a launch request.
    ///
    /// # Errors
    ///
    /// Returns `LaunchError::InvalidArgs` when `--agent` is missing or not
    /// absolute.
    pub fn into_request(self) -> Result<LaunchRequest, LaunchError> {
        let program = self
            .agent
            .ok_or_else(|| LaunchError::InvalidArgs("missing required option --agent".into()))?;
        if !program.is_absolute() {
            return Err(LaunchError::InvalidArgs(format!(
                "--agent must be an absolute path, got '{}'",
                program.display()
            )));
        }

        let mut agent = AgentCommand::new(program);
        agent.args = self.args;
        agent.env = self
            .env
            .into_iter()
            .map(|EnvVar { key, value }| (key.into(), value.into()))
            .collect();
        if let Some(log) = self.log {
            agent.output = OutputTarget::AppendLog(log);
        }

        let mut request = LaunchRequest::new(PidFile::new(self.pidfile), agent);
        request.force = self.force;
        request.exclusive = self.exclusive;
        Ok(request)
    }

    /// Execute the launcher against the real process table.
    pub fn execute(self) -> Result<(), LaunchError> {
        let request = self.into_request()?;
        tracing::debug!(?request, "launch request");

        match goagent_core::run(&request, &SignalProbe, &DetachedSpawner)? {
            Outcome::AlreadyRunning(pid) => {
                eprintln!("agent already running (pid {pid})");
            }
            Outcome::Started { pid, replaced } => {
                if let Some(replaced) = replaced {
                    eprintln!("{replaced}");
                }
                eprintln!("agent started (pid {pid})");
            }
        }
        Ok(())
    }
}

/// Usage line for diagnostics on invalid arguments.
pub fn usage() -> String {
    Cli::command().render_usage().to_string()
}
