//! Core library for goagent: a single-instance, pidfile-guarded agent launcher
//!
//! A launcher invocation reads the pidfile, probes the recorded pid with the
//! null signal, and either defers to the live agent or spawns a new one
//! detached from the terminal and records its pid atomically.
//!
//! Process creation ([`launcher::Spawner`]) and liveness probing
//! ([`liveness::LivenessProbe`]) are capabilities passed into [`flow::run`],
//! so the control flow can be exercised without forking.

pub mod error;
pub mod flow;
pub mod io;
pub mod launcher;
pub mod liveness;
pub mod logging;
pub mod pidfile;

pub use error::LaunchError;
pub use flow::{LaunchRequest, Outcome, Replaced, run};
pub use launcher::{AgentCommand, DetachedSpawner, OutputTarget, SpawnError, Spawner};
pub use liveness::{LivenessProbe, SignalProbe};
pub use pidfile::{DEFAULT_PIDFILE_PATH, Pid, PidFile, PidRecord};
