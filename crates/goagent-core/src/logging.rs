//! Shared logging initialization for the launcher.

use std::io::IsTerminal;
use std::sync::OnceLock;

static INIT: OnceLock<()> = OnceLock::new();

/// Environment variable selecting the log level.
pub const LOG_ENV: &str = "GOAGENT_LOG";

fn parse_level(value: Option<&str>) -> tracing::Level {
    match value.unwrap_or("warn").to_ascii_lowercase().as_str() {
        "trace" => tracing::Level::TRACE,
        "debug" => tracing::Level::DEBUG,
        "info" => tracing::Level::INFO,
        "error" => tracing::Level::ERROR,
        _ => tracing::Level::WARN,
    }
}

/// Initialize process-level tracing output on stderr from `GOAGENT_LOG`.
///
/// Defaults to `warn` so a normal run prints only the launcher's own
/// one-line notes. Safe to call multiple times; never returns an error.
pub fn init() {
    if INIT.get().is_some() {
        return;
    }
    let level = parse_level(std::env::var(LOG_ENV).ok().as_deref());
    let _ = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .with_ansi(std::io::stderr().is_terminal())
        .with_writer(std::io::stderr)
        .try_init();
    let _ = INIT.set(());
}
