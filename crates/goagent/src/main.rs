//! start-goagent - single-instance launcher for the background agent
//!
//! A thin CLI over `goagent-core`: parse options, run the launch flow, map
//! the result onto the process exit code.

use clap::Parser;
use goagent_core::LaunchError;
use std::process::ExitCode;

mod cli;

use cli::Cli;

fn main() -> ExitCode {
    let cli = Cli::parse();
    goagent_core::logging::init();

    match cli.execute() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("start-goagent: {e}");
            if matches!(e, LaunchError::InvalidArgs(_)) {
                eprintln!("{}", cli::usage());
            }
            ExitCode::from(e.exit_code())
        }
    }
}
