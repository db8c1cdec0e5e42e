//! Stormcall - attack effect execution engine
//!
//! Runs a scenario headless and writes the combat log.

use std::process::ExitCode;

use stormcall::cli;
use stormcall::headless::run_headless_scenario;

fn main() -> ExitCode {
    let args = cli::parse_args();

    let config = match args.load_scenario() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load scenario: {}", e);
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = run_headless_scenario(config) {
        eprintln!("Scenario failed: {}", e);
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}
