//! Mailvault CLI - batch mailbox backups for directory groups
//!
//! This is the main entry point for the mailvault command-line interface.

mod cli;
mod commands;
mod logging;
mod output;
mod prompt;

use clap::Parser;
use std::process::ExitCode;

use cli::Cli;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match commands::run::execute(&cli).await {
        Ok(outcome) => ExitCode::from(outcome.exit_code()),
        Err(e) => {
            // Logging is not set up until the run directory exists
            output::error(&format!("{:#}", e));
            ExitCode::FAILURE
        }
    }
}
