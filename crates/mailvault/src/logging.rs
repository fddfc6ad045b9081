//! Terminal and run-log tracing setup

use anyhow::{Context, Result};
use std::fs::OpenOptions;
use std::path::Path;
use std::sync::Mutex;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Terminal filter for the given verbosity flags
fn terminal_filter(verbose: u8, quiet: bool) -> EnvFilter {
    if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("info"),
            1 => EnvFilter::new("debug"),
            _ => EnvFilter::new("trace"),
        }
    }
}

/// Install the subscriber.
///
/// The terminal follows `-v`/`-q`. The run log always records debug and
/// above, without colour, so it stays useful after a quiet run.
pub fn init(verbose: u8, quiet: bool, run_log: &Path) -> Result<()> {
    let mut options = OpenOptions::new();
    options.create(true).append(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }
    let file = options
        .open(run_log)
        .with_context(|| format!("Failed to open run log: {}", run_log.display()))?;

    let file_filter = if verbose > 1 {
        EnvFilter::new("trace")
    } else {
        EnvFilter::new("debug")
    };

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr)
                .with_filter(terminal_filter(verbose, quiet)),
        )
        .with(
            fmt::layer()
                .with_target(false)
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .with_filter(file_filter),
        )
        .try_init()
        .context("Failed to initialise logging")?;

    Ok(())
}
