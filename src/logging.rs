//! Tracing subscriber setup.
//!
//! Logs go to stderr so stdout only carries command output. `RUST_LOG`
//! overrides the verbosity flag entirely.

use tracing_subscriber::{EnvFilter, fmt};

use crate::error::{AppError, AppResult};

/// Base level for a `-v` count
pub fn level_for(verbosity: u8) -> &'static str {
    match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace"
    }
}

/// Filter directives for a `-v` count; the driver is capped at `warn`
pub fn default_directives(verbosity: u8) -> String {
    format!("{},tokio_postgres=warn", level_for(verbosity))
}

/// Install the global subscriber
pub fn init_logging(verbosity: u8) -> AppResult<()> {
    let filter = match std::env::var("RUST_LOG") {
        Ok(spec) if !spec.trim().is_empty() => EnvFilter::try_new(spec),
        _ => EnvFilter::try_new(default_directives(verbosity))
    }
    .map_err(|e| AppError::bad_request(format!("Invalid log filter: {}", e)))?;

    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(verbosity >= 2)
        .try_init()
        .map_err(|e| AppError::internal(format!("Failed to initialize logging: {}", e)))
}
