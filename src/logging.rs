use crate::error::LoggingError;

use tracing_subscriber::{fmt, EnvFilter};

/// Install a global `tracing` subscriber that prints to stderr.
///
/// The library never does this on its own. `RUST_LOG` wins over
/// `default_directive` when set. Fails if a global subscriber is already
/// installed.
pub fn init_logging(default_directive: &str) -> Result<(), LoggingError> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_directive))
        .map_err(|e| LoggingError(e.to_string()))?;

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(true)
        .with_line_number(true)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| LoggingError(e.to_string()))?;

    tracing::debug!("Logging initialized");
    Ok(())
}
