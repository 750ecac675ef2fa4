//! Logging setup shared by the seekwell binaries.
//!
//! The progress channel carries the human-readable audit trail; `tracing`
//! carries the operational log. `RUST_LOG` wins over the verbosity flags
//! when it is set, so a deployed binary can be turned up without a restart
//! of the whole pipeline around it.

use crate::Result;
use tracing_subscriber::EnvFilter;

/// Initializes structured logging based on verbosity level.
///
/// * `verbose` — 0=INFO, 1=DEBUG, 2+=TRACE
/// * `quiet` — only ERROR, regardless of `verbose`
///
/// # Errors
/// Returns a configuration error if a global subscriber is already set.
pub fn init_logging(verbose: u8, quiet: bool) -> Result<()> {
    let default_level = match (quiet, verbose) {
        (true, _) => "error",
        (false, 0) => "info",
        (false, 1) => "debug",
        (false, _) => "trace",
    };

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| {
            crate::error::SeekwellError::configuration(format!(
                "failed to initialize logging: {e}"
            ))
        })?;

    Ok(())
}
