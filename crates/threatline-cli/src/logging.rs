// Logging setup for the threatline binary

use tracing::Level;
use tracing_subscriber::fmt;

use crate::error::{CliError, CliResult};

/// Parse a `--log-level` value
pub fn parse_level(level: &str) -> CliResult<Level> {
    match level.to_lowercase().as_str() {
        "trace" => Ok(Level::TRACE),
        "debug" => Ok(Level::DEBUG),
        "info" => Ok(Level::INFO),
        "warn" => Ok(Level::WARN),
        "error" => Ok(Level::ERROR),
        other => Err(CliError::InvalidArgument {
            message: format!(
                "unknown log level '{}' (expected trace, debug, info, warn or error)",
                other
            ),
        }),
    }
}

/// Install the stderr subscriber; `quiet` raises the threshold to errors only
pub fn init_logging(level: &str, quiet: bool) -> CliResult<()> {
    let level = if quiet { Level::ERROR } else { parse_level(level)? };
    let verbose = level >= Level::DEBUG;

    fmt()
        .with_max_level(level)
        .with_target(verbose)
        .with_file(verbose)
        .with_line_number(verbose)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| CliError::Internal(format!("failed to install logger: {}", e)))
}
