//! Logging setup for the `strata` binary.
//!
//! Log records go to stderr so stdout stays clean for `--json` output.
//!
//! ## Environment Variables
//!
//! - `STRATA_LOG_LEVEL=trace|debug|info|warn|error` - Set the log level
//!   (default: `warn`, or `info` with `--verbose`)
//! - `STRATA_LOG_FORMAT=compact|pretty|json` - Set the output format
//!   (default: `compact`)

use std::env;
use std::sync::Once;

static INIT: Once = Once::new();

/// Environment variable selecting the log level.
pub const LOG_LEVEL_ENV: &str = "STRATA_LOG_LEVEL";

/// Environment variable selecting the log format.
pub const LOG_FORMAT_ENV: &str = "STRATA_LOG_FORMAT";

/// Resolve the log level from an optional override and the verbose flag.
pub fn resolve_level(requested: Option<&str>, verbose: bool) -> &'static str {
    let fallback = if verbose { "info" } else { "warn" };

    match requested.map(|level| level.trim().to_lowercase()) {
        Some(level) => match level.as_str() {
            "trace" => "trace",
            "debug" => "debug",
            "info" => "info",
            "warn" => "warn",
            "error" => "error",
            _ => fallback,
        },
        None => fallback,
    }
}

/// Resolve the log format from an optional override.
pub fn resolve_format(requested: Option<&str>) -> &'static str {
    requested
        .map(|format| match format.trim().to_lowercase().as_str() {
            "pretty" => "pretty",
            "json" => "json",
            _ => "compact",
        })
        .unwrap_or("compact")
}

/// Initialize logging. Subsequent calls are no-ops.
pub fn init(verbose: bool) {
    INIT.call_once(|| {
        use tracing_subscriber::{EnvFilter, fmt, prelude::*};

        let requested_level = env::var(LOG_LEVEL_ENV).ok();
        let requested_format = env::var(LOG_FORMAT_ENV).ok();
        let level = resolve_level(requested_level.as_deref(), verbose);
        let format = resolve_format(requested_format.as_deref());

        let filter = EnvFilter::try_new(format!(
            "strata={level},strata_cli={level},strata_migrate={level},strata_sqlite={level}"
        ))
        .unwrap_or_else(|_| EnvFilter::new("warn"));

        let registry = tracing_subscriber::registry().with(filter);
        let result = match format {
            "json" => registry
                .with(fmt::layer().json().with_writer(std::io::stderr))
                .try_init(),
            "pretty" => registry
                .with(fmt::layer().pretty().with_writer(std::io::stderr))
                .try_init(),
            _ => registry
                .with(fmt::layer().compact().with_writer(std::io::stderr))
                .try_init(),
        };

        if result.is_ok() {
            tracing::debug!(level, format, "strata logging initialized");
        }
    });
}
