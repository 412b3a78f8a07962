//! Logging configuration and initialization
//!
//! Diagnostics go to stderr through `tracing`; stdout is left for the
//! confirmation line.

use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Level used when the configured one is not recognised
const FALLBACK_LEVEL: &str = "warn";

/// Normalize a configured log level into an `EnvFilter` directive
///
/// Only the first word is used, so values with trailing comments still work.
/// `warning` maps to `warn` and `critical` to `error`.
pub fn normalize_level(log_level: &str) -> &'static str {
    let level = log_level
        .split_whitespace()
        .next()
        .unwrap_or(FALLBACK_LEVEL)
        .to_lowercase();

    match level.as_str() {
        "trace" => "trace",
        "debug" => "debug",
        "info" => "info",
        "warn" | "warning" => "warn",
        "error" | "critical" => "error",
        _ => FALLBACK_LEVEL,
    }
}

/// Initialize the logging system with the specified level
///
/// `RUST_LOG` takes precedence over `log_level` when set.
pub fn init_logging(log_level: &str) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(normalize_level(log_level)));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}
