//! Logging setup for the bridge

use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Initialize tracing for the bridge
///
/// `RUST_LOG` wins when set. Otherwise the configured level applies to the
/// bridge crates while the HTTP stack is capped at `warn`, so per-request
/// plumbing does not drown the telemetry and session logs.
pub fn setup_logging(default_level: &str) -> crate::Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_directives(default_level)))
        .map_err(|e| crate::Error::Config(format!("Invalid log filter: {}", e)))?;

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer())
        .init();

    Ok(())
}

fn default_directives(level: &str) -> String {
    format!("{level},tower_http=warn,hyper=warn")
}
