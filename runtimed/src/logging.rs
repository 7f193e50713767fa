//! Log output setup

use crate::RuntimeError;
use tracing_subscriber::EnvFilter;

/// Installs the global `tracing` subscriber
///
/// `filter` takes precedence; an empty filter defers to `RUST_LOG`, then to
/// `info`.
pub fn init_logging(filter: &str) -> Result<(), RuntimeError> {
    let filter = build_filter(filter)?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_thread_names(true)
        .try_init()
        .map_err(|err| RuntimeError::Logging(err.to_string()))
}

fn build_filter(filter: &str) -> Result<EnvFilter, RuntimeError> {
    if filter.is_empty() {
        return Ok(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")));
    }
    EnvFilter::try_new(filter)
        .map_err(|err| RuntimeError::InvalidConfig(format!("log filter '{}': {}", filter, err)))
}
