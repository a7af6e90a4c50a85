// Tracing log adapter - Subscriber setup for the binary

use tracing_subscriber::EnvFilter;

use crate::config::LogFormat;
use crate::error::{ClipperError, ClipperResult};

/// Build the filter: `RUST_LOG` wins, otherwise `level`
pub fn env_filter(level: &str) -> ClipperResult<EnvFilter> {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return Ok(filter);
    }
    EnvFilter::try_new(level).map_err(|e| ClipperError::ConfigError {
        message: format!("Invalid log level '{}': {}", level, e),
    })
}

/// Install the global subscriber, logging to stderr
///
/// A second call is a no-op so tests and embedders can call it freely.
pub fn init_tracing(level: &str, format: LogFormat) -> ClipperResult<()> {
    let filter = env_filter(level)?;
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false);
    let _ = match format {
        LogFormat::Text => builder.try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
    Ok(())
}
