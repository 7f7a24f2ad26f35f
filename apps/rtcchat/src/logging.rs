//! Logging System
//!
//! Structured logging with `tracing`. The filter comes from `RUST_LOG` and
//! falls back to [`DEFAULT_FILTER`]; the output format is chosen on the
//! command line. Logs go to stderr so command output on stdout stays clean.

use clap::ValueEnum;
use thiserror::Error;
use tracing_subscriber::fmt::time::ChronoUtc;
use tracing_subscriber::{EnvFilter, Registry, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Filter used when `RUST_LOG` is unset or unparsable.
pub const DEFAULT_FILTER: &str = "rtcchat=info,tower_http=info";

/// Output format: json, text (default: text)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("invalid log filter: {0}")]
    Filter(String),
    #[error("logging already initialized: {0}")]
    AlreadyInitialized(String),
}

/// Build the level filter from `RUST_LOG`, or from `fallback`.
pub fn build_env_filter(fallback: &str) -> Result<EnvFilter, LoggingError> {
    match EnvFilter::try_from_default_env() {
        Ok(filter) => Ok(filter),
        Err(_) => EnvFilter::try_new(fallback).map_err(|e| LoggingError::Filter(e.to_string())),
    }
}

/// Initialize the global subscriber.
pub fn init_logging(format: LogFormat) -> Result<(), LoggingError> {
    let filter = build_env_filter(DEFAULT_FILTER)?;
    let base_subscriber = Registry::default().with(filter);

    let result = match format {
        LogFormat::Json => base_subscriber
            .with(
                fmt::layer()
                    .json()
                    .with_target(true)
                    .with_timer(ChronoUtc::rfc_3339())
                    .with_writer(std::io::stderr),
            )
            .try_init(),
        LogFormat::Text => base_subscriber
            .with(
                fmt::layer()
                    .with_target(true)
                    .with_timer(ChronoUtc::rfc_3339())
                    .with_writer(std::io::stderr),
            )
            .try_init(),
    };
    result.map_err(|e| LoggingError::AlreadyInitialized(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_filter_parses() {
        assert!(EnvFilter::try_new(DEFAULT_FILTER).is_ok());
    }

    #[test]
    fn test_bad_fallback_is_reported() {
        // Only meaningful when RUST_LOG is not set for the test run.
        if std::env::var("RUST_LOG").is_err() {
            assert!(build_env_filter("rtcchat=notalevel").is_err());
        }
    }
}
