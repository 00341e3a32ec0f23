//! Structured logging using tracing.
//!
//! Pretty output for development, JSON lines for log aggregation.

use anyhow::Context;
use tracing_subscriber::{fmt, prelude::*, util::SubscriberInitExt, EnvFilter};

use crate::MonitoringConfig;

/// Build the env filter, preferring `RUST_LOG` over the configured filter
pub fn env_filter(config: &MonitoringConfig) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_filter))
}

/// Initialize structured logging
///
/// Fails if a global subscriber has already been installed.
pub fn init_logging(config: &MonitoringConfig) -> anyhow::Result<()> {
    let registry = tracing_subscriber::registry().with(env_filter(config));

    if config.json_logs {
        registry
            .with(
                fmt::layer()
                    .json()
                    .with_current_span(true)
                    .with_target(true)
                    .with_thread_ids(true),
            )
            .try_init()
    } else {
        registry
            .with(fmt::layer().with_target(true).with_thread_ids(true))
            .try_init()
    }
    .context("Failed to set global default subscriber")?;

    tracing::debug!(
        log_format = if config.json_logs { "json" } else { "pretty" },
        "Logging initialized"
    );

    Ok(())
}

/// Extension for logging a failed result without consuming it
pub trait LogExt<T, E> {
    /// Log the error at warn level with a message, then return the result unchanged
    fn log_warn(self, message: &str) -> Result<T, E>;
}

impl<T, E: std::fmt::Display> LogExt<T, E> for Result<T, E> {
    fn log_warn(self, message: &str) -> Result<T, E> {
        if let Err(ref e) = self {
            tracing::warn!(error = %e, "{}", message);
        }
        self
    }
}
