//! Monitoring for the callflow orchestrator.
//!
//! Structured logging setup and a small set of in-process counters the
//! orchestrator updates as calls move through their flows.

use std::env;
use tracing::info;

pub mod logging;
pub mod metrics;

pub use logging::init_logging;
pub use metrics::{MetricsSnapshot, OrchestratorMetrics};

/// Configuration for initializing the monitoring system
#[derive(Debug, Clone)]
pub struct MonitoringConfig {
    /// Service name attached to the startup log line
    pub service_name: String,
    /// Log level filter (e.g., "info,callflow_core=debug"), overridden by `RUST_LOG`
    pub log_filter: String,
    /// Emit JSON log lines instead of the human readable format
    pub json_logs: bool,
    /// Environment (development, staging, production)
    pub environment: String,
}

impl Default for MonitoringConfig {
    fn default() -> Self {
        Self {
            service_name: "callflow".to_string(),
            log_filter: "info".to_string(),
            json_logs: false,
            environment: "development".to_string(),
        }
    }
}

impl MonitoringConfig {
    /// Defaults overridden by `LOG_LEVEL`, `LOG_JSON` and `ENVIRONMENT`
    pub fn from_env(service_name: &str) -> Self {
        Self::from_lookup(service_name, |key| env::var(key).ok())
    }

    /// Same as [`MonitoringConfig::from_env`] with an arbitrary key lookup
    pub fn from_lookup<F>(service_name: &str, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        Self {
            service_name: service_name.to_string(),
            log_filter: lookup("LOG_LEVEL").unwrap_or(defaults.log_filter),
            json_logs: lookup("LOG_JSON")
                .map(|v| v.eq_ignore_ascii_case("true") || v == "1")
                .unwrap_or(defaults.json_logs),
            environment: lookup("ENVIRONMENT").unwrap_or(defaults.environment),
        }
    }
}

/// Initialize monitoring system
pub fn init(config: &MonitoringConfig) -> anyhow::Result<()> {
    logging::init_logging(config)?;

    info!(
        service_name = %config.service_name,
        environment = %config.environment,
        "Monitoring initialized"
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = MonitoringConfig::default();
        assert_eq!(config.service_name, "callflow");
        assert_eq!(config.log_filter, "info");
        assert!(!config.json_logs);
    }

    #[test]
    fn test_from_lookup_reads_log_settings() {
        let config = MonitoringConfig::from_lookup("callflow-server", |key| match key {
            "LOG_LEVEL" => Some("debug,hyper=info".to_string()),
            "LOG_JSON" => Some("1".to_string()),
            _ => None,
        });

        assert_eq!(config.service_name, "callflow-server");
        assert_eq!(config.log_filter, "debug,hyper=info");
        assert!(config.json_logs);
        assert_eq!(config.environment, "development");
    }
}
