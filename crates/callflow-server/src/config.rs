//! Configuration for the callflow server
//!
//! Loaded from environment variables on top of defaults.

use callflow_core::OrchestratorConfig;
use callflow_gateways::GatewayConfig;
use serde::{Deserialize, Serialize};
use std::env;
use std::str::FromStr;
use std::time::Duration;
use tracing::{info, warn};

use crate::error::{ServerError, ServerResult};

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Port to listen on
    #[serde(default = "default_port")]
    pub port: u16,

    /// Host to bind to
    #[serde(default = "default_host")]
    pub bind_address: String,

    /// Flow State Service base URL
    pub flow_state_url: String,

    /// Speech synthesis base URL
    pub synthesis_url: String,

    /// Speech recognition base URL
    pub recognition_url: String,

    /// Telephony control base URL
    pub telephony_url: String,

    /// Bearer token for outbound service calls
    #[serde(default)]
    pub api_token: Option<String>,

    /// HTTP client timeout for service calls
    #[serde(default = "default_gateway_timeout_secs")]
    pub gateway_timeout_secs: u64,

    /// Orchestrator timings
    #[serde(default)]
    pub orchestrator: OrchestratorConfig,

    /// Sessions idle this long with nothing scheduled are reaped
    #[serde(default = "default_session_max_idle_secs")]
    pub session_max_idle_secs: u64,

    /// How often the reaper runs
    #[serde(default = "default_reaper_interval_secs")]
    pub reaper_interval_secs: u64,
}

fn default_port() -> u16 {
    8080
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_gateway_timeout_secs() -> u64 {
    10
}

fn default_session_max_idle_secs() -> u64 {
    3600
}

fn default_reaper_interval_secs() -> u64 {
    60
}

impl ServerConfig {
    /// Load configuration from environment variables
    pub fn load() -> ServerResult<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> ServerResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        // Start with defaults
        let mut config = Self::default();

        parse_into(&lookup, "CALLFLOW_PORT", &mut config.port);
        if let Some(host) = lookup("CALLFLOW_HOST") {
            config.bind_address = host;
        }

        if let Some(url) = lookup("FLOW_STATE_URL") {
            config.flow_state_url = url;
        }
        if let Some(url) = lookup("SPEECH_SYNTHESIS_URL") {
            config.synthesis_url = url;
        }
        if let Some(url) = lookup("SPEECH_RECOGNITION_URL") {
            config.recognition_url = url;
        }
        if let Some(url) = lookup("TELEPHONY_URL") {
            config.telephony_url = url;
        }

        config.api_token = lookup("CALLFLOW_API_TOKEN").filter(|token| !token.is_empty());
        parse_into(&lookup, "GATEWAY_TIMEOUT_SECS", &mut config.gateway_timeout_secs);

        // Timing overrides, in milliseconds
        let orchestrator = &mut config.orchestrator;
        parse_millis(&lookup, "SAY_GRACE_MS", &mut orchestrator.say_grace);
        parse_millis(&lookup, "DECISION_PAUSE_MS", &mut orchestrator.decision_pause);
        parse_millis(&lookup, "END_GRACE_MS", &mut orchestrator.end_grace);
        parse_millis(&lookup, "GATEWAY_CALL_TIMEOUT_MS", &mut orchestrator.gateway_timeout);
        if let Some(language) = lookup("RECOGNITION_LANGUAGE") {
            orchestrator.recognition_language = language;
        }

        parse_into(&lookup, "SESSION_MAX_IDLE_SECS", &mut config.session_max_idle_secs);
        parse_into(&lookup, "REAPER_INTERVAL_SECS", &mut config.reaper_interval_secs);

        config.validate()?;

        if config.api_token.is_none() {
            warn!("No CALLFLOW_API_TOKEN provided - service calls will be unauthenticated!");
        }

        info!("Loaded server configuration");
        Ok(config)
    }

    /// Validate required fields
    pub fn validate(&self) -> ServerResult<()> {
        let urls = [
            ("FLOW_STATE_URL", &self.flow_state_url),
            ("SPEECH_SYNTHESIS_URL", &self.synthesis_url),
            ("SPEECH_RECOGNITION_URL", &self.recognition_url),
            ("TELEPHONY_URL", &self.telephony_url),
        ];
        for (key, url) in urls {
            if url.is_empty() {
                return Err(ServerError::ConfigError(format!("{} is required", key)));
            }
        }

        if self.reaper_interval_secs == 0 {
            return Err(ServerError::ConfigError(
                "REAPER_INTERVAL_SECS must be positive".to_string(),
            ));
        }
        Ok(())
    }

    pub fn gateway_config(&self) -> GatewayConfig {
        GatewayConfig {
            flow_state_url: self.flow_state_url.clone(),
            synthesis_url: self.synthesis_url.clone(),
            recognition_url: self.recognition_url.clone(),
            telephony_url: self.telephony_url.clone(),
            timeout_secs: self.gateway_timeout_secs,
        }
    }

    pub fn session_max_idle(&self) -> Duration {
        Duration::from_secs(self.session_max_idle_secs)
    }

    pub fn reaper_interval(&self) -> Duration {
        Duration::from_secs(self.reaper_interval_secs)
    }
}

fn parse_into<F, T>(lookup: &F, key: &str, target: &mut T)
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    if let Some(raw) = lookup(key) {
        match raw.parse::<T>() {
            Ok(value) => *target = value,
            Err(_) => warn!("Invalid {} value: {}", key, raw),
        }
    }
}

fn parse_millis<F>(lookup: &F, key: &str, target: &mut Duration)
where
    F: Fn(&str) -> Option<String>,
{
    let mut millis = target.as_millis() as u64;
    parse_into(lookup, key, &mut millis);
    *target = Duration::from_millis(millis);
}

impl Default for ServerConfig {
    fn default() -> Self {
        let gateways = GatewayConfig::default();
        Self {
            port: default_port(),
            bind_address: default_host(),
            flow_state_url: gateways.flow_state_url,
            synthesis_url: gateways.synthesis_url,
            recognition_url: gateways.recognition_url,
            telephony_url: gateways.telephony_url,
            api_token: None,
            gateway_timeout_secs: default_gateway_timeout_secs(),
            orchestrator: OrchestratorConfig::default(),
            session_max_idle_secs: default_session_max_idle_secs(),
            reaper_interval_secs: default_reaper_interval_secs(),
        }
    }
}
