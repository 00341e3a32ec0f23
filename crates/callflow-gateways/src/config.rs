//! Endpoint configuration for the HTTP gateways.

use serde::{Deserialize, Serialize};

/// Base URLs and client timeout for the four services
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// Flow State Service base URL
    pub flow_state_url: String,
    /// Speech synthesis base URL
    pub synthesis_url: String,
    /// Speech recognition base URL
    pub recognition_url: String,
    /// Telephony control base URL
    pub telephony_url: String,
    /// Timeout in seconds for HTTP requests
    pub timeout_secs: u64,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            flow_state_url: "http://localhost:8081".to_string(),
            synthesis_url: "http://localhost:8082".to_string(),
            recognition_url: "http://localhost:8083".to_string(),
            telephony_url: "http://localhost:8084".to_string(),
            timeout_secs: 10,
        }
    }
}
