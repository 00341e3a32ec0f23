//! HTTP gateways for the callflow orchestrator.
//!
//! Implements the four gateway traits from `callflow-core` over JSON/HTTP.
//! Every request carries `Authorization: Bearer <token>` from the injected
//! [`CredentialStore`] and is bounded by the configured client timeout.

use callflow_core::{GatewayError, Gateways};
use std::sync::Arc;
use std::time::Duration;

pub mod config;
pub mod credentials;
pub mod flow_state;
pub mod http;
pub mod speech;
pub mod telephony;

pub use config::GatewayConfig;
pub use credentials::{CredentialStore, StaticCredentials};
pub use flow_state::FlowStateClient;
pub use http::HttpClient;
pub use speech::{SpeechRecognitionClient, SpeechSynthesisClient};
pub use telephony::TelephonyClient;

/// Build all four HTTP gateways from configuration
pub fn build_gateways(
    config: &GatewayConfig,
    credentials: Arc<dyn CredentialStore>,
) -> Result<Gateways, GatewayError> {
    let timeout = Duration::from_secs(config.timeout_secs);
    let client = |url: &str| HttpClient::new(url, timeout, credentials.clone());

    Ok(Gateways::new(
        Arc::new(FlowStateClient::new(client(&config.flow_state_url)?)),
        Arc::new(SpeechSynthesisClient::new(client(&config.synthesis_url)?)),
        Arc::new(SpeechRecognitionClient::new(client(&config.recognition_url)?)),
        Arc::new(TelephonyClient::new(client(&config.telephony_url)?)),
    ))
}
