//! Gateway traits for the external services the orchestrator drives.
//!
//! The orchestrator only sees these traits. HTTP implementations live in
//! the `callflow-gateways` crate; tests use in-memory fakes.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use super::flow_state::FlowState;
use super::session::{CallId, FlowId, VoiceSettings, VoiceTier};
use crate::error::GatewayError;

/// Context sent with the first request of a flow
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlowContext {
    pub caller_address: String,
    pub started_at: DateTime<Utc>,
    pub voice_settings: VoiceSettings,
}

/// `begin flow` request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BeginFlowRequest {
    pub flow_id: FlowId,
    /// Call the flow is started for, so the service can key its context
    pub call_id: CallId,
    pub context: FlowContext,
}

/// `advance flow` request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdvanceFlowRequest {
    pub call_id: CallId,
    pub flow_id: FlowId,
    /// Transcribed utterance, or `None` for an automatic advance
    pub external_input: Option<String>,
}

/// `synthesize` request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SynthesisRequest {
    pub text: String,
    pub voice_id: String,
    pub tier: VoiceTier,
    pub call_id: CallId,
}

/// `arm recognition` request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecognitionRequest {
    pub call_id: CallId,
    pub language: String,
    pub interim_results: bool,
}

/// `transfer call` request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferRequest {
    pub call_id: CallId,
    pub transfer_target: Option<String>,
    /// Data collected by the flow, passed through untouched
    pub context: serde_json::Value,
}

/// Flow State Service: owns flow definitions and decides the next node
#[async_trait]
pub trait FlowStateService: Send + Sync {
    /// Fetch the first node of a flow for a new call
    async fn begin_flow(&self, request: &BeginFlowRequest) -> Result<FlowState, GatewayError>;

    /// Fetch the node that follows the call's current one
    async fn advance_flow(&self, request: &AdvanceFlowRequest) -> Result<FlowState, GatewayError>;

    /// Drop any server-side context kept for the call
    async fn discard_context(&self, call_id: &CallId) -> Result<(), GatewayError>;
}

/// Speech Synthesis Service
#[async_trait]
pub trait SpeechSynthesisService: Send + Sync {
    /// Queue `request.text` for playback on the call
    async fn synthesize(&self, request: &SynthesisRequest) -> Result<(), GatewayError>;
}

/// Speech Recognition Service
#[async_trait]
pub trait SpeechRecognitionService: Send + Sync {
    /// Start listening on the call; transcripts arrive through the telephony layer
    async fn arm_recognition(&self, request: &RecognitionRequest) -> Result<(), GatewayError>;
}

/// Telephony Control Service
#[async_trait]
pub trait TelephonyControlService: Send + Sync {
    /// Hand the call off to a human agent or queue
    async fn transfer_call(&self, request: &TransferRequest) -> Result<(), GatewayError>;

    /// Hang up the call
    async fn end_call(&self, call_id: &CallId) -> Result<(), GatewayError>;
}

/// The four collaborators, bundled for injection
#[derive(Clone)]
pub struct Gateways {
    pub flow_state: Arc<dyn FlowStateService>,
    pub synthesis: Arc<dyn SpeechSynthesisService>,
    pub recognition: Arc<dyn SpeechRecognitionService>,
    pub telephony: Arc<dyn TelephonyControlService>,
}

impl Gateways {
    pub fn new(
        flow_state: Arc<dyn FlowStateService>,
        synthesis: Arc<dyn SpeechSynthesisService>,
        recognition: Arc<dyn SpeechRecognitionService>,
        telephony: Arc<dyn TelephonyControlService>,
    ) -> Self {
        Self {
            flow_state,
            synthesis,
            recognition,
            telephony,
        }
    }
}

/// Bound a gateway call by `limit`
pub async fn with_timeout<T, F>(limit: Duration, call: F) -> Result<T, GatewayError>
where
    F: Future<Output = Result<T, GatewayError>>,
{
    match tokio::time::timeout(limit, call).await {
        Ok(result) => result,
        Err(_) => Err(GatewayError::Timeout(limit)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_advance_request_wire_format() {
        let request = AdvanceFlowRequest {
            call_id: CallId::from("call-1"),
            flow_id: FlowId::from("flow-42"),
            external_input: None,
        };

        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            json!({ "callId": "call-1", "flowId": "flow-42", "externalInput": null })
        );
    }

    #[test]
    fn test_synthesis_request_wire_format() {
        let request = SynthesisRequest {
            text: "Hello".to_string(),
            voice_id: "v1".to_string(),
            tier: VoiceTier::Premium,
            call_id: CallId::from("call-1"),
        };

        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            json!({ "text": "Hello", "voiceId": "v1", "tier": "premium", "callId": "call-1" })
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_with_timeout_maps_elapsed() {
        let slow = async {
            tokio::time::sleep(Duration::from_secs(10)).await;
            Ok::<_, GatewayError>(())
        };

        let result = with_timeout(Duration::from_secs(1), slow).await;
        assert_eq!(result, Err(GatewayError::Timeout(Duration::from_secs(1))));
    }

    #[tokio::test]
    async fn test_with_timeout_passes_result_through() {
        let result = with_timeout(Duration::from_secs(1), async { Ok::<_, GatewayError>(7) }).await;
        assert_eq!(result, Ok(7));
    }
}
