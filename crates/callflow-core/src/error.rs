use serde::Serialize;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

use crate::domain::flow_state::NodeKind;
use crate::domain::session::CallId;

/// External collaborator a gateway call went to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Service {
    FlowState,
    SpeechSynthesis,
    SpeechRecognition,
    TelephonyControl,
}

impl fmt::Display for Service {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Service::FlowState => "flow_state",
            Service::SpeechSynthesis => "speech_synthesis",
            Service::SpeechRecognition => "speech_recognition",
            Service::TelephonyControl => "telephony_control",
        })
    }
}

/// A single gateway operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    BeginFlow,
    AdvanceFlow,
    DiscardContext,
    Synthesize,
    ArmRecognition,
    TransferCall,
    EndCall,
}

impl Operation {
    /// Service the operation is sent to
    pub fn service(&self) -> Service {
        match self {
            Operation::BeginFlow | Operation::AdvanceFlow | Operation::DiscardContext => {
                Service::FlowState
            }
            Operation::Synthesize => Service::SpeechSynthesis,
            Operation::ArmRecognition => Service::SpeechRecognition,
            Operation::TransferCall | Operation::EndCall => Service::TelephonyControl,
        }
    }

    fn name(&self) -> &'static str {
        match self {
            Operation::BeginFlow => "begin_flow",
            Operation::AdvanceFlow => "advance_flow",
            Operation::DiscardContext => "discard_context",
            Operation::Synthesize => "synthesize",
            Operation::ArmRecognition => "arm_recognition",
            Operation::TransferCall => "transfer_call",
            Operation::EndCall => "end_call",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.service(), self.name())
    }
}

/// Failure of one call to an external service
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GatewayError {
    /// No response within the bounded timeout
    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    /// Connection or protocol failure
    #[error("transport error: {0}")]
    Transport(String),

    /// Non-success HTTP status
    #[error("unexpected status {status}: {body}")]
    Status {
        /// HTTP status code
        status: u16,
        /// Response body, possibly truncated
        body: String,
    },

    /// Credentials rejected
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// Response body did not match the contract
    #[error("failed to decode response: {0}")]
    Decode(String),
}

impl GatewayError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, GatewayError::Timeout(_))
    }
}

impl From<serde_json::Error> for GatewayError {
    fn from(err: serde_json::Error) -> Self {
        GatewayError::Decode(err.to_string())
    }
}

/// Errors surfaced by the orchestrator's public entry points
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum OrchestratorError {
    /// `start` for a call that already has a session
    #[error("session already exists for call {call_id}")]
    DuplicateSession { call_id: CallId },

    /// No session for the call; not retryable
    #[error("no session for call {call_id}")]
    SessionNotFound { call_id: CallId },

    /// The call is playing its final prompt and will hang up shortly
    #[error("session for call {call_id} is ending")]
    SessionClosing { call_id: CallId },

    /// An external service failed in a way the call cannot absorb
    #[error("{operation} failed for call {call_id}: {source}")]
    Gateway {
        call_id: CallId,
        operation: Operation,
        /// Node being left or entered when the failure happened
        node_kind: Option<NodeKind>,
        #[source]
        source: GatewayError,
    },

    /// The Flow State Service returned a node kind with no handler
    #[error("unsupported node kind '{node_kind}' for call {call_id}")]
    UnsupportedNode { call_id: CallId, node_kind: String },
}

impl OrchestratorError {
    pub fn gateway(
        call_id: &CallId,
        operation: Operation,
        node_kind: Option<NodeKind>,
        source: GatewayError,
    ) -> Self {
        OrchestratorError::Gateway {
            call_id: call_id.clone(),
            operation,
            node_kind,
            source,
        }
    }

    /// Call the error refers to
    pub fn call_id(&self) -> &CallId {
        match self {
            OrchestratorError::DuplicateSession { call_id }
            | OrchestratorError::SessionNotFound { call_id }
            | OrchestratorError::SessionClosing { call_id }
            | OrchestratorError::Gateway { call_id, .. }
            | OrchestratorError::UnsupportedNode { call_id, .. } => call_id,
        }
    }

    /// Failing service, for gateway failures
    pub fn service(&self) -> Option<Service> {
        match self {
            OrchestratorError::Gateway { operation, .. } => Some(operation.service()),
            _ => None,
        }
    }

    /// Failing operation, for gateway failures
    pub fn operation(&self) -> Option<Operation> {
        match self {
            OrchestratorError::Gateway { operation, .. } => Some(*operation),
            _ => None,
        }
    }

    /// Whether the session survived, so the caller may retry `continue`
    pub fn is_retryable(&self) -> bool {
        match self {
            OrchestratorError::Gateway { operation, .. } => *operation != Operation::BeginFlow,
            OrchestratorError::UnsupportedNode { .. } => true,
            OrchestratorError::DuplicateSession { .. }
            | OrchestratorError::SessionNotFound { .. }
            | OrchestratorError::SessionClosing { .. } => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operation_display_names_service() {
        assert_eq!(Operation::BeginFlow.to_string(), "flow_state.begin_flow");
        assert_eq!(Operation::ArmRecognition.to_string(), "speech_recognition.arm_recognition");
        assert_eq!(Operation::EndCall.service(), Service::TelephonyControl);
    }

    #[test]
    fn test_gateway_error_carries_context() {
        let err = OrchestratorError::gateway(
            &CallId::from("call-9"),
            Operation::TransferCall,
            Some(NodeKind::Transfer),
            GatewayError::Status {
                status: 503,
                body: "busy".to_string(),
            },
        );

        assert_eq!(err.call_id(), &CallId::from("call-9"));
        assert_eq!(err.service(), Some(Service::TelephonyControl));
        assert_eq!(err.operation(), Some(Operation::TransferCall));
        assert!(err.is_retryable());
        assert_eq!(
            err.to_string(),
            "telephony_control.transfer_call failed for call call-9: unexpected status 503: busy"
        );
    }

    #[test]
    fn test_retryability() {
        let call_id = CallId::from("c");
        assert!(!OrchestratorError::SessionNotFound { call_id: call_id.clone() }.is_retryable());
        assert!(!OrchestratorError::DuplicateSession { call_id: call_id.clone() }.is_retryable());
        assert!(!OrchestratorError::gateway(
            &call_id,
            Operation::BeginFlow,
            None,
            GatewayError::Timeout(Duration::from_secs(1)),
        )
        .is_retryable());
    }

    #[test]
    fn test_from_serde_json_error() {
        let json_error = serde_json::from_str::<serde_json::Value>("invalid json").unwrap_err();
        let error: GatewayError = json_error.into();
        assert!(matches!(error, GatewayError::Decode(msg) if msg.contains("expected value")));
    }
}
