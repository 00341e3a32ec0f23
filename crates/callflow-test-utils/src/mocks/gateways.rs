//! `mockall` mocks for the four gateway traits.

use async_trait::async_trait;
use callflow_core::{
    AdvanceFlowRequest, BeginFlowRequest, CallId, FlowState, FlowStateService, GatewayError,
    Gateways, RecognitionRequest, SpeechRecognitionService, SpeechSynthesisService,
    SynthesisRequest, TelephonyControlService, TransferRequest,
};
use mockall::mock;
use std::sync::Arc;

mock! {
    pub FlowStateService {}

    #[async_trait]
    impl FlowStateService for FlowStateService {
        async fn begin_flow(&self, request: &BeginFlowRequest) -> Result<FlowState, GatewayError>;
        async fn advance_flow(&self, request: &AdvanceFlowRequest) -> Result<FlowState, GatewayError>;
        async fn discard_context(&self, call_id: &CallId) -> Result<(), GatewayError>;
    }
}

mock! {
    pub SpeechSynthesisService {}

    #[async_trait]
    impl SpeechSynthesisService for SpeechSynthesisService {
        async fn synthesize(&self, request: &SynthesisRequest) -> Result<(), GatewayError>;
    }
}

mock! {
    pub SpeechRecognitionService {}

    #[async_trait]
    impl SpeechRecognitionService for SpeechRecognitionService {
        async fn arm_recognition(&self, request: &RecognitionRequest) -> Result<(), GatewayError>;
    }
}

mock! {
    pub TelephonyControlService {}

    #[async_trait]
    impl TelephonyControlService for TelephonyControlService {
        async fn transfer_call(&self, request: &TransferRequest) -> Result<(), GatewayError>;
        async fn end_call(&self, call_id: &CallId) -> Result<(), GatewayError>;
    }
}

/// Mocks that accept any call and succeed, for tests that only care about one service
pub fn permissive_synthesis() -> MockSpeechSynthesisService {
    let mut mock = MockSpeechSynthesisService::new();
    mock.expect_synthesize().returning(|_| Ok(()));
    mock
}

pub fn permissive_recognition() -> MockSpeechRecognitionService {
    let mut mock = MockSpeechRecognitionService::new();
    mock.expect_arm_recognition().returning(|_| Ok(()));
    mock
}

pub fn permissive_telephony() -> MockTelephonyControlService {
    let mut mock = MockTelephonyControlService::new();
    mock.expect_transfer_call().returning(|_| Ok(()));
    mock.expect_end_call().returning(|_| Ok(()));
    mock
}

/// Bundle mocks into a `Gateways`
pub fn mock_gateways(
    flow_state: MockFlowStateService,
    synthesis: MockSpeechSynthesisService,
    recognition: MockSpeechRecognitionService,
    telephony: MockTelephonyControlService,
) -> Gateways {
    Gateways::new(
        Arc::new(flow_state),
        Arc::new(synthesis),
        Arc::new(recognition),
        Arc::new(telephony),
    )
}
