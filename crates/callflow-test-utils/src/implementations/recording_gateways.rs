//! Recording in-memory gateways.
//!
//! Each fake records every request it receives so tests can assert on side
//! effects, and can be told to fail or stall to exercise the error paths.

use async_trait::async_trait;
use callflow_core::{
    AdvanceFlowRequest, BeginFlowRequest, CallId, FlowState, FlowStateService, GatewayError,
    Gateways, RecognitionRequest, SpeechRecognitionService, SpeechSynthesisService,
    SynthesisRequest, TelephonyControlService, TransferRequest,
};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;

/// Failure injection shared by the fire-and-forget fakes
#[derive(Debug, Default)]
struct Faults {
    fail_with: Option<GatewayError>,
    fail_next: VecDeque<GatewayError>,
    delay: Option<Duration>,
}

impl Faults {
    async fn apply(this: &Mutex<Faults>) -> Result<(), GatewayError> {
        let (delay, failure) = {
            let mut faults = this.lock();
            let failure = faults.fail_next.pop_front().or_else(|| faults.fail_with.clone());
            (faults.delay, failure)
        };

        if let Some(delay) = delay {
            sleep(delay).await;
        }
        match failure {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }
}

/// Flow State Service fake that replays scripted states
#[derive(Debug, Default)]
pub struct ScriptedFlowStateService {
    begin_script: Mutex<VecDeque<Result<FlowState, GatewayError>>>,
    advance_script: Mutex<VecDeque<Result<FlowState, GatewayError>>>,
    begin_requests: Mutex<Vec<BeginFlowRequest>>,
    advance_requests: Mutex<Vec<AdvanceFlowRequest>>,
    discarded: Mutex<Vec<CallId>>,
    discard_faults: Mutex<Faults>,
    delay: Mutex<Option<Duration>>,
}

impl ScriptedFlowStateService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue the state returned by the next `begin_flow`
    pub fn script_begin(&self, state: FlowState) -> &Self {
        self.begin_script.lock().push_back(Ok(state));
        self
    }

    /// Queue a failure for the next `begin_flow`
    pub fn fail_begin(&self, error: GatewayError) -> &Self {
        self.begin_script.lock().push_back(Err(error));
        self
    }

    /// Queue the state returned by the next `advance_flow`
    pub fn script_advance(&self, state: FlowState) -> &Self {
        self.advance_script.lock().push_back(Ok(state));
        self
    }

    /// Queue a failure for the next `advance_flow`
    pub fn fail_advance(&self, error: GatewayError) -> &Self {
        self.advance_script.lock().push_back(Err(error));
        self
    }

    /// Make `discard_context` fail every time
    pub fn fail_discard(&self, error: GatewayError) -> &Self {
        self.discard_faults.lock().fail_with = Some(error);
        self
    }

    /// Stall `begin_flow` and `advance_flow` before answering
    pub fn stall(&self, delay: Duration) -> &Self {
        *self.delay.lock() = Some(delay);
        self
    }

    pub fn begin_requests(&self) -> Vec<BeginFlowRequest> {
        self.begin_requests.lock().clone()
    }

    pub fn advance_requests(&self) -> Vec<AdvanceFlowRequest> {
        self.advance_requests.lock().clone()
    }

    pub fn discarded(&self) -> Vec<CallId> {
        self.discarded.lock().clone()
    }

    fn next(script: &Mutex<VecDeque<Result<FlowState, GatewayError>>>) -> Result<FlowState, GatewayError> {
        script.lock().pop_front().unwrap_or_else(|| {
            Err(GatewayError::Status {
                status: 500,
                body: "no scripted flow state".to_string(),
            })
        })
    }

    async fn stall_if_asked(&self) {
        let delay = *self.delay.lock();
        if let Some(delay) = delay {
            sleep(delay).await;
        }
    }
}

#[async_trait]
impl FlowStateService for ScriptedFlowStateService {
    async fn begin_flow(&self, request: &BeginFlowRequest) -> Result<FlowState, GatewayError> {
        self.begin_requests.lock().push(request.clone());
        self.stall_if_asked().await;
        Self::next(&self.begin_script)
    }

    async fn advance_flow(&self, request: &AdvanceFlowRequest) -> Result<FlowState, GatewayError> {
        self.advance_requests.lock().push(request.clone());
        self.stall_if_asked().await;
        Self::next(&self.advance_script)
    }

    async fn discard_context(&self, call_id: &CallId) -> Result<(), GatewayError> {
        self.discarded.lock().push(call_id.clone());
        Faults::apply(&self.discard_faults).await
    }
}

/// Speech synthesis fake
#[derive(Debug, Default)]
pub struct RecordingSynthesisService {
    requests: Mutex<Vec<SynthesisRequest>>,
    faults: Mutex<Faults>,
}

impl RecordingSynthesisService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail every request
    pub fn fail_with(&self, error: GatewayError) -> &Self {
        self.faults.lock().fail_with = Some(error);
        self
    }

    /// Take longer than `delay` to answer
    pub fn stall(&self, delay: Duration) -> &Self {
        self.faults.lock().delay = Some(delay);
        self
    }

    pub fn requests(&self) -> Vec<SynthesisRequest> {
        self.requests.lock().clone()
    }

    pub fn spoken(&self) -> Vec<String> {
        self.requests.lock().iter().map(|r| r.text.clone()).collect()
    }
}

#[async_trait]
impl SpeechSynthesisService for RecordingSynthesisService {
    async fn synthesize(&self, request: &SynthesisRequest) -> Result<(), GatewayError> {
        self.requests.lock().push(request.clone());
        Faults::apply(&self.faults).await
    }
}

/// Speech recognition fake
#[derive(Debug, Default)]
pub struct RecordingRecognitionService {
    requests: Mutex<Vec<RecognitionRequest>>,
    faults: Mutex<Faults>,
}

impl RecordingRecognitionService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_with(&self, error: GatewayError) -> &Self {
        self.faults.lock().fail_with = Some(error);
        self
    }

    pub fn stall(&self, delay: Duration) -> &Self {
        self.faults.lock().delay = Some(delay);
        self
    }

    pub fn requests(&self) -> Vec<RecognitionRequest> {
        self.requests.lock().clone()
    }
}

#[async_trait]
impl SpeechRecognitionService for RecordingRecognitionService {
    async fn arm_recognition(&self, request: &RecognitionRequest) -> Result<(), GatewayError> {
        self.requests.lock().push(request.clone());
        Faults::apply(&self.faults).await
    }
}

/// Telephony control fake
#[derive(Debug, Default)]
pub struct RecordingTelephonyService {
    transfers: Mutex<Vec<TransferRequest>>,
    ended: Mutex<Vec<CallId>>,
    transfer_faults: Mutex<Faults>,
    end_faults: Mutex<Faults>,
}

impl RecordingTelephonyService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail only the next transfer
    pub fn fail_next_transfer(&self, error: GatewayError) -> &Self {
        self.transfer_faults.lock().fail_next.push_back(error);
        self
    }

    /// Fail every end-call request
    pub fn fail_end_call(&self, error: GatewayError) -> &Self {
        self.end_faults.lock().fail_with = Some(error);
        self
    }

    pub fn transfers(&self) -> Vec<TransferRequest> {
        self.transfers.lock().clone()
    }

    pub fn ended(&self) -> Vec<CallId> {
        self.ended.lock().clone()
    }
}

#[async_trait]
impl TelephonyControlService for RecordingTelephonyService {
    async fn transfer_call(&self, request: &TransferRequest) -> Result<(), GatewayError> {
        self.transfers.lock().push(request.clone());
        Faults::apply(&self.transfer_faults).await
    }

    async fn end_call(&self, call_id: &CallId) -> Result<(), GatewayError> {
        self.ended.lock().push(call_id.clone());
        Faults::apply(&self.end_faults).await
    }
}

/// All four fakes, with handles kept for assertions
#[derive(Debug, Clone, Default)]
pub struct RecordingGateways {
    pub flow_state: Arc<ScriptedFlowStateService>,
    pub synthesis: Arc<RecordingSynthesisService>,
    pub recognition: Arc<RecordingRecognitionService>,
    pub telephony: Arc<RecordingTelephonyService>,
}

impl RecordingGateways {
    pub fn new() -> Self {
        Self::default()
    }

    /// Trait-object bundle to hand to the orchestrator
    pub fn gateways(&self) -> Gateways {
        Gateways::new(
            self.flow_state.clone(),
            self.synthesis.clone(),
            self.recognition.clone(),
            self.telephony.clone(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use callflow_core::FlowId;

    #[tokio::test]
    async fn test_scripted_states_replay_in_order() {
        let fake = ScriptedFlowStateService::new();
        fake.script_advance(FlowState::collect())
            .script_advance(FlowState::end(None));

        let request = AdvanceFlowRequest {
            call_id: CallId::from("call-1"),
            flow_id: FlowId::from("flow-1"),
            external_input: None,
        };

        assert_eq!(fake.advance_flow(&request).await.unwrap(), FlowState::collect());
        assert_eq!(fake.advance_flow(&request).await.unwrap(), FlowState::end(None));
        assert!(fake.advance_flow(&request).await.is_err());
        assert_eq!(fake.advance_requests().len(), 3);
    }

    #[tokio::test]
    async fn test_fail_next_transfer_fails_once() {
        let fake = RecordingTelephonyService::new();
        fake.fail_next_transfer(GatewayError::Transport("busy".to_string()));

        let request = TransferRequest {
            call_id: CallId::from("call-1"),
            transfer_target: Some("+15550000000".to_string()),
            context: serde_json::Value::Null,
        };

        assert!(fake.transfer_call(&request).await.is_err());
        assert!(fake.transfer_call(&request).await.is_ok());
        assert_eq!(fake.transfers().len(), 2);
    }
}
