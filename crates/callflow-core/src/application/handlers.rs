//! Node handlers: the side effect and continuation policy of each node kind.
//!
//! Handlers never touch the registry or timers. They perform the node's
//! side effects through the gateways and return a [`DispatchReport`]; the
//! orchestrator applies the continuation it names.

use callflow_monitoring::OrchestratorMetrics;
use std::sync::Arc;
use tracing::{debug, info};

use crate::application::report::{best_effort, Continuation, DispatchReport, NonFatal};
use crate::config::OrchestratorConfig;
use crate::domain::flow_state::{FlowState, NodeKind};
use crate::domain::gateway::{
    with_timeout, Gateways, RecognitionRequest, SynthesisRequest, TransferRequest,
};
use crate::domain::session::Session;
use crate::error::{GatewayError, Operation, OrchestratorError};

/// Side effects for each node kind
#[derive(Clone)]
pub struct NodeHandlers {
    gateways: Gateways,
    config: Arc<OrchestratorConfig>,
    metrics: Arc<OrchestratorMetrics>,
}

impl NodeHandlers {
    pub fn new(
        gateways: Gateways,
        config: Arc<OrchestratorConfig>,
        metrics: Arc<OrchestratorMetrics>,
    ) -> Self {
        Self {
            gateways,
            config,
            metrics,
        }
    }

    /// Play the prompt, then auto-advance after the grace delay if asked to
    pub async fn say(&self, session: &Session, state: &FlowState) -> DispatchReport {
        let continuation = if state.auto_advances() {
            Continuation::Advance {
                after: self.config.say_grace,
            }
        } else {
            Continuation::Wait
        };

        let mut report = DispatchReport::new(NodeKind::Say, continuation);
        report.absorb(self.speak(session, state).await);
        report
    }

    /// Arm recognition and wait for the transcript
    pub async fn collect(&self, session: &Session, _state: &FlowState) -> DispatchReport {
        let request = RecognitionRequest {
            call_id: session.call_id.clone(),
            language: self.config.recognition_language.clone(),
            interim_results: self.config.interim_results,
        };

        let result = with_timeout(
            self.config.gateway_timeout,
            self.gateways.recognition.arm_recognition(&request),
        )
        .await;

        let mut report = DispatchReport::new(NodeKind::Collect, Continuation::Wait);
        report.absorb(self.absorb(session, Operation::ArmRecognition, result));
        report
    }

    /// The branch is already resolved; pause briefly before advancing
    pub fn decision(&self, state: &FlowState) -> DispatchReport {
        let continuation = if state.auto_advances() {
            Continuation::Advance {
                after: self.config.decision_pause,
            }
        } else {
            Continuation::Wait
        };
        DispatchReport::new(NodeKind::Decision, continuation)
    }

    /// Hand the call off; a failed hand-off is fatal and keeps the session
    pub async fn transfer(
        &self,
        session: &Session,
        state: &FlowState,
    ) -> Result<DispatchReport, OrchestratorError> {
        if !state.transfer_required {
            debug!(call_id = %session.call_id, "Transfer not required; waiting");
            return Ok(DispatchReport::new(NodeKind::Transfer, Continuation::Wait));
        }

        let request = TransferRequest {
            call_id: session.call_id.clone(),
            transfer_target: state.transfer_target.clone(),
            context: state.collected_data.clone(),
        };

        with_timeout(
            self.config.gateway_timeout,
            self.gateways.telephony.transfer_call(&request),
        )
        .await
        .map_err(|source| {
            self.metrics.record_fatal(&Operation::TransferCall.to_string());
            OrchestratorError::gateway(
                &session.call_id,
                Operation::TransferCall,
                Some(NodeKind::Transfer),
                source,
            )
        })?;

        info!(
            call_id = %session.call_id,
            transfer_target = ?state.transfer_target,
            "Call transferred"
        );
        Ok(DispatchReport::new(NodeKind::Transfer, Continuation::Terminate))
    }

    /// Play the closing prompt, then hang up after the grace delay
    pub async fn end(&self, session: &Session, state: &FlowState) -> DispatchReport {
        let mut report = DispatchReport::new(
            NodeKind::End,
            Continuation::Finish {
                after: self.config.end_grace,
            },
        );
        report.absorb(self.speak(session, state).await);
        report
    }

    /// Hang up the call, absorbing failure
    pub async fn hang_up(&self, session: &Session) -> Option<NonFatal> {
        let result = with_timeout(
            self.config.gateway_timeout,
            self.gateways.telephony.end_call(&session.call_id),
        )
        .await;
        self.absorb(session, Operation::EndCall, result)
    }

    /// Drop server-side flow context, absorbing failure
    pub async fn discard_context(&self, session: &Session) -> Option<NonFatal> {
        let result = with_timeout(
            self.config.gateway_timeout,
            self.gateways.flow_state.discard_context(&session.call_id),
        )
        .await;
        self.absorb(session, Operation::DiscardContext, result)
    }

    async fn speak(&self, session: &Session, state: &FlowState) -> Option<NonFatal> {
        let Some(text) = state.spoken_text() else {
            debug!(call_id = %session.call_id, node_kind = %state.node_kind, "No text to speak");
            return None;
        };

        let voice = session.voice_settings();
        let request = SynthesisRequest {
            text: text.to_string(),
            voice_id: voice.voice_id.clone(),
            tier: voice.tier,
            call_id: session.call_id.clone(),
        };

        let result = with_timeout(
            self.config.gateway_timeout,
            self.gateways.synthesis.synthesize(&request),
        )
        .await;
        self.absorb(session, Operation::Synthesize, result)
    }

    fn absorb(
        &self,
        session: &Session,
        operation: Operation,
        result: Result<(), GatewayError>,
    ) -> Option<NonFatal> {
        let failure = best_effort(&session.call_id, operation, result);
        if failure.is_some() {
            self.metrics.record_non_fatal(&operation.to_string());
        }
        failure
    }
}
