//! Orchestrator wired to recording fakes.

use callflow_core::{
    Advance, CallId, FlowId, FlowState, Orchestrator, OrchestratorConfig, OrchestratorError,
    SessionRegistry, VoiceSettings,
};
use callflow_monitoring::OrchestratorMetrics;
use std::sync::Arc;
use std::time::Duration;

use crate::implementations::RecordingGateways;

/// An orchestrator plus handles to everything it talks to
#[derive(Clone)]
pub struct OrchestratorHarness {
    pub orchestrator: Orchestrator,
    pub fakes: RecordingGateways,
    pub metrics: Arc<OrchestratorMetrics>,
    pub registry: Arc<SessionRegistry>,
}

impl OrchestratorHarness {
    /// Harness with the default timings
    pub fn new() -> Self {
        HarnessBuilder::new().build()
    }

    pub fn builder() -> HarnessBuilder {
        HarnessBuilder::new()
    }

    /// Script the first state and start `call_id` on a fixed test flow
    pub async fn start_with(
        &self,
        call_id: &str,
        first: FlowState,
    ) -> Result<Advance, OrchestratorError> {
        self.fakes.flow_state.script_begin(first);
        self.orchestrator
            .start(
                CallId::from(call_id),
                FlowId::from("flow-42"),
                "+15551234567",
                VoiceSettings::new("voice-1"),
            )
            .await
    }

    /// Let the clock run for `duration`, then let woken tasks finish
    pub async fn advance_time(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
        settle().await;
    }

    pub fn has_session(&self, call_id: &str) -> bool {
        self.registry.contains(&CallId::from(call_id))
    }
}

impl Default for OrchestratorHarness {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for [`OrchestratorHarness`]
#[derive(Default)]
pub struct HarnessBuilder {
    config: Option<OrchestratorConfig>,
    fakes: Option<RecordingGateways>,
}

impl HarnessBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn config(mut self, config: OrchestratorConfig) -> Self {
        self.config = Some(config);
        self
    }

    pub fn gateway_timeout(mut self, timeout: Duration) -> Self {
        let mut config = self.config.take().unwrap_or_default();
        config.gateway_timeout = timeout;
        self.config = Some(config);
        self
    }

    pub fn fakes(mut self, fakes: RecordingGateways) -> Self {
        self.fakes = Some(fakes);
        self
    }

    pub fn build(self) -> OrchestratorHarness {
        let fakes = self.fakes.unwrap_or_default();
        let registry = Arc::new(SessionRegistry::new());
        let metrics = Arc::new(OrchestratorMetrics::new());
        let orchestrator = Orchestrator::with_parts(
            fakes.gateways(),
            self.config.unwrap_or_default(),
            registry.clone(),
            metrics.clone(),
        );

        OrchestratorHarness {
            orchestrator,
            fakes,
            metrics,
            registry,
        }
    }
}

/// Give spawned tasks a chance to run to completion
pub async fn settle() {
    for _ in 0..16 {
        tokio::task::yield_now().await;
    }
}
