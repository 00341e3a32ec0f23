//! Flow execution controller.
//!
//! `start` and `continue_flow` are the entry points the telephony layer
//! drives. Every operation on a call holds that call's session lock for
//! its whole duration, so a call advances one step at a time.

use callflow_monitoring::OrchestratorMetrics;
use chrono::Utc;
use futures::future::BoxFuture;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use crate::application::dispatcher::NodeDispatcher;
use crate::application::handlers::NodeHandlers;
use crate::application::report::{Advance, Continuation, DispatchReport};
use crate::config::OrchestratorConfig;
use crate::domain::continuation::{ContinuationPurpose, ContinuationTicket, ContinuationTimer};
use crate::domain::flow_state::FlowState;
use crate::domain::gateway::{
    with_timeout, AdvanceFlowRequest, BeginFlowRequest, FlowContext, Gateways,
};
use crate::domain::registry::{SessionCell, SessionRegistry};
use crate::domain::session::{CallId, FlowId, Session, SessionSnapshot, VoiceSettings};
use crate::error::{Operation, OrchestratorError};

/// Why a session was cleaned up
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseReason {
    /// Transfer node handed the call off
    Transferred,
    /// End node finished
    Completed,
    /// Explicit `end_session`
    Ended,
    /// Caller hung up
    HungUp,
    /// Idle past the staleness limit
    Reaped,
}

impl CloseReason {
    fn as_str(&self) -> &'static str {
        match self {
            CloseReason::Transferred => "transferred",
            CloseReason::Completed => "completed",
            CloseReason::Ended => "ended",
            CloseReason::HungUp => "hung_up",
            CloseReason::Reaped => "reaped",
        }
    }
}

/// Drives live calls through their flows
#[derive(Clone)]
pub struct Orchestrator {
    registry: Arc<SessionRegistry>,
    dispatcher: NodeDispatcher,
    gateways: Gateways,
    config: Arc<OrchestratorConfig>,
    metrics: Arc<OrchestratorMetrics>,
}

impl Orchestrator {
    /// Create an orchestrator with its own empty registry
    pub fn new(gateways: Gateways, config: OrchestratorConfig) -> Self {
        Self::with_parts(
            gateways,
            config,
            Arc::new(SessionRegistry::new()),
            Arc::new(OrchestratorMetrics::new()),
        )
    }

    /// Create an orchestrator around an injected registry and counters
    pub fn with_parts(
        gateways: Gateways,
        config: OrchestratorConfig,
        registry: Arc<SessionRegistry>,
        metrics: Arc<OrchestratorMetrics>,
    ) -> Self {
        let config = Arc::new(config);
        let handlers = NodeHandlers::new(gateways.clone(), config.clone(), metrics.clone());

        Self {
            registry,
            dispatcher: NodeDispatcher::new(handlers),
            gateways,
            config,
            metrics,
        }
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    pub fn metrics(&self) -> &Arc<OrchestratorMetrics> {
        &self.metrics
    }

    pub fn registry(&self) -> &Arc<SessionRegistry> {
        &self.registry
    }

    /// Begin executing `flow_id` for a new call
    ///
    /// Fails with `DuplicateSession` and no side effects if the call already
    /// has a session. If the Flow State Service fails, no session is created.
    pub async fn start(
        &self,
        call_id: CallId,
        flow_id: FlowId,
        caller_address: impl Into<String>,
        voice_settings: VoiceSettings,
    ) -> Result<Advance, OrchestratorError> {
        let caller_address = caller_address.into();
        let started_at = Utc::now();
        let cell: SessionCell = Arc::new(Mutex::new(Session::new(
            call_id.clone(),
            flow_id.clone(),
            caller_address.clone(),
            voice_settings.clone(),
            started_at,
        )));

        // Reserve the call id with the cell locked, so a concurrent start is
        // rejected before it reaches the Flow State Service and nothing can
        // advance the call until the first node has been dispatched.
        let mut session = cell.lock().await;
        if !self.registry.insert(call_id.clone(), cell.clone()) {
            warn!(call_id = %call_id, "Start rejected: session already exists");
            return Err(OrchestratorError::DuplicateSession { call_id });
        }

        let request = BeginFlowRequest {
            flow_id: flow_id.clone(),
            call_id: call_id.clone(),
            context: FlowContext {
                caller_address,
                started_at,
                voice_settings,
            },
        };

        let begun = with_timeout(
            self.config.gateway_timeout,
            self.gateways.flow_state.begin_flow(&request),
        )
        .await;
        let flow_state = match begun {
            Ok(flow_state) => flow_state,
            Err(source) => {
                error!(call_id = %call_id, flow_id = %flow_id, error = %source, "Failed to begin flow");
                session.mark_closed();
                self.registry.remove(&call_id, &cell);
                self.metrics.record_fatal(&Operation::BeginFlow.to_string());
                return Err(OrchestratorError::gateway(
                    &call_id,
                    Operation::BeginFlow,
                    None,
                    source,
                ));
            }
        };

        self.metrics.record_session_started(&flow_id.0);
        info!(call_id = %call_id, flow_id = %flow_id, "Session started");

        let report = self.enter(&cell, &mut session, &flow_state).await?;
        Ok(Advance { flow_state, report })
    }

    /// Advance a call with an external input (a transcript), or `None`
    ///
    /// Cancels any pending auto-continuation for the call first.
    pub async fn continue_flow(
        &self,
        call_id: &CallId,
        external_input: Option<String>,
    ) -> Result<Advance, OrchestratorError> {
        let cell = self.cell(call_id)?;
        let mut session = cell.lock().await;

        if session.is_closed() {
            return Err(OrchestratorError::SessionNotFound {
                call_id: call_id.clone(),
            });
        }
        if session.is_closing() {
            debug!(call_id = %call_id, "Continue ignored: call is ending");
            return Err(OrchestratorError::SessionClosing {
                call_id: call_id.clone(),
            });
        }

        if session.cancel_pending() {
            self.metrics.record_continuation_cancelled();
            debug!(call_id = %call_id, "Pending auto-continuation cancelled by external continue");
        }

        self.advance(&cell, &mut session, external_input).await
    }

    /// Clean up a call's session; idempotent
    ///
    /// Returns whether a session was removed.
    pub async fn end_session(&self, call_id: &CallId) -> bool {
        self.close(call_id, CloseReason::Ended).await
    }

    /// The caller hung up: clean up without asking telephony to end the call
    pub async fn hangup(&self, call_id: &CallId) -> bool {
        self.close(call_id, CloseReason::HungUp).await
    }

    /// Snapshot of one session
    pub async fn session(&self, call_id: &CallId) -> Option<SessionSnapshot> {
        let cell = self.registry.get(call_id)?;
        let session = cell.lock().await;
        (!session.is_closed()).then(|| session.snapshot())
    }

    /// Snapshots of all active sessions
    pub async fn active_sessions(&self) -> Vec<SessionSnapshot> {
        let mut snapshots = Vec::with_capacity(self.registry.len());
        for cell in self.registry.cells() {
            let session = cell.lock().await;
            if !session.is_closed() {
                snapshots.push(session.snapshot());
            }
        }
        snapshots
    }

    pub fn active_session_count(&self) -> usize {
        self.registry.len()
    }

    /// End sessions idle for at least `max_idle` with nothing scheduled
    pub async fn reap_stale_sessions(&self, max_idle: Duration) -> Vec<CallId> {
        let max_idle = chrono::Duration::from_std(max_idle).unwrap_or_else(|_| chrono::Duration::days(36_500));
        let now = Utc::now();
        let mut reaped = Vec::new();

        for cell in self.registry.cells() {
            let mut session = cell.lock().await;
            if session.is_closed() || session.pending().is_some() {
                continue;
            }
            if now - session.last_updated_at >= max_idle {
                warn!(
                    call_id = %session.call_id,
                    last_updated_at = %session.last_updated_at,
                    "Reaping stale session"
                );
                let call_id = session.call_id.clone();
                self.close_locked(&cell, &mut session, CloseReason::Reaped).await;
                reaped.push(call_id);
            }
        }

        reaped
    }

    fn cell(&self, call_id: &CallId) -> Result<SessionCell, OrchestratorError> {
        self.registry
            .get(call_id)
            .ok_or_else(|| OrchestratorError::SessionNotFound {
                call_id: call_id.clone(),
            })
    }

    /// Fetch the next state and enter it
    async fn advance(
        &self,
        cell: &SessionCell,
        session: &mut Session,
        external_input: Option<String>,
    ) -> Result<Advance, OrchestratorError> {
        let request = AdvanceFlowRequest {
            call_id: session.call_id.clone(),
            flow_id: session.flow_id.clone(),
            external_input,
        };

        let flow_state = with_timeout(
            self.config.gateway_timeout,
            self.gateways.flow_state.advance_flow(&request),
        )
        .await
        .map_err(|source| {
            error!(call_id = %session.call_id, error = %source, "Failed to advance flow");
            self.metrics.record_fatal(&Operation::AdvanceFlow.to_string());
            OrchestratorError::gateway(
                &session.call_id,
                Operation::AdvanceFlow,
                session.current_node_kind.clone(),
                source,
            )
        })?;

        let report = self.enter(cell, session, &flow_state).await?;
        Ok(Advance { flow_state, report })
    }

    /// Record, dispatch and apply the continuation of one node
    async fn enter(
        &self,
        cell: &SessionCell,
        session: &mut Session,
        flow_state: &FlowState,
    ) -> Result<DispatchReport, OrchestratorError> {
        session.record_dispatch(&flow_state.node_kind);
        let report = self.dispatcher.dispatch(session, flow_state).await?;
        if !report.is_clean() {
            debug!(
                call_id = %session.call_id,
                node_kind = %report.node_kind,
                absorbed = report.non_fatal.len(),
                "Node dispatched with absorbed failures"
            );
        }

        match report.continuation {
            Continuation::Wait => {}
            Continuation::Advance { after } => {
                self.schedule(session, after, ContinuationPurpose::Advance);
            }
            Continuation::Finish { after } => {
                session.mark_closing();
                self.schedule(session, after, ContinuationPurpose::Finish);
            }
            Continuation::Terminate => {
                self.close_locked(cell, session, CloseReason::Transferred).await;
            }
        }

        Ok(report)
    }

    fn schedule(&self, session: &mut Session, after: Duration, purpose: ContinuationPurpose) {
        let Some(ticket) = session.ticket(purpose) else {
            return;
        };

        debug!(
            call_id = %session.call_id,
            node_kind = %ticket.node_kind,
            epoch = ticket.epoch,
            ?purpose,
            delay_ms = after.as_millis() as u64,
            "Scheduling continuation"
        );

        let timer = ContinuationTimer::spawn(ticket.clone(), after, self.fire(ticket));
        session.arm(timer);
        self.metrics.record_continuation_scheduled();
    }

    fn fire(&self, ticket: ContinuationTicket) -> BoxFuture<'static, ()> {
        let orchestrator = self.clone();
        Box::pin(async move { orchestrator.on_timer(ticket).await })
    }

    /// A scheduled continuation came due
    async fn on_timer(&self, ticket: ContinuationTicket) {
        let Some(cell) = self.registry.get(&ticket.call_id) else {
            self.discard(&ticket, "session gone");
            return;
        };

        let mut session = cell.lock().await;
        if !session.accepts(&ticket) {
            self.discard(&ticket, "session moved on");
            return;
        }

        // The timer is done; detach it so it is not cancelled as "pending".
        session.take_fired();
        self.metrics.record_continuation_fired();

        match ticket.purpose {
            ContinuationPurpose::Advance => {
                if let Err(e) = self.advance(&cell, &mut session, None).await {
                    error!(
                        call_id = %ticket.call_id,
                        error = %e,
                        "Automatic continuation failed; call waits for external input"
                    );
                }
            }
            ContinuationPurpose::Finish => {
                self.close_locked(&cell, &mut session, CloseReason::Completed).await;
                if let Some(failure) = self.dispatcher.handlers().hang_up(&session).await {
                    debug!(call_id = %ticket.call_id, %failure, "Hang-up failure ignored");
                }
            }
        }
    }

    fn discard(&self, ticket: &ContinuationTicket, why: &str) {
        self.metrics.record_continuation_discarded();
        debug!(
            call_id = %ticket.call_id,
            node_kind = %ticket.node_kind,
            epoch = ticket.epoch,
            reason = why,
            "Stale continuation discarded"
        );
    }

    async fn close(&self, call_id: &CallId, reason: CloseReason) -> bool {
        let Some(cell) = self.registry.get(call_id) else {
            debug!(call_id = %call_id, "Cleanup for unknown call ignored");
            return false;
        };

        let mut session = cell.lock().await;
        if session.is_closed() {
            return false;
        }
        self.close_locked(&cell, &mut session, reason).await;
        true
    }

    /// Cancel pending work, discard server context, remove from the registry
    async fn close_locked(&self, cell: &SessionCell, session: &mut Session, reason: CloseReason) {
        // Closed first so a timer already waiting on the lock sees a dead session.
        if session.pending().is_some() {
            self.metrics.record_continuation_cancelled();
        }
        session.mark_closed();

        self.dispatcher.handlers().discard_context(session).await;
        self.registry.remove(&session.call_id, cell);

        self.metrics.record_session_ended(reason.as_str());
        info!(
            call_id = %session.call_id,
            flow_id = %session.flow_id,
            reason = reason.as_str(),
            "Session ended"
        );
    }
}
