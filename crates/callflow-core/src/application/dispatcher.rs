//! Routes a flow state to the handler for its node kind.

use tracing::{debug, warn};

use crate::application::handlers::NodeHandlers;
use crate::application::report::DispatchReport;
use crate::domain::flow_state::{FlowState, NodeKind};
use crate::domain::session::Session;
use crate::error::OrchestratorError;

/// Exhaustive node-kind router
#[derive(Clone)]
pub struct NodeDispatcher {
    handlers: NodeHandlers,
}

impl NodeDispatcher {
    pub fn new(handlers: NodeHandlers) -> Self {
        Self { handlers }
    }

    pub fn handlers(&self) -> &NodeHandlers {
        &self.handlers
    }

    /// Run the handler for `state.node_kind`
    pub async fn dispatch(
        &self,
        session: &Session,
        state: &FlowState,
    ) -> Result<DispatchReport, OrchestratorError> {
        debug!(
            call_id = %session.call_id,
            node_kind = %state.node_kind,
            next_action = ?state.next_action,
            "Dispatching node"
        );

        match &state.node_kind {
            NodeKind::Say => Ok(self.handlers.say(session, state).await),
            NodeKind::Collect => Ok(self.handlers.collect(session, state).await),
            NodeKind::Decision => Ok(self.handlers.decision(state)),
            NodeKind::Transfer => self.handlers.transfer(session, state).await,
            NodeKind::End => Ok(self.handlers.end(session, state).await),
            NodeKind::Unsupported(kind) => {
                warn!(
                    call_id = %session.call_id,
                    node_kind = %kind,
                    "Unsupported node kind; call left waiting"
                );
                Err(OrchestratorError::UnsupportedNode {
                    call_id: session.call_id.clone(),
                    node_kind: kind.clone(),
                })
            }
        }
    }
}
