//! Results of dispatching a node.

use serde::Serialize;
use std::fmt;
use std::time::Duration;
use tracing::warn;

use crate::domain::flow_state::{FlowState, NodeKind};
use crate::domain::session::CallId;
use crate::error::{GatewayError, Operation};

/// Continuation policy chosen by a node handler
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Continuation {
    /// Wait for an external `continue`
    Wait,
    /// Auto-advance after the delay
    Advance { after: Duration },
    /// End the session and hang up after the delay
    Finish { after: Duration },
    /// The call left the orchestrator (transfer succeeded); end the session now
    Terminate,
}

/// A best-effort failure absorbed at the handler boundary
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NonFatal {
    pub operation: Operation,
    pub error: GatewayError,
}

impl fmt::Display for NonFatal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} failed: {}", self.operation, self.error)
    }
}

impl Serialize for NonFatal {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::SerializeStruct;
        let mut state = serializer.serialize_struct("NonFatal", 2)?;
        state.serialize_field("operation", &self.operation.to_string())?;
        state.serialize_field("error", &self.error.to_string())?;
        state.end()
    }
}

/// Turn a best-effort outcome into an optional non-fatal record, logging failures
pub fn best_effort(
    call_id: &CallId,
    operation: Operation,
    result: Result<(), GatewayError>,
) -> Option<NonFatal> {
    match result {
        Ok(()) => None,
        Err(error) => {
            warn!(call_id = %call_id, %operation, %error, "Best-effort operation failed");
            Some(NonFatal { operation, error })
        }
    }
}

/// What happened when one node was dispatched
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchReport {
    pub node_kind: NodeKind,
    pub continuation: Continuation,
    pub non_fatal: Vec<NonFatal>,
}

impl DispatchReport {
    pub fn new(node_kind: NodeKind, continuation: Continuation) -> Self {
        Self {
            node_kind,
            continuation,
            non_fatal: Vec::new(),
        }
    }

    /// Attach an absorbed failure, if there was one
    pub fn absorb(&mut self, failure: Option<NonFatal>) {
        if let Some(failure) = failure {
            self.non_fatal.push(failure);
        }
    }

    pub fn is_clean(&self) -> bool {
        self.non_fatal.is_empty()
    }
}

/// Result of `start` or `continue`: the state dispatched and how it went
#[derive(Debug, Clone, PartialEq)]
pub struct Advance {
    pub flow_state: FlowState,
    pub report: DispatchReport,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_best_effort_records_failure() {
        let call_id = CallId::from("call-1");
        assert!(best_effort(&call_id, Operation::EndCall, Ok(())).is_none());

        let failure = best_effort(
            &call_id,
            Operation::EndCall,
            Err(GatewayError::Transport("reset".to_string())),
        )
        .unwrap();
        assert_eq!(failure.operation, Operation::EndCall);
        assert_eq!(
            failure.to_string(),
            "telephony_control.end_call failed: transport error: reset"
        );
    }

    #[test]
    fn test_report_absorbs_only_failures() {
        let mut report = DispatchReport::new(
            NodeKind::Say,
            Continuation::Advance {
                after: Duration::from_secs(2),
            },
        );
        report.absorb(None);
        assert!(report.is_clean());

        report.absorb(Some(NonFatal {
            operation: Operation::Synthesize,
            error: GatewayError::Timeout(Duration::from_secs(1)),
        }));
        assert_eq!(report.non_fatal.len(), 1);
        assert!(!report.is_clean());
    }
}
