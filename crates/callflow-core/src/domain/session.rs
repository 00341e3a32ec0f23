//! Per-call session record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::continuation::{ContinuationPurpose, ContinuationTicket, ContinuationTimer};
use super::flow_state::NodeKind;

/// Value object: telephony call identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CallId(pub String);

/// Value object: flow definition identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FlowId(pub String);

impl CallId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CallId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Display for FlowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for CallId {
    fn from(value: &str) -> Self {
        CallId(value.to_string())
    }
}

impl From<&str> for FlowId {
    fn from(value: &str) -> Self {
        FlowId(value.to_string())
    }
}

/// Synthesis quality tier
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VoiceTier {
    #[default]
    Standard,
    Premium,
}

/// Synthesis configuration chosen at call start
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoiceSettings {
    #[serde(alias = "voice")]
    pub voice_id: String,
    #[serde(default)]
    pub tier: VoiceTier,
}

impl VoiceSettings {
    pub fn new(voice_id: impl Into<String>) -> Self {
        Self {
            voice_id: voice_id.into(),
            tier: VoiceTier::Standard,
        }
    }

    pub fn premium(mut self) -> Self {
        self.tier = VoiceTier::Premium;
        self
    }
}

impl Default for VoiceSettings {
    fn default() -> Self {
        Self::new("default")
    }
}

/// Runtime record of one live call's progress through a flow
#[derive(Debug)]
pub struct Session {
    pub call_id: CallId,
    pub flow_id: FlowId,
    pub caller_address: String,
    pub started_at: DateTime<Utc>,
    pub last_updated_at: DateTime<Utc>,
    pub current_node_kind: Option<NodeKind>,
    voice_settings: VoiceSettings,
    epoch: u64,
    pending: Option<ContinuationTimer>,
    closing: bool,
    closed: bool,
}

impl Session {
    /// Create a session that has not dispatched anything yet
    pub fn new(
        call_id: CallId,
        flow_id: FlowId,
        caller_address: impl Into<String>,
        voice_settings: VoiceSettings,
        started_at: DateTime<Utc>,
    ) -> Self {
        Self {
            call_id,
            flow_id,
            caller_address: caller_address.into(),
            started_at,
            last_updated_at: started_at,
            current_node_kind: None,
            voice_settings,
            epoch: 0,
            pending: None,
            closing: false,
            closed: false,
        }
    }

    /// Voice snapshot taken at call start
    pub fn voice_settings(&self) -> &VoiceSettings {
        &self.voice_settings
    }

    /// Number of dispatches so far
    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// Note that `node_kind` is about to be dispatched
    pub fn record_dispatch(&mut self, node_kind: &NodeKind) {
        self.current_node_kind = Some(node_kind.clone());
        self.epoch += 1;
        self.touch();
    }

    /// Bump `last_updated_at`
    pub fn touch(&mut self) {
        self.last_updated_at = Utc::now();
    }

    /// Ticket for a timer armed by the current dispatch
    pub fn ticket(&self, purpose: ContinuationPurpose) -> Option<ContinuationTicket> {
        let node_kind = self.current_node_kind.clone()?;
        Some(ContinuationTicket {
            call_id: self.call_id.clone(),
            node_kind,
            epoch: self.epoch,
            purpose,
        })
    }

    /// Whether a fired timer still belongs to this session's current node
    pub fn accepts(&self, ticket: &ContinuationTicket) -> bool {
        !self.closed
            && ticket.call_id == self.call_id
            && ticket.epoch == self.epoch
            && self.current_node_kind.as_ref() == Some(&ticket.node_kind)
    }

    /// Install a timer, cancelling any previous one
    pub fn arm(&mut self, timer: ContinuationTimer) -> bool {
        let replaced = self.cancel_pending();
        self.pending = Some(timer);
        replaced
    }

    /// Cancel the pending timer, returning whether there was one
    pub fn cancel_pending(&mut self) -> bool {
        match self.pending.take() {
            Some(timer) => {
                timer.cancel();
                true
            }
            None => false,
        }
    }

    /// Detach the timer that is firing right now
    pub fn take_fired(&mut self) -> Option<ContinuationTimer> {
        self.pending.take()
    }

    /// Pending timer, if any
    pub fn pending(&self) -> Option<&ContinuationTimer> {
        self.pending.as_ref()
    }

    /// An End node has scheduled the hang-up
    pub fn mark_closing(&mut self) {
        self.closing = true;
    }

    pub fn is_closing(&self) -> bool {
        self.closing
    }

    /// Cleanup has run; the record must not be advanced again
    pub fn mark_closed(&mut self) {
        self.closed = true;
        self.cancel_pending();
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Read-only copy for diagnostics
    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            call_id: self.call_id.clone(),
            flow_id: self.flow_id.clone(),
            caller_address: self.caller_address.clone(),
            started_at: self.started_at,
            last_updated_at: self.last_updated_at,
            current_node_kind: self.current_node_kind.clone(),
            voice_settings: self.voice_settings.clone(),
            pending_continuation: self.pending.as_ref().map(|timer| PendingContinuation {
                node_kind: timer.ticket().node_kind.clone(),
                purpose: timer.ticket().purpose,
                due_at: timer.due_at(),
            }),
            closing: self.closing,
        }
    }
}

/// Diagnostic view of a pending timer
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingContinuation {
    pub node_kind: NodeKind,
    pub purpose: ContinuationPurpose,
    pub due_at: DateTime<Utc>,
}

/// Diagnostic view of a session
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub call_id: CallId,
    pub flow_id: FlowId,
    pub caller_address: String,
    pub started_at: DateTime<Utc>,
    pub last_updated_at: DateTime<Utc>,
    pub current_node_kind: Option<NodeKind>,
    pub voice_settings: VoiceSettings,
    pub pending_continuation: Option<PendingContinuation>,
    pub closing: bool,
}
