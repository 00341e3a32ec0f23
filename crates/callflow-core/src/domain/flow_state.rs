//! Next-step descriptors produced by the Flow State Service.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Behavioral category of a flow node
///
/// Kinds the orchestrator does not know how to run are kept as
/// `Unsupported` with the raw wire value, so dispatch can report them.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum NodeKind {
    /// Speak a prompt
    Say,
    /// Listen for caller speech
    Collect,
    /// Branch resolved by the Flow State Service
    Decision,
    /// Hand the call to a human agent or queue
    Transfer,
    /// Finish the call
    End,
    /// Anything else the Flow State Service returned
    Unsupported(String),
}

impl NodeKind {
    /// Parse a wire value, case-insensitively
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "say" => NodeKind::Say,
            "collect" => NodeKind::Collect,
            "decision" => NodeKind::Decision,
            "transfer" => NodeKind::Transfer,
            "end" => NodeKind::End,
            _ => NodeKind::Unsupported(raw.to_string()),
        }
    }

    /// Wire value of this kind
    pub fn as_str(&self) -> &str {
        match self {
            NodeKind::Say => "say",
            NodeKind::Collect => "collect",
            NodeKind::Decision => "decision",
            NodeKind::Transfer => "transfer",
            NodeKind::End => "end",
            NodeKind::Unsupported(raw) => raw,
        }
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for NodeKind {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for NodeKind {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(NodeKind::parse(&raw))
    }
}

/// What the orchestrator should do once a node's side effect is done
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NextAction {
    /// Advance automatically
    Continue,
    /// Wait for external input; unknown values are treated the same way
    #[default]
    #[serde(other)]
    Wait,
}

/// Descriptor of the node a call should execute next
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlowState {
    /// Node kind to dispatch
    pub node_kind: NodeKind,

    /// Text to speak, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_text: Option<String>,

    /// Continuation hint
    #[serde(default)]
    pub next_action: NextAction,

    /// Transfer nodes only
    #[serde(default)]
    pub transfer_required: bool,

    /// Transfer nodes only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transfer_target: Option<String>,

    /// Data gathered so far, opaque to the orchestrator
    #[serde(default, skip_serializing_if = "serde_json::Value::is_null")]
    pub collected_data: serde_json::Value,
}

impl FlowState {
    /// A bare state of the given kind that waits
    pub fn new(node_kind: NodeKind) -> Self {
        Self {
            node_kind,
            response_text: None,
            next_action: NextAction::Wait,
            transfer_required: false,
            transfer_target: None,
            collected_data: serde_json::Value::Null,
        }
    }

    /// A say node speaking `text`
    pub fn say(text: impl Into<String>) -> Self {
        Self::new(NodeKind::Say).with_text(text)
    }

    /// A collect node
    pub fn collect() -> Self {
        Self::new(NodeKind::Collect)
    }

    /// A decision node
    pub fn decision() -> Self {
        Self::new(NodeKind::Decision)
    }

    /// A transfer node that requires a hand-off to `target`
    pub fn transfer(target: impl Into<String>, collected_data: serde_json::Value) -> Self {
        Self {
            transfer_required: true,
            transfer_target: Some(target.into()),
            collected_data,
            ..Self::new(NodeKind::Transfer)
        }
    }

    /// An end node, optionally speaking a final prompt
    pub fn end(text: Option<&str>) -> Self {
        Self {
            response_text: text.map(str::to_string),
            ..Self::new(NodeKind::End)
        }
    }

    /// Set the text to speak
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.response_text = Some(text.into());
        self
    }

    /// Mark this state as auto-advancing
    pub fn continuing(mut self) -> Self {
        self.next_action = NextAction::Continue;
        self
    }

    /// Whether the node asks for an automatic advance
    pub fn auto_advances(&self) -> bool {
        self.next_action == NextAction::Continue
    }

    /// Text to speak, ignoring empty strings
    pub fn spoken_text(&self) -> Option<&str> {
        self.response_text
            .as_deref()
            .filter(|text| !text.trim().is_empty())
    }
}
