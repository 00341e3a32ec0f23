//!
//! Callflow Core - per-call flow execution for live telephony calls
//!
//! This crate walks an authored call flow node by node for each live call.
//! It holds one session per call, dispatches every node the Flow State
//! Service hands back, and drives the speech and telephony services through
//! the gateway traits in [`domain::gateway`].

#![forbid(unsafe_code)]

/// Domain layer - sessions, flow states, timers and gateway contracts
pub mod domain;

/// Application services - handlers, dispatcher and controller
pub mod application;

/// Timing and recognition settings
pub mod config;

/// Error types
pub mod error;

pub use application::orchestrator::{CloseReason, Orchestrator};
pub use application::report::{Advance, Continuation, DispatchReport, NonFatal};
pub use config::OrchestratorConfig;
pub use domain::continuation::{ContinuationPurpose, ContinuationTicket};
pub use domain::flow_state::{FlowState, NextAction, NodeKind};
pub use domain::gateway::{
    AdvanceFlowRequest, BeginFlowRequest, FlowContext, FlowStateService, Gateways,
    RecognitionRequest, SpeechRecognitionService, SpeechSynthesisService, SynthesisRequest,
    TelephonyControlService, TransferRequest,
};
pub use domain::registry::SessionRegistry;
pub use domain::session::{CallId, FlowId, SessionSnapshot, VoiceSettings, VoiceTier};
pub use error::{GatewayError, Operation, OrchestratorError, Service};
