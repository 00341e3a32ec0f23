//! Testing utilities for the callflow orchestrator.
//!
//! This crate provides recording fakes and `mockall` mocks of the gateway
//! traits, plus a harness that wires an orchestrator to the fakes.

pub mod builders;
pub mod implementations;
pub mod mocks;
pub mod util;

/// Re-export commonly used types for convenience
pub use mockall;

pub use builders::{settle, HarnessBuilder, OrchestratorHarness};
pub use implementations::RecordingGateways;
pub use util::init_test_tracing;
