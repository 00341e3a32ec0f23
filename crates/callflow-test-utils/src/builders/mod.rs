//! Builders for orchestrator test setups.

mod harness;

pub use harness::*;
