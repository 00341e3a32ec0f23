//! Test implementations (fakes) of the gateway traits.
//!
//! These record every request and replay scripted responses. Prefer them
//! over the mocks for scenario tests that span several nodes.

pub mod recording_gateways;

pub use recording_gateways::*;
