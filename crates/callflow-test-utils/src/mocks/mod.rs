//! Mock implementations of the gateway traits.
//!
//! Use these for isolated tests that need exact call expectations.

pub mod gateways;

pub use gateways::*;
