//! Domain layer: session model, flow states, timers and gateway contracts.

pub mod continuation;
pub mod flow_state;
pub mod gateway;
pub mod registry;
pub mod session;
