//! Application layer: node handlers, dispatch and the flow execution controller.

pub mod dispatcher;
pub mod handlers;
pub mod orchestrator;
pub mod report;
