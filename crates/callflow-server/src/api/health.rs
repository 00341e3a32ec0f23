//! Health check endpoint for the callflow server

use axum::{extract::State, Json};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::debug;

use crate::server::CallflowServer;

/// Health check handler
///
/// Liveness only; the downstream services are not probed.
pub async fn health_check(State(server): State<Arc<CallflowServer>>) -> Json<Value> {
    debug!("Health check requested");

    let orchestrator = server.orchestrator();
    Json(json!({
        "status": "UP",
        "version": env!("CARGO_PKG_VERSION"),
        "activeSessions": orchestrator.active_session_count(),
        "metrics": orchestrator.metrics().snapshot(),
    }))
}
