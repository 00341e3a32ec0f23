//! API module for the callflow server
//!
//! Routes through which the telephony layer drives calls.

use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

pub mod calls;
pub mod errors;
pub mod health;

use crate::server::CallflowServer;

/// Build the router for API endpoints
pub fn build_router(server: Arc<CallflowServer>) -> Router {
    Router::new()
        // Call lifecycle
        .route("/v1/calls", post(calls::start_call).get(calls::list_calls))
        .route(
            "/v1/calls/:call_id",
            get(calls::get_call).delete(calls::end_call),
        )
        .route("/v1/calls/:call_id/transcript", post(calls::submit_transcript))
        .route("/v1/calls/:call_id/continue", post(calls::continue_call))
        .route("/v1/calls/:call_id/hangup", post(calls::hangup_call))
        // Health check
        .route("/health", get(health::health_check))
        .layer(TraceLayer::new_for_http())
        // Shared state
        .with_state(server)
}
