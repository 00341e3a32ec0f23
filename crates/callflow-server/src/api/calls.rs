//! Call lifecycle endpoints driven by the telephony layer.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use callflow_core::{
    Advance, CallId, Continuation, FlowId, NextAction, NodeKind, NonFatal, SessionSnapshot,
    VoiceSettings,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

use super::errors::ApiError;
use crate::server::CallflowServer;

/// Body of `POST /v1/calls`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartCallRequest {
    pub call_id: String,
    pub flow_id: String,
    #[serde(default)]
    pub caller_address: String,
    #[serde(default)]
    pub voice_settings: Option<VoiceSettings>,
}

/// Body of `POST /v1/calls/:call_id/transcript`
#[derive(Debug, Clone, Deserialize)]
pub struct TranscriptRequest {
    pub transcript: String,
}

/// Outcome of a start or continue
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdvanceResponse {
    pub call_id: CallId,
    pub node_kind: NodeKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_text: Option<String>,
    pub next_action: NextAction,
    /// wait, advance, finish or terminate
    pub continuation: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub continuation_delay_ms: Option<u64>,
    pub non_fatal: Vec<NonFatal>,
}

impl AdvanceResponse {
    fn new(call_id: CallId, advance: Advance) -> Self {
        let (continuation, delay) = match advance.report.continuation {
            Continuation::Wait => ("wait", None),
            Continuation::Advance { after } => ("advance", Some(after)),
            Continuation::Finish { after } => ("finish", Some(after)),
            Continuation::Terminate => ("terminate", None),
        };

        Self {
            call_id,
            node_kind: advance.report.node_kind,
            response_text: advance.flow_state.response_text,
            next_action: advance.flow_state.next_action,
            continuation,
            continuation_delay_ms: delay.map(|d| d.as_millis() as u64),
            non_fatal: advance.report.non_fatal,
        }
    }
}

/// Result of a cleanup request
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EndResponse {
    pub call_id: CallId,
    /// Whether a session was actually removed
    pub ended: bool,
}

/// Listing of active sessions
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionList {
    pub count: usize,
    pub sessions: Vec<SessionSnapshot>,
}

/// `POST /v1/calls`
pub async fn start_call(
    State(server): State<Arc<CallflowServer>>,
    Json(request): Json<StartCallRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if request.call_id.trim().is_empty() || request.flow_id.trim().is_empty() {
        return Err(ApiError::BadRequest(
            "callId and flowId are required".to_string(),
        ));
    }

    let call_id = CallId(request.call_id);
    info!(call_id = %call_id, flow_id = %request.flow_id, "Inbound call");

    let advance = server
        .orchestrator()
        .start(
            call_id.clone(),
            FlowId(request.flow_id),
            request.caller_address,
            request.voice_settings.unwrap_or_default(),
        )
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(AdvanceResponse::new(call_id, advance)),
    ))
}

/// `POST /v1/calls/:call_id/transcript`
pub async fn submit_transcript(
    State(server): State<Arc<CallflowServer>>,
    Path(call_id): Path<String>,
    Json(request): Json<TranscriptRequest>,
) -> Result<Json<AdvanceResponse>, ApiError> {
    let call_id = CallId(call_id);
    let advance = server
        .orchestrator()
        .continue_flow(&call_id, Some(request.transcript))
        .await?;
    Ok(Json(AdvanceResponse::new(call_id, advance)))
}

/// `POST /v1/calls/:call_id/continue`
pub async fn continue_call(
    State(server): State<Arc<CallflowServer>>,
    Path(call_id): Path<String>,
) -> Result<Json<AdvanceResponse>, ApiError> {
    let call_id = CallId(call_id);
    let advance = server.orchestrator().continue_flow(&call_id, None).await?;
    Ok(Json(AdvanceResponse::new(call_id, advance)))
}

/// `POST /v1/calls/:call_id/hangup`
pub async fn hangup_call(
    State(server): State<Arc<CallflowServer>>,
    Path(call_id): Path<String>,
) -> Json<EndResponse> {
    let call_id = CallId(call_id);
    let ended = server.orchestrator().hangup(&call_id).await;
    Json(EndResponse { call_id, ended })
}

/// `DELETE /v1/calls/:call_id`
pub async fn end_call(
    State(server): State<Arc<CallflowServer>>,
    Path(call_id): Path<String>,
) -> Json<EndResponse> {
    let call_id = CallId(call_id);
    let ended = server.orchestrator().end_session(&call_id).await;
    Json(EndResponse { call_id, ended })
}

/// `GET /v1/calls/:call_id`
pub async fn get_call(
    State(server): State<Arc<CallflowServer>>,
    Path(call_id): Path<String>,
) -> Result<Json<SessionSnapshot>, ApiError> {
    let call_id = CallId(call_id);
    server
        .orchestrator()
        .session(&call_id)
        .await
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("no session for call {}", call_id)))
}

/// `GET /v1/calls`
pub async fn list_calls(State(server): State<Arc<CallflowServer>>) -> Json<SessionList> {
    let sessions = server.orchestrator().active_sessions().await;
    Json(SessionList {
        count: sessions.len(),
        sessions,
    })
}
