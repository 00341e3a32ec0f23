//! Error handling for the callflow API
//!
//! Every error is returned as
//! `{"error", "errorDetails": {"errorCode", "errorMessage"}}`. Upstream
//! failures add `service`, `operation` and `nodeKind` to `errorDetails`.

use axum::{http::StatusCode, response::IntoResponse, Json};
use callflow_core::OrchestratorError;
use serde::Serialize;
use serde_json::json;
use tracing::warn;

/// Which external call failed, and at which node
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpstreamFailure {
    pub service: String,
    pub operation: String,
    pub node_kind: Option<String>,
}

/// API Error type for returning standard error responses
#[derive(Debug)]
pub enum ApiError {
    /// Bad request (400)
    BadRequest(String),
    /// Not found (404)
    NotFound(String),
    /// Conflict (409)
    Conflict(String),
    /// Unprocessable entity (422)
    Unprocessable(String),
    /// Upstream service failed (502)
    BadGateway(String, UpstreamFailure),
    /// Upstream service timed out (504)
    GatewayTimeout(String, UpstreamFailure),
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ApiError::BadRequest(msg) => write!(f, "Bad Request: {}", msg),
            ApiError::NotFound(msg) => write!(f, "Not Found: {}", msg),
            ApiError::Conflict(msg) => write!(f, "Conflict: {}", msg),
            ApiError::Unprocessable(msg) => write!(f, "Unprocessable: {}", msg),
            ApiError::BadGateway(msg, _) => write!(f, "Bad Gateway: {}", msg),
            ApiError::GatewayTimeout(msg, _) => write!(f, "Gateway Timeout: {}", msg),
        }
    }
}

impl From<OrchestratorError> for ApiError {
    fn from(err: OrchestratorError) -> Self {
        let message = err.to_string();
        match err {
            OrchestratorError::SessionNotFound { .. } => ApiError::NotFound(message),
            OrchestratorError::DuplicateSession { .. }
            | OrchestratorError::SessionClosing { .. } => ApiError::Conflict(message),
            OrchestratorError::UnsupportedNode { .. } => ApiError::Unprocessable(message),
            OrchestratorError::Gateway {
                operation,
                node_kind,
                source,
                ..
            } => {
                let upstream = UpstreamFailure {
                    service: operation.service().to_string(),
                    operation: operation.to_string(),
                    node_kind: node_kind.map(|kind| kind.as_str().to_string()),
                };
                if source.is_timeout() {
                    ApiError::GatewayTimeout(message, upstream)
                } else {
                    ApiError::BadGateway(message, upstream)
                }
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let (status, error_code, message, upstream) = match &self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "ERR_BAD_REQUEST", msg, None),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "ERR_SESSION_NOT_FOUND", msg, None),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, "ERR_SESSION_CONFLICT", msg, None),
            ApiError::Unprocessable(msg) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "ERR_UNSUPPORTED_NODE",
                msg,
                None,
            ),
            ApiError::BadGateway(msg, upstream) => (
                StatusCode::BAD_GATEWAY,
                "ERR_UPSTREAM_FAILURE",
                msg,
                Some(upstream),
            ),
            ApiError::GatewayTimeout(msg, upstream) => (
                StatusCode::GATEWAY_TIMEOUT,
                "ERR_UPSTREAM_TIMEOUT",
                msg,
                Some(upstream),
            ),
        };

        if status.is_server_error() {
            warn!(status = status.as_u16(), error_code, %message, "Request failed");
        }

        let mut details = json!({
            "errorCode": error_code,
            "errorMessage": message,
        });
        if let (Some(upstream), Some(details)) = (upstream, details.as_object_mut()) {
            details.insert("service".to_string(), json!(upstream.service));
            details.insert("operation".to_string(), json!(upstream.operation));
            details.insert("nodeKind".to_string(), json!(upstream.node_kind));
        }

        let body = Json(json!({
            "error": message,
            "errorDetails": details,
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body;
    use callflow_core::{CallId, GatewayError, NodeKind, Operation};
    use serde_json::Value;
    use std::time::Duration;

    #[test]
    fn test_orchestrator_errors_map_to_status() {
        let call_id = CallId::from("call-1");
        let cases = [
            (
                OrchestratorError::SessionNotFound {
                    call_id: call_id.clone(),
                },
                StatusCode::NOT_FOUND,
            ),
            (
                OrchestratorError::DuplicateSession {
                    call_id: call_id.clone(),
                },
                StatusCode::CONFLICT,
            ),
            (
                OrchestratorError::UnsupportedNode {
                    call_id: call_id.clone(),
                    node_kind: "menu".to_string(),
                },
                StatusCode::UNPROCESSABLE_ENTITY,
            ),
            (
                OrchestratorError::gateway(
                    &call_id,
                    Operation::AdvanceFlow,
                    None,
                    GatewayError::Timeout(Duration::from_secs(10)),
                ),
                StatusCode::GATEWAY_TIMEOUT,
            ),
            (
                OrchestratorError::gateway(
                    &call_id,
                    Operation::TransferCall,
                    None,
                    GatewayError::Transport("reset".to_string()),
                ),
                StatusCode::BAD_GATEWAY,
            ),
        ];

        for (err, expected) in cases {
            let response = ApiError::from(err).into_response();
            assert_eq!(response.status(), expected);
        }
    }

    #[tokio::test]
    async fn test_upstream_failure_names_service_and_node() {
        let err = OrchestratorError::gateway(
            &CallId::from("call-1"),
            Operation::TransferCall,
            Some(NodeKind::Transfer),
            GatewayError::Status {
                status: 503,
                body: "busy".to_string(),
            },
        );

        let response = ApiError::from(err).into_response();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);

        let bytes = body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        let details = &body["errorDetails"];
        assert_eq!(details["errorCode"], "ERR_UPSTREAM_FAILURE");
        assert_eq!(details["service"], "telephony_control");
        assert_eq!(details["operation"], "telephony_control.transfer_call");
        assert_eq!(details["nodeKind"], "transfer");
    }

    #[test]
    fn test_client_errors_carry_no_upstream_fields() {
        let err = OrchestratorError::SessionNotFound {
            call_id: CallId::from("call-1"),
        };
        assert!(matches!(ApiError::from(err), ApiError::NotFound(_)));
    }
}
