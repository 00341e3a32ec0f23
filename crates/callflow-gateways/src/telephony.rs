//! Telephony control client.

use async_trait::async_trait;
use callflow_core::{CallId, GatewayError, TelephonyControlService, TransferRequest};
use tracing::{info, instrument};

use crate::http::HttpClient;

/// HTTP client for the telephony control service
#[derive(Debug, Clone)]
pub struct TelephonyClient {
    http: HttpClient,
}

impl TelephonyClient {
    pub fn new(http: HttpClient) -> Self {
        Self { http }
    }
}

#[async_trait]
impl TelephonyControlService for TelephonyClient {
    #[instrument(skip(self, request), fields(call_id = %request.call_id))]
    async fn transfer_call(&self, request: &TransferRequest) -> Result<(), GatewayError> {
        self.http
            .post_ack(&["calls", request.call_id.as_str(), "transfer"], request)
            .await?;
        info!(transfer_target = ?request.transfer_target, "Transfer accepted");
        Ok(())
    }

    #[instrument(skip(self), fields(call_id = %call_id))]
    async fn end_call(&self, call_id: &CallId) -> Result<(), GatewayError> {
        self.http
            .post_empty(&["calls", call_id.as_str(), "end"])
            .await
    }
}
