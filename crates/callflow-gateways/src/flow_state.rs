//! Flow State Service client.

use async_trait::async_trait;
use callflow_core::{
    AdvanceFlowRequest, BeginFlowRequest, CallId, FlowState, FlowStateService, GatewayError,
};
use tracing::{debug, instrument};

use crate::http::HttpClient;

/// HTTP client for the Flow State Service
#[derive(Debug, Clone)]
pub struct FlowStateClient {
    http: HttpClient,
}

impl FlowStateClient {
    pub fn new(http: HttpClient) -> Self {
        Self { http }
    }
}

#[async_trait]
impl FlowStateService for FlowStateClient {
    #[instrument(skip(self, request), fields(call_id = %request.call_id, flow_id = %request.flow_id))]
    async fn begin_flow(&self, request: &BeginFlowRequest) -> Result<FlowState, GatewayError> {
        let state: FlowState = self.http.post_json(&["flows", "begin"], request).await?;
        debug!(node_kind = %state.node_kind, "Flow begun");
        Ok(state)
    }

    #[instrument(skip(self, request), fields(call_id = %request.call_id, flow_id = %request.flow_id))]
    async fn advance_flow(&self, request: &AdvanceFlowRequest) -> Result<FlowState, GatewayError> {
        let state: FlowState = self.http.post_json(&["flows", "advance"], request).await?;
        debug!(node_kind = %state.node_kind, "Flow advanced");
        Ok(state)
    }

    #[instrument(skip(self), fields(call_id = %call_id))]
    async fn discard_context(&self, call_id: &CallId) -> Result<(), GatewayError> {
        self.http
            .delete(&["flows", "context", call_id.as_str()])
            .await
    }
}
