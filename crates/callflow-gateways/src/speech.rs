//! Speech synthesis and recognition clients.

use async_trait::async_trait;
use callflow_core::{
    GatewayError, RecognitionRequest, SpeechRecognitionService, SpeechSynthesisService,
    SynthesisRequest,
};
use tracing::instrument;

use crate::http::HttpClient;

/// HTTP client for the speech synthesis service
#[derive(Debug, Clone)]
pub struct SpeechSynthesisClient {
    http: HttpClient,
}

impl SpeechSynthesisClient {
    pub fn new(http: HttpClient) -> Self {
        Self { http }
    }
}

#[async_trait]
impl SpeechSynthesisService for SpeechSynthesisClient {
    #[instrument(skip(self, request), fields(call_id = %request.call_id, voice_id = %request.voice_id))]
    async fn synthesize(&self, request: &SynthesisRequest) -> Result<(), GatewayError> {
        self.http.post_ack(&["synthesize"], request).await
    }
}

/// HTTP client for the speech recognition service
#[derive(Debug, Clone)]
pub struct SpeechRecognitionClient {
    http: HttpClient,
}

impl SpeechRecognitionClient {
    pub fn new(http: HttpClient) -> Self {
        Self { http }
    }
}

#[async_trait]
impl SpeechRecognitionService for SpeechRecognitionClient {
    #[instrument(skip(self, request), fields(call_id = %request.call_id, language = %request.language))]
    async fn arm_recognition(&self, request: &RecognitionRequest) -> Result<(), GatewayError> {
        self.http.post_ack(&["recognition", "arm"], request).await
    }
}
