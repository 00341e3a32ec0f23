//! Shared JSON-over-HTTP plumbing for the service clients.

use callflow_core::GatewayError;
use reqwest::{Client, RequestBuilder, Response, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use crate::credentials::CredentialStore;

/// Authenticated HTTP client bound to one service base URL
#[derive(Clone)]
pub struct HttpClient {
    base_url: Url,
    timeout: Duration,
    client: Client,
    credentials: Arc<dyn CredentialStore>,
}

impl std::fmt::Debug for HttpClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpClient")
            .field("base_url", &self.base_url.as_str())
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl HttpClient {
    /// Creates a client for `base_url` with a per-request timeout
    pub fn new(
        base_url: impl AsRef<str>,
        timeout: Duration,
        credentials: Arc<dyn CredentialStore>,
    ) -> Result<Self, GatewayError> {
        let base_url = Url::parse(base_url.as_ref())
            .map_err(|e| GatewayError::Transport(format!("Invalid base URL: {}", e)))?;
        if base_url.cannot_be_a_base() {
            return Err(GatewayError::Transport(format!(
                "Base URL cannot carry a path: {}",
                base_url
            )));
        }

        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| GatewayError::Transport(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            base_url,
            timeout,
            client,
            credentials,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Absolute URL for `segments` appended to the base path
    ///
    /// Each segment is percent-encoded, so an id containing `/`, `?` or `#`
    /// stays a single path segment.
    pub fn url(&self, segments: &[&str]) -> Result<Url, GatewayError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| {
                GatewayError::Transport(format!("Base URL cannot carry a path: {}", self.base_url))
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// POST a JSON body and decode a JSON response
    pub async fn post_json<B, T>(&self, segments: &[&str], body: &B) -> Result<T, GatewayError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let response = self
            .send(self.client.post(self.url(segments)?).json(body))
            .await?;
        response
            .json::<T>()
            .await
            .map_err(|e| GatewayError::Decode(format!("Failed to parse response: {}", e)))
    }

    /// POST without a body
    pub async fn post_empty(&self, segments: &[&str]) -> Result<(), GatewayError> {
        self.send(self.client.post(self.url(segments)?))
            .await
            .map(|_| ())
    }

    /// POST a typed JSON body, ignoring any response body
    pub async fn post_ack<B>(&self, segments: &[&str], body: &B) -> Result<(), GatewayError>
    where
        B: Serialize + ?Sized,
    {
        self.send(self.client.post(self.url(segments)?).json(body))
            .await
            .map(|_| ())
    }

    /// DELETE a resource
    pub async fn delete(&self, segments: &[&str]) -> Result<(), GatewayError> {
        self.send(self.client.delete(self.url(segments)?))
            .await
            .map(|_| ())
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response, GatewayError> {
        let request = match self.credentials.bearer_token() {
            Some(token) => request.bearer_auth(token),
            None => request,
        };

        let response = request.send().await.map_err(|e| self.map_http_error(e))?;
        check_status(response).await
    }

    /// Maps a transport-level error to a GatewayError
    fn map_http_error(&self, error: reqwest::Error) -> GatewayError {
        if error.is_timeout() {
            GatewayError::Timeout(self.timeout)
        } else if error.is_connect() {
            GatewayError::Transport(format!("Connection error: {}", error))
        } else if error.is_decode() {
            GatewayError::Decode(error.to_string())
        } else {
            GatewayError::Transport(format!("HTTP error: {}", error))
        }
    }
}

/// Non-2xx responses are failures; 401/403 are reported as unauthorized
async fn check_status(response: Response) -> Result<Response, GatewayError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response
        .text()
        .await
        .unwrap_or_else(|_| format!("HTTP error: {}", status));
    debug!(status = status.as_u16(), %body, "Service returned an error status");

    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(GatewayError::Unauthorized(body)),
        status => Err(GatewayError::Status {
            status: status.as_u16(),
            body,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credentials::StaticCredentials;

    fn client(base_url: &str) -> HttpClient {
        HttpClient::new(
            base_url,
            Duration::from_secs(1),
            Arc::new(StaticCredentials::anonymous()),
        )
        .unwrap()
    }

    #[test]
    fn test_url_joins_segments_onto_base_path() {
        let root = client("http://flows.local/");
        assert_eq!(
            root.url(&["flows", "begin"]).unwrap().as_str(),
            "http://flows.local/flows/begin"
        );

        let nested = client("http://gateway.local/api/");
        assert_eq!(
            nested.url(&["synthesize"]).unwrap().as_str(),
            "http://gateway.local/api/synthesize"
        );
    }

    #[test]
    fn test_url_encodes_reserved_characters_in_segments() {
        let http = client("http://telephony.local");
        let url = http.url(&["calls", "tenant/abc?x=1#frag", "end"]).unwrap();

        assert_eq!(url.path(), "/calls/tenant%2Fabc%3Fx=1%23frag/end");
        assert_eq!(url.query(), None);
        assert_eq!(url.fragment(), None);
    }

    #[test]
    fn test_invalid_base_url_is_rejected() {
        let err = HttpClient::new(
            "not a url",
            Duration::from_secs(1),
            Arc::new(StaticCredentials::anonymous()),
        )
        .unwrap_err();
        assert!(matches!(err, GatewayError::Transport(msg) if msg.contains("Invalid base URL")));
    }
}
