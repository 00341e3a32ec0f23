//! Bearer credentials attached to every outbound request.

use std::fmt;

/// Source of the bearer token sent to the services
pub trait CredentialStore: Send + Sync {
    /// Token for the `Authorization` header, if one is configured
    fn bearer_token(&self) -> Option<String>;
}

/// A fixed token, typically read once from configuration
#[derive(Clone)]
pub struct StaticCredentials {
    token: Option<String>,
}

impl StaticCredentials {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: Some(token.into()),
        }
    }

    /// No token; requests go out without an `Authorization` header
    pub fn anonymous() -> Self {
        Self { token: None }
    }
}

impl fmt::Debug for StaticCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StaticCredentials")
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl CredentialStore for StaticCredentials {
    fn bearer_token(&self) -> Option<String> {
        self.token.clone()
    }
}
