//! Error types for the callflow server

use callflow_core::{GatewayError, OrchestratorError};
use thiserror::Error;

/// Server error types
#[derive(Error, Debug)]
pub enum ServerError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Failed to bind or serve
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Gateway construction failed
    #[error("Gateway setup error: {0}")]
    GatewaySetup(#[from] GatewayError),

    /// Orchestrator operation failed
    #[error(transparent)]
    Orchestrator(#[from] OrchestratorError),
}

/// Result type for server operations
pub type ServerResult<T> = Result<T, ServerError>;
