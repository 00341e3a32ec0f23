//!
//! Callflow Server - webhook surface for the flow execution orchestrator
//!
//! The telephony layer reports call events here (new call, transcript,
//! hang-up) and the server forwards them to the orchestrator.

/// API module
pub mod api;

/// Configuration module
pub mod config;

/// Error module
pub mod error;

/// Server module
pub mod server;

// Re-export key types
pub use config::ServerConfig;
pub use error::{ServerError, ServerResult};
pub use server::CallflowServer;

/// Run function
pub async fn run(config: ServerConfig) -> ServerResult<()> {
    let server = CallflowServer::from_config(config)?;
    server.run().await
}
