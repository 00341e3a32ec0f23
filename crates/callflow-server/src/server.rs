//! Server wiring: orchestrator construction, maintenance tasks and serving.

use callflow_core::{Gateways, Orchestrator};
use callflow_gateways::{build_gateways, CredentialStore, StaticCredentials};
use callflow_monitoring::logging::LogExt;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::config::ServerConfig;
use crate::error::{ServerError, ServerResult};

/// The callflow webhook server
#[derive(Clone)]
pub struct CallflowServer {
    config: Arc<ServerConfig>,
    orchestrator: Orchestrator,
}

impl CallflowServer {
    /// Create a server around an existing orchestrator
    pub fn new(config: ServerConfig, orchestrator: Orchestrator) -> Self {
        Self {
            config: Arc::new(config),
            orchestrator,
        }
    }

    /// Create a server with HTTP gateways built from `config`
    pub fn from_config(config: ServerConfig) -> ServerResult<Self> {
        let credentials: Arc<dyn CredentialStore> = match &config.api_token {
            Some(token) => Arc::new(StaticCredentials::new(token.clone())),
            None => Arc::new(StaticCredentials::anonymous()),
        };
        let gateways = build_gateways(&config.gateway_config(), credentials)?;
        Ok(Self::with_gateways(config, gateways))
    }

    /// Create a server with the given gateways
    pub fn with_gateways(config: ServerConfig, gateways: Gateways) -> Self {
        let orchestrator = Orchestrator::new(gateways, config.orchestrator.clone());
        Self::new(config, orchestrator)
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn orchestrator(&self) -> &Orchestrator {
        &self.orchestrator
    }

    /// Run the server until ctrl-c
    pub async fn run(self) -> ServerResult<()> {
        info!("Starting callflow server");

        let app = crate::api::build_router(Arc::new(self.clone()));

        let addr: SocketAddr = format!("{}:{}", self.config.bind_address, self.config.port)
            .parse()
            .map_err(|e| ServerError::ConfigError(format!("Invalid bind address: {}", e)))?;
        let listener = TcpListener::bind(addr).await?;
        info!("Listening on {}", listener.local_addr()?);

        let reaper = self.spawn_reaper();

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await
            .log_warn("Server stopped with an error")?;

        reaper.abort();
        let remaining = self.orchestrator.active_session_count();
        if remaining > 0 {
            warn!(remaining, "Shutting down with active sessions");
        }
        self.orchestrator.metrics().log_summary();
        info!("Server stopped");
        Ok(())
    }

    /// Periodically end stale sessions and log counters
    pub fn spawn_reaper(&self) -> JoinHandle<()> {
        let orchestrator = self.orchestrator.clone();
        let max_idle = self.config.session_max_idle();
        let mut interval = tokio::time::interval(self.config.reaper_interval());

        tokio::spawn(async move {
            // The first tick completes immediately.
            interval.tick().await;
            loop {
                interval.tick().await;
                let reaped = orchestrator.reap_stale_sessions(max_idle).await;
                if !reaped.is_empty() {
                    info!(count = reaped.len(), "Reaped stale sessions");
                }
                orchestrator.metrics().log_summary();
            }
        })
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
