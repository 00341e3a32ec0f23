use anyhow::{Context, Result};
use callflow_monitoring::MonitoringConfig;
use callflow_server::config::ServerConfig;

#[tokio::main]
async fn main() -> Result<()> {
    // Set up monitoring
    let monitoring_config = MonitoringConfig::from_env("callflow-server");
    callflow_monitoring::init(&monitoring_config).context("Failed to initialize monitoring")?;

    // Load configuration from environment variables
    let config = ServerConfig::load().context("Failed to load configuration")?;

    // Run the server using the library's run function
    callflow_server::run(config).await.context("Server error")?;

    Ok(())
}
