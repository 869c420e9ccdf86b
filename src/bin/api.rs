use memecoin_agent::{api::start_server, config::AgentConfig, Dispatcher};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // Load environment variables
    dotenv::dotenv().ok();

    let config = AgentConfig::from_env()?;

    if config.llm.api_key.is_empty() {
        warn!("ASI1_API_KEY not set - every command will fail until it is configured");
    }

    info!("Memecoin Command Agent - API Server");
    info!("Port: {}", config.api_port);

    let dispatcher = Arc::new(Dispatcher::from_config(&config)?);

    info!("Dispatcher initialized");

    start_server(dispatcher, config.api_port).await?;

    Ok(())
}
