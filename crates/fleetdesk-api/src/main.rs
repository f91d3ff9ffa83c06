use fleetdesk_api::setup;
use fleetdesk_api::telemetry::{init_telemetry, LogFormat};
use fleetdesk_core::Config;

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    let config = Config::from_env()?;

    init_telemetry(LogFormat::from_env())
        .map_err(|e| anyhow::anyhow!("Failed to initialize telemetry: {}", e))?;
    tracing::info!(environment = %config.environment, "Configuration loaded");

    let (state, router) = setup::initialize_app(config.clone()).await?;

    setup::server::start_server(&config, state, router).await?;

    Ok(())
}
