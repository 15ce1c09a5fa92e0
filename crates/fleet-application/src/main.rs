use anyhow::Result;
use fleet_application::FleetRuntime;
use tenancy_shared::config::AppConfig;
use tenancy_shared::telemetry::init_telemetry;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    let config = AppConfig::load()?;
    let _log_guard = init_telemetry(&config.telemetry)?;
    info!(env = %config.app.env, name = %config.app.name, "Starting fleet runtime");

    let runtime = FleetRuntime::connect(&config).await?;
    info!(
        handlers = runtime.dispatcher().registry().len(),
        shards = config.sharding.total_shards,
        "Fleet runtime ready"
    );

    tokio::signal::ctrl_c().await?;
    info!("Shutting down");
    Ok(())
}
