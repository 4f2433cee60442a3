use anyhow::{Context, Result};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{info, warn};

use poolprice::config::AppConfig;
use poolprice::logging;
use poolprice::service::PriceService;

#[tokio::main]
async fn main() -> Result<()> {
    let config = AppConfig::load().context("Failed to load configuration")?;
    logging::init(&config.logging)?;
    info!(config = %config.digest(), "Starting poolprice");

    let service = Arc::new(PriceService::from_config(&config)?);

    match service.refresh_all().await {
        Ok(stats) => info!(
            tokens = stats.token_count,
            pools = stats.pool_count,
            anchor_pools = stats.anchor_pool_count,
            skipped = stats.skipped_pools,
            "Initial graph built"
        ),
        Err(e) => warn!(error = %e, "Initial graph build failed; starting with an empty graph"),
    }
    service.log_health();

    let (shutdown_tx, shutdown_rx) = mpsc::channel(1);
    let refresh = service.clone().spawn_refresh(shutdown_rx);

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for ctrl-c")?;
    info!("Shutdown requested");

    let _ = shutdown_tx.send(()).await;
    refresh.await.context("Refresh task panicked")?;

    info!("Stopped");
    Ok(())
}
