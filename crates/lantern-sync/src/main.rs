use anyhow::Context;
use lantern_sync::{BeaconApiClient, SyncConfig, SyncDriver};
use std::path::Path;
use std::time::Duration;
use tokio::sync::watch;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = match std::env::args().nth(1) {
        Some(path) => SyncConfig::load(Path::new(&path))?,
        None => SyncConfig::default(),
    };

    let api = BeaconApiClient::new(
        &config.beacon_endpoint,
        Duration::from_secs(config.request_timeout_secs),
    )?;

    let mut driver = SyncDriver::bootstrap(api, config)
        .await
        .context("bootstrap failed")?;
    driver.catch_up().await.context("historical catch-up failed")?;

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        let _ = tokio::signal::ctrl_c().await;
        info!("ctrl-c received, shutting down");
        let _ = shutdown_tx.send(true);
    });

    driver.run(shutdown_rx).await?;
    Ok(())
}
