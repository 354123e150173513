//! Serve command - runs a cache node until ctrl-c

use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use crate::config::AppConfig;
use crate::infrastructure::cache::CacheCoordinator;
use crate::infrastructure::{logging, observability};
use crate::CacheLayer;

/// Run a cache node
pub async fn run() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = AppConfig::load()?;
    logging::init_logging(&config.logging)?;
    observability::init_metrics(&config.metrics)?;

    let layer = CacheLayer::from_config(&config).await?;
    info!(
        node_id = %layer.node_id(),
        caches = ?layer.coordinator.cache_names(),
        "Cache node started"
    );

    let sweeper = spawn_sweeper(
        Arc::clone(&layer.coordinator),
        Duration::from_secs(config.node.sweep_interval_secs),
    );

    tokio::signal::ctrl_c().await?;
    info!("Shutdown signal received");

    if let Some(sweeper) = sweeper {
        sweeper.abort();
    }

    for name in layer.coordinator.cache_names() {
        if let Some(stats) = layer.coordinator.stats(&name) {
            info!(
                cache = %stats.name,
                entries = stats.entries,
                capacity = stats.capacity,
                size_bytes = stats.size_bytes,
                "Cache state at shutdown"
            );
        }
    }

    Ok(())
}

fn spawn_sweeper(
    coordinator: Arc<CacheCoordinator>,
    every: Duration,
) -> Option<tokio::task::JoinHandle<()>> {
    if every.is_zero() {
        return None;
    }

    Some(tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        ticker.tick().await;

        loop {
            ticker.tick().await;
            let swept = coordinator.sweep_expired();
            if swept > 0 {
                tracing::debug!(swept, "Swept expired cache entries");
            }
        }
    }))
}
