//! Prometheus metrics infrastructure

use std::net::SocketAddr;

use metrics::{counter, gauge};
use metrics_exporter_prometheus::PrometheusBuilder;

use super::config::MetricsConfig;
use crate::domain::DomainError;

/// Whether an invalidation dropped one key or a whole cache
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvalidationScope {
    Key,
    All,
}

impl InvalidationScope {
    fn as_str(&self) -> &'static str {
        match self {
            Self::Key => "key",
            Self::All => "all",
        }
    }
}

/// Whether an invalidation started on this node or arrived over the bus
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvalidationOrigin {
    Local,
    Remote,
}

impl InvalidationOrigin {
    fn as_str(&self) -> &'static str {
        match self {
            Self::Local => "local",
            Self::Remote => "remote",
        }
    }
}

/// Install the Prometheus recorder and its scrape listener
///
/// Must run inside a Tokio runtime. Returns `Ok(false)` when metrics are disabled.
pub fn init_metrics(config: &MetricsConfig) -> Result<bool, DomainError> {
    if !config.enabled {
        tracing::info!("Prometheus metrics disabled");
        return Ok(false);
    }

    let addr: SocketAddr = config.listen.parse().map_err(|e| {
        DomainError::configuration(format!(
            "Invalid metrics listen address '{}': {}",
            config.listen, e
        ))
    })?;

    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| {
            DomainError::configuration(format!("Failed to install Prometheus exporter: {}", e))
        })?;

    register_default_metrics();
    tracing::info!("Prometheus metrics listening on {}", addr);

    Ok(true)
}

fn register_default_metrics() {
    gauge!("store_cache_info", "version" => env!("CARGO_PKG_VERSION")).set(1.0);
}

pub fn record_cache_hit(cache: &str) {
    counter!("store_cache_hits_total", "cache" => cache.to_string()).increment(1);
}

pub fn record_cache_miss(cache: &str) {
    counter!("store_cache_misses_total", "cache" => cache.to_string()).increment(1);
}

pub fn record_cache_invalidation(
    cache: &str,
    scope: InvalidationScope,
    origin: InvalidationOrigin,
) {
    let labels = [
        ("cache", cache.to_string()),
        ("scope", scope.as_str().to_string()),
        ("origin", origin.as_str().to_string()),
    ];

    counter!("store_cache_invalidations_total", &labels).increment(1);
}

pub fn record_cache_evictions(cache: &str, count: u64) {
    counter!("store_cache_evictions_total", "cache" => cache.to_string()).increment(count);
}

pub fn record_bus_publish_failure(cache: &str) {
    counter!("store_cache_bus_publish_failures_total", "cache" => cache.to_string())
        .increment(1);
}
