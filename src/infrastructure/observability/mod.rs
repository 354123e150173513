//! Observability infrastructure - Prometheus metrics for the cache layer

mod config;
mod metrics;

pub use config::MetricsConfig;
pub use metrics::{
    init_metrics, record_bus_publish_failure, record_cache_evictions, record_cache_hit,
    record_cache_invalidation, record_cache_miss, InvalidationOrigin, InvalidationScope,
};
