//! Bus factory for runtime transport selection

use std::sync::Arc;

use serde::Deserialize;

use crate::domain::cache::InvalidationBus;
use crate::domain::DomainError;

use super::broadcast::BroadcastHub;
use super::local::LocalInvalidationBus;
use super::redis::{RedisBusConfig, RedisInvalidationBus};
use super::DEFAULT_CHANNEL;

/// Supported bus transports
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BusBackend {
    /// No peers, publishing is a no-op
    #[default]
    Local,
    /// In-process hub shared by nodes of the same process
    Broadcast,
    /// Redis pub/sub
    Redis,
}

impl BusBackend {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "local" | "none" => Some(Self::Local),
            "broadcast" | "in_process" | "in-process" => Some(Self::Broadcast),
            "redis" => Some(Self::Redis),
            _ => None,
        }
    }
}

/// Bus section of the application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct BusConfig {
    #[serde(default)]
    pub backend: BusBackend,
    #[serde(default)]
    pub redis_url: Option<String>,
    #[serde(default = "default_channel")]
    pub channel: String,
    #[serde(default = "default_broadcast_capacity")]
    pub broadcast_capacity: usize,
}

fn default_channel() -> String {
    DEFAULT_CHANNEL.to_string()
}

fn default_broadcast_capacity() -> usize {
    1024
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            backend: BusBackend::default(),
            redis_url: None,
            channel: default_channel(),
            broadcast_capacity: default_broadcast_capacity(),
        }
    }
}

/// Factory for creating invalidation buses
#[derive(Debug)]
pub struct BusFactory;

impl BusFactory {
    /// Creates the bus described by `config` for the node `node_id`
    ///
    /// The broadcast backend gets a private hub; nodes that should see each
    /// other must join a shared [`BroadcastHub`] directly.
    pub async fn create(
        config: &BusConfig,
        node_id: &str,
    ) -> Result<Arc<dyn InvalidationBus>, DomainError> {
        match config.backend {
            BusBackend::Local => Ok(Arc::new(LocalInvalidationBus::new(node_id))),
            BusBackend::Broadcast => {
                let hub = BroadcastHub::new(config.broadcast_capacity);
                Ok(Arc::new(hub.join(node_id)))
            }
            BusBackend::Redis => {
                let url = config.redis_url.as_deref().ok_or_else(|| {
                    DomainError::configuration("bus.redis_url is required for the redis backend")
                })?;
                let redis_config = RedisBusConfig::new(url).with_channel(config.channel.clone());
                let bus = RedisInvalidationBus::connect(redis_config, node_id).await?;
                Ok(Arc::new(bus))
            }
        }
    }
}
