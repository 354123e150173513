//! Invalidation bus infrastructure - cluster transports for cache invalidations

mod broadcast;
mod factory;
mod local;
mod redis;
mod registry;

pub use broadcast::{BroadcastHub, BroadcastInvalidationBus};
pub use factory::{BusBackend, BusConfig, BusFactory};
pub use local::LocalInvalidationBus;
pub use redis::{RedisBusConfig, RedisInvalidationBus};
pub use registry::SubscriptionRegistry;

/// Pub/sub channel used when none is configured
pub const DEFAULT_CHANNEL: &str = "store_cache:invalidate";
