//! Cache infrastructure - local named caches and their coordinator

mod config;
mod coordinator;
mod local;

pub use config::{NamedCacheConfig, NamedCacheSettings};
pub use coordinator::{CacheCoordinator, FillTicket};
pub use local::{LocalCache, LocalCacheStats};
