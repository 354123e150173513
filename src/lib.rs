//! PMP Store Cache
//!
//! A cluster-coherent read-through cache layer for entity stores:
//! - Bounded named caches with LRU eviction and TTL expiry
//! - Cross-node invalidation over a pluggable bus (local, in-process, Redis)
//! - Cached store wrappers indistinguishable from the durable stores they wrap

pub mod cli;
pub mod config;
pub mod domain;
pub mod infrastructure;

pub use config::AppConfig;

use std::sync::Arc;

use domain::{
    CacheableEntity, DomainError, InvalidationBus, NotificationRegistry, Role, UserAccessToken,
};
use infrastructure::{
    bus::BusFactory,
    cache::CacheCoordinator,
    cached_store::CachedStores,
    storage::{StorageBackend, StorageFactory},
};
use tracing::info;

/// Every named cache this crate maintains
pub const CACHE_NAMES: [&str; 3] = [
    Role::CACHE_NAME,
    UserAccessToken::CACHE_NAME,
    NotificationRegistry::CACHE_NAME,
];

/// One node's cache layer: bus, coordinator and the cached stores built on them
#[derive(Debug, Clone)]
pub struct CacheLayer {
    pub bus: Arc<dyn InvalidationBus>,
    pub coordinator: Arc<CacheCoordinator>,
    pub stores: CachedStores,
}

impl CacheLayer {
    /// Builds the whole layer from configuration, connecting bus and storage
    pub async fn from_config(config: &AppConfig) -> Result<Self, DomainError> {
        let node_id = config.node.resolved_id();
        let bus = BusFactory::create(&config.bus, &node_id).await?;

        let storage_config = config.storage.to_config()?;
        let backend = StorageFactory::connect(&storage_config).await?;

        info!(
            node_id = %node_id,
            bus = ?config.bus.backend,
            storage = ?storage_config.storage_type(),
            "Building cache layer"
        );

        Self::build(config, bus, &backend).await
    }

    /// Builds the layer on an existing bus and storage backend
    pub async fn build(
        config: &AppConfig,
        bus: Arc<dyn InvalidationBus>,
        backend: &StorageBackend,
    ) -> Result<Self, DomainError> {
        let coordinator = Arc::new(create_coordinator(config, Arc::clone(&bus)));

        let stores = CachedStores::new(
            Arc::clone(&coordinator),
            backend.store::<Role>(Role::CACHE_NAME).await?,
            backend
                .store::<UserAccessToken>(UserAccessToken::CACHE_NAME)
                .await?,
            backend
                .store::<NotificationRegistry>(NotificationRegistry::CACHE_NAME)
                .await?,
        );

        Ok(Self {
            bus,
            coordinator,
            stores,
        })
    }

    pub fn node_id(&self) -> &str {
        self.bus.node_id()
    }
}

/// Creates a coordinator sized from the `caches` configuration section
pub fn create_coordinator(config: &AppConfig, bus: Arc<dyn InvalidationBus>) -> CacheCoordinator {
    let caches = &config.caches;
    let mut coordinator = CacheCoordinator::new(bus).with_defaults(caches.default_config());

    for name in caches.named.keys() {
        coordinator = coordinator.with_cache_config(name.clone(), caches.config_for(name));
    }

    coordinator
}
