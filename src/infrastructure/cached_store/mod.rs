//! Cached entity stores - read-through wrappers for each cached entity kind

mod store;

use std::sync::Arc;

use crate::domain::{EntityStore, NotificationRegistry, Role, UserAccessToken};
use crate::infrastructure::cache::CacheCoordinator;

pub use store::CachedEntityStore;

pub type CachedRoleStore = CachedEntityStore<Role>;
pub type CachedAccessTokenStore = CachedEntityStore<UserAccessToken>;
pub type CachedNotificationRegistryStore = CachedEntityStore<NotificationRegistry>;

/// The cached stores of one node, sharing a single coordinator
#[derive(Debug, Clone)]
pub struct CachedStores {
    pub roles: Arc<CachedRoleStore>,
    pub access_tokens: Arc<CachedAccessTokenStore>,
    pub notification_registries: Arc<CachedNotificationRegistryStore>,
}

impl CachedStores {
    pub fn new(
        coordinator: Arc<CacheCoordinator>,
        roles: Arc<dyn EntityStore<Role>>,
        access_tokens: Arc<dyn EntityStore<UserAccessToken>>,
        notification_registries: Arc<dyn EntityStore<NotificationRegistry>>,
    ) -> Self {
        Self {
            roles: Arc::new(CachedEntityStore::new(roles, Arc::clone(&coordinator))),
            access_tokens: Arc::new(CachedEntityStore::new(
                access_tokens,
                Arc::clone(&coordinator),
            )),
            notification_registries: Arc::new(CachedEntityStore::new(
                notification_registries,
                coordinator,
            )),
        }
    }
}
