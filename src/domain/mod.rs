//! Domain layer - Entities and the contracts the cache layer is built on

pub mod access_token;
pub mod cache;
pub mod error;
pub mod notification_registry;
pub mod role;
pub mod storage;

pub use access_token::{AccessTokenId, UserAccessToken};
pub use cache::{
    CacheEntry, CacheEntryMeta, CacheableEntity, InvalidationBus, InvalidationHandler,
    InvalidationMessage,
};
pub use error::DomainError;
pub use notification_registry::{AckId, NotificationRegistry, NotificationType, SendStatus};
pub use role::{Role, RoleName, RoleValidationError};
pub use storage::{EntityStore, StorageEntity, StorageKey};
