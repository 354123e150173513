use crate::domain::storage::{StorageEntity, StorageKey};

/// An entity kind served through a named, cluster-coherent cache
pub trait CacheableEntity: StorageEntity + 'static {
    /// Cache name shared by every node in the cluster for this entity kind
    const CACHE_NAME: &'static str;

    /// Cache key for an entity key
    fn cache_key(key: &Self::Key) -> String {
        key.as_str().to_string()
    }
}
