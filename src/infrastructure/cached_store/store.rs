//! Read-through, cluster-invalidated wrapper around an entity store

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;

use crate::domain::cache::CacheableEntity;
use crate::domain::storage::{EntityStore, StorageKey};
use crate::domain::DomainError;
use crate::infrastructure::cache::CacheCoordinator;

/// Entity store decorator that serves reads from the named cache of `E`
///
/// Writes go straight to the inner store and, once they succeed, invalidate
/// the affected entries on every node. Values are never written into the
/// cache by a write; the next read refills it from the durable store.
/// Durable-store errors are returned untouched and leave the cache alone.
pub struct CachedEntityStore<E>
where
    E: CacheableEntity,
{
    inner: Arc<dyn EntityStore<E>>,
    coordinator: Arc<CacheCoordinator>,
}

impl<E> fmt::Debug for CachedEntityStore<E>
where
    E: CacheableEntity,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CachedEntityStore")
            .field("cache", &E::CACHE_NAME)
            .field("inner", &self.inner)
            .finish()
    }
}

impl<E> CachedEntityStore<E>
where
    E: CacheableEntity,
{
    pub fn new(inner: Arc<dyn EntityStore<E>>, coordinator: Arc<CacheCoordinator>) -> Self {
        coordinator.register(E::CACHE_NAME);
        Self { inner, coordinator }
    }

    pub fn cache_name(&self) -> &'static str {
        E::CACHE_NAME
    }

    pub fn inner(&self) -> &Arc<dyn EntityStore<E>> {
        &self.inner
    }
}

#[async_trait]
impl<E> EntityStore<E> for CachedEntityStore<E>
where
    E: CacheableEntity,
{
    async fn save(&self, entity: E) -> Result<E, DomainError> {
        // An unset key is assigned by the store, so nothing can be cached under it yet
        let known_key = (!entity.key().is_unset()).then(|| E::cache_key(entity.key()));

        let saved = self.inner.save(entity).await?;

        if let Some(key) = known_key {
            self.coordinator.invalidate(E::CACHE_NAME, &key);
        }

        Ok(saved)
    }

    async fn get_by_key(&self, key: &E::Key) -> Result<E, DomainError> {
        let cache_key = E::cache_key(key);

        if let Some(entity) = self.coordinator.read_through::<E>(E::CACHE_NAME, &cache_key) {
            return Ok(entity);
        }

        let ticket = self.coordinator.begin_fill(E::CACHE_NAME);
        let entity = self.inner.get_by_key(key).await?;
        self.coordinator
            .populate_if_current(&ticket, &cache_key, &entity, None);

        Ok(entity)
    }

    async fn get_by_keys(&self, keys: &[E::Key]) -> Result<Vec<E>, DomainError> {
        let mut seen = HashSet::with_capacity(keys.len());
        let mut found = Vec::with_capacity(keys.len());
        let mut missing = Vec::new();

        for key in keys {
            if !seen.insert(key.as_str()) {
                continue;
            }

            match self
                .coordinator
                .read_through::<E>(E::CACHE_NAME, &E::cache_key(key))
            {
                Some(entity) => found.push(entity),
                None => missing.push(key.clone()),
            }
        }

        if missing.is_empty() {
            return Ok(found);
        }

        tracing::debug!(
            cache = E::CACHE_NAME,
            hits = found.len(),
            misses = missing.len(),
            "batch read-through"
        );

        let ticket = self.coordinator.begin_fill(E::CACHE_NAME);
        let fetched = self.inner.get_by_keys(&missing).await?;

        for entity in &fetched {
            self.coordinator.populate_if_current(
                &ticket,
                &E::cache_key(entity.key()),
                entity,
                None,
            );
        }

        found.extend(fetched);
        Ok(found)
    }

    async fn delete(&self, key: &E::Key) -> Result<E, DomainError> {
        let deleted = self.inner.delete(key).await?;
        self.coordinator
            .invalidate(E::CACHE_NAME, &E::cache_key(deleted.key()));
        Ok(deleted)
    }

    async fn delete_all(&self) -> Result<(), DomainError> {
        self.inner.delete_all().await?;
        self.coordinator.invalidate_all(E::CACHE_NAME);
        Ok(())
    }
}
