//! Entity store trait definition

use std::fmt::Debug;

use async_trait::async_trait;

use crate::domain::DomainError;

use super::entity::StorageEntity;

/// Durable store contract shared by backing stores and their cached wrappers
///
/// Callers cannot tell whether they hold a durable store or a cached one.
#[async_trait]
pub trait EntityStore<E>: Send + Sync + Debug
where
    E: StorageEntity + 'static,
{
    /// Inserts or replaces an entity, assigning a key when the entity has none
    async fn save(&self, entity: E) -> Result<E, DomainError>;

    /// Retrieves an entity by key, failing with `NotFound` when absent
    async fn get_by_key(&self, key: &E::Key) -> Result<E, DomainError>;

    /// Retrieves the subset of `keys` that exist; missing keys are omitted
    async fn get_by_keys(&self, keys: &[E::Key]) -> Result<Vec<E>, DomainError>;

    /// Deletes an entity by key and returns what was removed
    async fn delete(&self, key: &E::Key) -> Result<E, DomainError>;

    /// Permanently removes every entity of this kind
    async fn delete_all(&self) -> Result<(), DomainError>;
}

#[cfg(test)]
pub mod mock {
    use super::*;
    use crate::domain::storage::StorageKey;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Mock entity store that counts calls and can be switched into failure mode
    #[derive(Debug)]
    pub struct MockEntityStore<E>
    where
        E: StorageEntity,
    {
        entities: Mutex<HashMap<String, E>>,
        error: Mutex<Option<String>>,
        get_calls: AtomicUsize,
        batch_calls: AtomicUsize,
        last_batch: Mutex<Vec<String>>,
    }

    impl<E> Default for MockEntityStore<E>
    where
        E: StorageEntity,
    {
        fn default() -> Self {
            Self::new()
        }
    }

    impl<E> MockEntityStore<E>
    where
        E: StorageEntity,
    {
        pub fn new() -> Self {
            Self {
                entities: Mutex::new(HashMap::new()),
                error: Mutex::new(None),
                get_calls: AtomicUsize::new(0),
                batch_calls: AtomicUsize::new(0),
                last_batch: Mutex::new(Vec::new()),
            }
        }

        pub fn with_entity(self, entity: E) -> Self {
            self.put_direct(entity);
            self
        }

        /// Writes straight into the store, bypassing any cache in front of it
        pub fn put_direct(&self, entity: E) {
            self.entities
                .lock()
                .unwrap()
                .insert(entity.key().as_str().to_string(), entity);
        }

        pub fn set_error(&self, error: Option<&str>) {
            *self.error.lock().unwrap() = error.map(str::to_string);
        }

        pub fn get_calls(&self) -> usize {
            self.get_calls.load(Ordering::SeqCst)
        }

        pub fn batch_calls(&self) -> usize {
            self.batch_calls.load(Ordering::SeqCst)
        }

        pub fn last_batch(&self) -> Vec<String> {
            self.last_batch.lock().unwrap().clone()
        }

        pub fn len(&self) -> usize {
            self.entities.lock().unwrap().len()
        }

        fn check_error(&self) -> Result<(), DomainError> {
            if let Some(error) = self.error.lock().unwrap().clone() {
                return Err(DomainError::storage(error));
            }
            Ok(())
        }
    }

    #[async_trait]
    impl<E> EntityStore<E> for MockEntityStore<E>
    where
        E: StorageEntity + 'static,
    {
        async fn save(&self, mut entity: E) -> Result<E, DomainError> {
            self.check_error()?;
            entity.assign_generated_key();
            entity.validate()?;
            self.put_direct(entity.clone());
            Ok(entity)
        }

        async fn get_by_key(&self, key: &E::Key) -> Result<E, DomainError> {
            self.get_calls.fetch_add(1, Ordering::SeqCst);
            self.check_error()?;
            self.entities
                .lock()
                .unwrap()
                .get(key.as_str())
                .cloned()
                .ok_or_else(|| DomainError::not_found(format!("'{}' not found", key.as_str())))
        }

        async fn get_by_keys(&self, keys: &[E::Key]) -> Result<Vec<E>, DomainError> {
            self.batch_calls.fetch_add(1, Ordering::SeqCst);
            *self.last_batch.lock().unwrap() =
                keys.iter().map(|k| k.as_str().to_string()).collect();
            self.check_error()?;

            let entities = self.entities.lock().unwrap();
            Ok(keys
                .iter()
                .filter_map(|k| entities.get(k.as_str()).cloned())
                .collect())
        }

        async fn delete(&self, key: &E::Key) -> Result<E, DomainError> {
            self.check_error()?;
            self.entities
                .lock()
                .unwrap()
                .remove(key.as_str())
                .ok_or_else(|| DomainError::not_found(format!("'{}' not found", key.as_str())))
        }

        async fn delete_all(&self) -> Result<(), DomainError> {
            self.check_error()?;
            self.entities.lock().unwrap().clear();
            Ok(())
        }
    }
}
