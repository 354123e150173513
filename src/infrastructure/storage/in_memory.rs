//! In-memory entity store implementation

use std::collections::HashMap;
use std::fmt::Debug;
use std::sync::RwLock;

use async_trait::async_trait;

use crate::domain::storage::{EntityStore, StorageEntity, StorageKey};
use crate::domain::DomainError;

/// Thread-safe in-memory entity store
///
/// Useful for testing and development. Data is lost when the process terminates.
#[derive(Debug)]
pub struct InMemoryEntityStore<E>
where
    E: StorageEntity,
{
    entities: RwLock<HashMap<String, E>>,
}

impl<E> Default for InMemoryEntityStore<E>
where
    E: StorageEntity,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<E> InMemoryEntityStore<E>
where
    E: StorageEntity,
{
    /// Creates a new empty in-memory store
    pub fn new() -> Self {
        Self {
            entities: RwLock::new(HashMap::new()),
        }
    }

    /// Creates a store pre-populated with entities
    pub fn with_entities(entities: Vec<E>) -> Self {
        let store = Self::new();
        {
            let mut map = store
                .entities
                .write()
                .unwrap_or_else(|poisoned| poisoned.into_inner());

            for entity in entities {
                map.insert(entity.key().as_str().to_string(), entity);
            }
        }
        store
    }

    pub fn len(&self) -> usize {
        self.entities.read().map(|map| map.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl<E> EntityStore<E> for InMemoryEntityStore<E>
where
    E: StorageEntity + 'static,
{
    async fn save(&self, mut entity: E) -> Result<E, DomainError> {
        entity.assign_generated_key();
        entity.validate()?;

        let key = entity.key().as_str().to_string();
        let mut entities = self.entities.write().map_err(|e| {
            DomainError::storage(format!("Failed to acquire write lock: {}", e))
        })?;

        entities.insert(key, entity.clone());
        Ok(entity)
    }

    async fn get_by_key(&self, key: &E::Key) -> Result<E, DomainError> {
        let entities = self.entities.read().map_err(|e| {
            DomainError::storage(format!("Failed to acquire read lock: {}", e))
        })?;

        entities.get(key.as_str()).cloned().ok_or_else(|| {
            DomainError::not_found(format!("Entity with key '{}' not found", key.as_str()))
        })
    }

    async fn get_by_keys(&self, keys: &[E::Key]) -> Result<Vec<E>, DomainError> {
        let entities = self.entities.read().map_err(|e| {
            DomainError::storage(format!("Failed to acquire read lock: {}", e))
        })?;

        Ok(keys
            .iter()
            .filter_map(|key| entities.get(key.as_str()).cloned())
            .collect())
    }

    async fn delete(&self, key: &E::Key) -> Result<E, DomainError> {
        let mut entities = self.entities.write().map_err(|e| {
            DomainError::storage(format!("Failed to acquire write lock: {}", e))
        })?;

        entities.remove(key.as_str()).ok_or_else(|| {
            DomainError::not_found(format!("Entity with key '{}' not found", key.as_str()))
        })
    }

    async fn delete_all(&self) -> Result<(), DomainError> {
        let mut entities = self.entities.write().map_err(|e| {
            DomainError::storage(format!("Failed to acquire write lock: {}", e))
        })?;

        entities.clear();
        Ok(())
    }
}
