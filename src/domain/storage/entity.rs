//! Storage entity traits and types

use std::fmt::Debug;

use serde::{de::DeserializeOwned, Serialize};

use crate::domain::DomainError;

/// Trait for types that can be used as storage keys
pub trait StorageKey: Clone + Debug + Send + Sync + Eq + std::hash::Hash {
    /// Returns the key as a string for storage backends that require string keys
    fn as_str(&self) -> &str;

    /// An unset key is one the durable store has yet to assign
    fn is_unset(&self) -> bool {
        self.as_str().is_empty()
    }
}

/// Trait for types that can be stored
pub trait StorageEntity: Clone + Debug + Send + Sync + Serialize + DeserializeOwned {
    /// The key type for this entity
    type Key: StorageKey;

    /// Returns the entity's key
    fn key(&self) -> &Self::Key;

    /// Gives the entity a server-generated key when it has none.
    ///
    /// Entities whose key is always chosen by the caller keep the default no-op.
    fn assign_generated_key(&mut self) {}

    /// Checks the entity before the durable store accepts it
    fn validate(&self) -> Result<(), DomainError> {
        Ok(())
    }
}
