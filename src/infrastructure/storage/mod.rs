//! Storage infrastructure - durable entity stores

mod factory;
mod in_memory;
mod postgres;

pub use factory::{StorageBackend, StorageConfig, StorageFactory, StorageSettings, StorageType};
pub use in_memory::InMemoryEntityStore;
pub use postgres::{connect_pool, PostgresConfig, PostgresEntityStore};
