//! Storage factory for runtime storage selection

use std::sync::Arc;

use serde::Deserialize;
use sqlx::postgres::PgPool;

use crate::domain::storage::{EntityStore, StorageEntity};
use crate::domain::DomainError;

use super::in_memory::InMemoryEntityStore;
use super::postgres::{connect_pool, PostgresConfig, PostgresEntityStore};

/// Supported storage types
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageType {
    /// In-memory storage (for testing/development)
    #[default]
    InMemory,
    /// PostgreSQL storage
    Postgres,
}

impl StorageType {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "memory" | "inmemory" | "in-memory" | "in_memory" => Some(Self::InMemory),
            "postgres" | "postgresql" | "pg" => Some(Self::Postgres),
            _ => None,
        }
    }
}

/// Storage section of the application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct StorageSettings {
    #[serde(default)]
    pub backend: StorageType,
    #[serde(default)]
    pub database_url: Option<String>,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_max_connections() -> u32 {
    10
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            backend: StorageType::default(),
            database_url: None,
            max_connections: default_max_connections(),
        }
    }
}

impl StorageSettings {
    pub fn to_config(&self) -> Result<StorageConfig, DomainError> {
        match self.backend {
            StorageType::InMemory => Ok(StorageConfig::in_memory()),
            StorageType::Postgres => {
                let url = self.database_url.as_deref().ok_or_else(|| {
                    DomainError::configuration(
                        "storage.database_url is required for the postgres backend",
                    )
                })?;
                Ok(StorageConfig::postgres(
                    PostgresConfig::new(url).with_max_connections(self.max_connections),
                ))
            }
        }
    }
}

/// Storage configuration
#[derive(Debug, Clone)]
pub enum StorageConfig {
    /// In-memory storage configuration
    InMemory,
    /// PostgreSQL storage configuration
    Postgres(PostgresConfig),
}

impl StorageConfig {
    pub fn in_memory() -> Self {
        Self::InMemory
    }

    pub fn postgres(config: PostgresConfig) -> Self {
        Self::Postgres(config)
    }

    pub fn postgres_url(url: impl Into<String>) -> Self {
        Self::Postgres(PostgresConfig::new(url))
    }

    pub fn storage_type(&self) -> StorageType {
        match self {
            Self::InMemory => StorageType::InMemory,
            Self::Postgres(_) => StorageType::Postgres,
        }
    }
}

/// Connected storage backend that hands out one store per entity kind
///
/// PostgreSQL stores share a single connection pool.
#[derive(Debug, Clone)]
pub enum StorageBackend {
    InMemory,
    Postgres(PgPool),
}

impl StorageBackend {
    /// Creates the store for entity kind `E`, backed by `table_name` on PostgreSQL
    pub async fn store<E>(&self, table_name: &str) -> Result<Arc<dyn EntityStore<E>>, DomainError>
    where
        E: StorageEntity + 'static,
    {
        match self {
            Self::InMemory => Ok(Arc::new(InMemoryEntityStore::<E>::new())),
            Self::Postgres(pool) => {
                let store = PostgresEntityStore::<E>::new(pool.clone(), table_name);
                store.ensure_table().await?;
                Ok(Arc::new(store))
            }
        }
    }
}

/// Factory for creating storage backends
#[derive(Debug)]
pub struct StorageFactory;

impl StorageFactory {
    /// Connects the backend described by the configuration
    pub async fn connect(config: &StorageConfig) -> Result<StorageBackend, DomainError> {
        match config {
            StorageConfig::InMemory => Ok(StorageBackend::InMemory),
            StorageConfig::Postgres(pg_config) => {
                let pool = connect_pool(pg_config).await?;
                tracing::info!("Connected to PostgreSQL storage");
                Ok(StorageBackend::Postgres(pool))
            }
        }
    }

    /// Creates a single store, connecting a dedicated pool if needed
    pub async fn create<E>(
        config: &StorageConfig,
        table_name: &str,
    ) -> Result<Arc<dyn EntityStore<E>>, DomainError>
    where
        E: StorageEntity + 'static,
    {
        Self::connect(config).await?.store(table_name).await
    }
}
