use std::collections::HashMap;

use serde::Deserialize;

use crate::infrastructure::bus::BusConfig;
use crate::infrastructure::cache::{NamedCacheConfig, NamedCacheSettings};
use crate::infrastructure::observability::MetricsConfig;
use crate::infrastructure::storage::StorageSettings;

/// Application configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub node: NodeConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
    #[serde(default)]
    pub bus: BusConfig,
    #[serde(default)]
    pub storage: StorageSettings,
    #[serde(default)]
    pub caches: CachesConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NodeConfig {
    /// Identifies this node on the invalidation bus; random when empty
    #[serde(default)]
    pub id: String,
    /// Seconds between expired-entry sweeps; zero disables the sweep
    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,
}

fn default_sweep_interval_secs() -> u64 {
    60
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            id: String::new(),
            sweep_interval_secs: default_sweep_interval_secs(),
        }
    }
}

impl NodeConfig {
    pub fn resolved_id(&self) -> String {
        if self.id.trim().is_empty() {
            uuid::Uuid::new_v4().to_string()
        } else {
            self.id.clone()
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub format: LogFormat,
}

#[derive(Debug, Clone, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}

/// Named cache sizing: one default plus per-name overrides
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CachesConfig {
    #[serde(default)]
    pub default: NamedCacheSettings,
    #[serde(default)]
    pub named: HashMap<String, NamedCacheSettings>,
}

impl CachesConfig {
    pub fn default_config(&self) -> NamedCacheConfig {
        self.default.resolve(&NamedCacheConfig::default())
    }

    /// Resolves the configuration of `name`, falling back to the default section
    pub fn config_for(&self, name: &str) -> NamedCacheConfig {
        let base = self.default_config();
        match self.named.get(name) {
            Some(settings) => settings.resolve(&base),
            None => base,
        }
    }
}

impl AppConfig {
    pub fn load() -> Result<Self, config::ConfigError> {
        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name("config/local").required(false))
            .add_source(
                config::Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }
}
