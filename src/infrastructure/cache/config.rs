//! Named cache configuration

use std::time::Duration;

use serde::Deserialize;

/// Capacity and default expiry for one named cache
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamedCacheConfig {
    /// Maximum number of entries; zero disables caching
    pub capacity: usize,
    /// Applied to entries populated without an explicit TTL
    pub default_ttl: Option<Duration>,
}

impl Default for NamedCacheConfig {
    fn default() -> Self {
        Self {
            capacity: 10_000,
            default_ttl: Some(Duration::from_secs(3600)), // 1 hour
        }
    }
}

impl NamedCacheConfig {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            ..Default::default()
        }
    }

    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    pub fn with_default_ttl(mut self, ttl: Duration) -> Self {
        self.default_ttl = Some(ttl);
        self
    }

    /// Entries live until evicted or invalidated
    pub fn without_ttl(mut self) -> Self {
        self.default_ttl = None;
        self
    }
}

/// Serialized form of [`NamedCacheConfig`] as it appears in configuration files
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NamedCacheSettings {
    #[serde(default)]
    pub capacity: Option<usize>,
    /// Zero means "no expiry"
    #[serde(default)]
    pub default_ttl_secs: Option<u64>,
}

impl NamedCacheSettings {
    /// Resolves these settings on top of `base`, field by field
    pub fn resolve(&self, base: &NamedCacheConfig) -> NamedCacheConfig {
        let default_ttl = match self.default_ttl_secs {
            Some(0) => None,
            Some(secs) => Some(Duration::from_secs(secs)),
            None => base.default_ttl,
        };

        NamedCacheConfig {
            capacity: self.capacity.unwrap_or(base.capacity),
            default_ttl,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder() {
        let config = NamedCacheConfig::new(500).with_default_ttl(Duration::from_secs(30));
        assert_eq!(config.capacity, 500);
        assert_eq!(config.default_ttl, Some(Duration::from_secs(30)));

        assert_eq!(config.without_ttl().default_ttl, None);
    }

    #[test]
    fn test_settings_resolve_overrides_fields() {
        let base = NamedCacheConfig::default();
        let settings = NamedCacheSettings {
            capacity: Some(20_000),
            default_ttl_secs: None,
        };

        let resolved = settings.resolve(&base);
        assert_eq!(resolved.capacity, 20_000);
        assert_eq!(resolved.default_ttl, base.default_ttl);
    }

    #[test]
    fn test_settings_zero_ttl_disables_expiry() {
        let settings = NamedCacheSettings {
            capacity: None,
            default_ttl_secs: Some(0),
        };

        let resolved = settings.resolve(&NamedCacheConfig::default());
        assert_eq!(resolved.default_ttl, None);
        assert_eq!(resolved.capacity, 10_000);
    }
}
