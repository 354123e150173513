//! Cache coordinator - named local caches wired to the invalidation bus

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use serde::{de::DeserializeOwned, Serialize};

use crate::domain::cache::{CacheEntry, InvalidationBus, InvalidationHandler, InvalidationMessage};
use crate::infrastructure::observability::{self, InvalidationOrigin, InvalidationScope};

use super::config::NamedCacheConfig;
use super::local::{LocalCache, LocalCacheStats};

/// Values are held as serialized JSON so one coordinator can serve every entity kind
type CachedValue = Arc<str>;

/// Handle taken before a durable-store fetch on a cache miss
///
/// Filling a key through the ticket only succeeds if that key was not
/// invalidated and the cache not purged in between, so a slow read can never
/// resurrect a value that a concurrent write already invalidated.
#[derive(Debug)]
pub struct FillTicket {
    cache: Arc<LocalCache<CachedValue>>,
    generation: u64,
}

/// Owns the named caches of one process and keeps them coherent with the cluster
///
/// Reads and fills are purely local. Invalidations are applied locally, then
/// published on the bus; inbound invalidations from other nodes go through the
/// same [`apply_invalidation`] path.
pub struct CacheCoordinator {
    bus: Arc<dyn InvalidationBus>,
    defaults: NamedCacheConfig,
    overrides: HashMap<String, NamedCacheConfig>,
    caches: RwLock<HashMap<String, Arc<LocalCache<CachedValue>>>>,
}

impl fmt::Debug for CacheCoordinator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheCoordinator")
            .field("node_id", &self.bus.node_id())
            .field("defaults", &self.defaults)
            .field("caches", &self.cache_names())
            .finish()
    }
}

impl CacheCoordinator {
    pub fn new(bus: Arc<dyn InvalidationBus>) -> Self {
        Self {
            bus,
            defaults: NamedCacheConfig::default(),
            overrides: HashMap::new(),
            caches: RwLock::new(HashMap::new()),
        }
    }

    /// Sets the configuration used by caches without an override
    pub fn with_defaults(mut self, config: NamedCacheConfig) -> Self {
        self.defaults = config;
        self
    }

    /// Overrides the configuration of one named cache
    pub fn with_cache_config(mut self, name: impl Into<String>, config: NamedCacheConfig) -> Self {
        self.overrides.insert(name.into(), config);
        self
    }

    pub fn node_id(&self) -> &str {
        self.bus.node_id()
    }

    pub fn config_for(&self, name: &str) -> NamedCacheConfig {
        self.overrides
            .get(name)
            .cloned()
            .unwrap_or_else(|| self.defaults.clone())
    }

    /// Creates the named cache and its bus subscription ahead of first use
    pub fn register(&self, name: &str) {
        self.cache(name);
    }

    fn cache(&self, name: &str) -> Arc<LocalCache<CachedValue>> {
        if let Some(cache) = self.caches.read().get(name) {
            return Arc::clone(cache);
        }

        let mut caches = self.caches.write();
        if let Some(cache) = caches.get(name) {
            return Arc::clone(cache);
        }

        let config = self.config_for(name);
        let cache = Arc::new(LocalCache::new(name, &config));

        let target = Arc::downgrade(&cache);
        let handler: InvalidationHandler = Arc::new(move |message: &InvalidationMessage| {
            if let Some(cache) = target.upgrade() {
                apply_invalidation(&cache, message, InvalidationOrigin::Remote);
            }
        });

        if let Err(e) = self.bus.subscribe(name, handler) {
            tracing::error!(
                cache = %name,
                error = %e,
                "Failed to subscribe cache to invalidation bus; remote writes will only expire by TTL"
            );
        }

        tracing::debug!(
            cache = %name,
            capacity = config.capacity,
            default_ttl_secs = ?config.default_ttl.map(|ttl| ttl.as_secs()),
            "created named cache"
        );

        caches.insert(name.to_string(), Arc::clone(&cache));
        cache
    }

    /// Looks `key` up in the named cache; never touches the durable store
    pub fn read_through<V>(&self, cache_name: &str, key: &str) -> Option<V>
    where
        V: DeserializeOwned,
    {
        let cache = self.cache(cache_name);

        let Some(data) = cache.get(key) else {
            tracing::debug!(cache = %cache_name, key = %key, "cache miss");
            observability::record_cache_miss(cache_name);
            return None;
        };

        match serde_json::from_str(&data) {
            Ok(value) => {
                tracing::debug!(cache = %cache_name, key = %key, "cache hit");
                observability::record_cache_hit(cache_name);
                Some(value)
            }
            Err(e) => {
                tracing::warn!(
                    cache = %cache_name,
                    key = %key,
                    error = %e,
                    "Dropping undecodable cache entry"
                );
                cache.remove(key);
                observability::record_cache_miss(cache_name);
                None
            }
        }
    }

    /// Stores `value` locally; population is never broadcast
    pub fn populate<V>(&self, cache_name: &str, key: &str, value: &V, ttl: Option<Duration>)
    where
        V: Serialize,
    {
        let cache = self.cache(cache_name);
        if let Some(entry) = encode_entry(&cache, key, value, ttl) {
            cache.put_entry(key.to_string(), entry);
        }
    }

    /// Captures the named cache's invalidation generation before a durable-store fetch
    pub fn begin_fill(&self, cache_name: &str) -> FillTicket {
        let cache = self.cache(cache_name);
        let generation = cache.generation();
        FillTicket { cache, generation }
    }

    /// Stores `value` unless `key` or the whole cache was invalidated since `ticket` was taken
    pub fn populate_if_current<V>(
        &self,
        ticket: &FillTicket,
        key: &str,
        value: &V,
        ttl: Option<Duration>,
    ) -> bool
    where
        V: Serialize,
    {
        let Some(entry) = encode_entry(&ticket.cache, key, value, ttl) else {
            return false;
        };

        let stored = ticket
            .cache
            .put_entry_if_generation(key.to_string(), entry, ticket.generation);

        if !stored {
            tracing::debug!(
                cache = %ticket.cache.name(),
                key = %key,
                "skipped fill that raced with an invalidation"
            );
        }

        stored
    }

    /// Drops `key` here and on every other node
    pub fn invalidate(&self, cache_name: &str, key: &str) {
        let message = InvalidationMessage::key(cache_name, key);
        apply_invalidation(&self.cache(cache_name), &message, InvalidationOrigin::Local);
        self.publish(message);
    }

    /// Purges the named cache here and on every other node
    pub fn invalidate_all(&self, cache_name: &str) {
        let message = InvalidationMessage::purge(cache_name);
        apply_invalidation(&self.cache(cache_name), &message, InvalidationOrigin::Local);
        self.publish(message);
    }

    fn publish(&self, message: InvalidationMessage) {
        let cache_name = message.cache.clone();

        if let Err(e) = self.bus.publish(message) {
            tracing::warn!(
                cache = %cache_name,
                error = %e,
                "Failed to publish invalidation; other nodes may serve stale entries until TTL"
            );
            observability::record_bus_publish_failure(&cache_name);
        }
    }

    pub fn stats(&self, cache_name: &str) -> Option<LocalCacheStats> {
        self.caches.read().get(cache_name).map(|cache| cache.stats())
    }

    pub fn cache_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.caches.read().keys().cloned().collect();
        names.sort();
        names
    }

    /// Sweeps expired entries from every named cache
    pub fn sweep_expired(&self) -> usize {
        let caches: Vec<_> = self.caches.read().values().cloned().collect();
        caches.iter().map(|cache| cache.sweep_expired()).sum()
    }
}

fn encode_entry<V: Serialize>(
    cache: &LocalCache<CachedValue>,
    key: &str,
    value: &V,
    ttl: Option<Duration>,
) -> Option<CacheEntry<CachedValue>> {
    match serde_json::to_string(value) {
        Ok(json) => {
            let size = json.len();
            let entry = CacheEntry::new(Arc::from(json), ttl.or(cache.default_ttl()));
            Some(entry.with_size(size))
        }
        Err(e) => {
            tracing::warn!(
                cache = %cache.name(),
                key = %key,
                error = %e,
                "Failed to encode value for cache; leaving entry absent"
            );
            None
        }
    }
}

/// What happens to a local cache when an invalidation applies to it,
/// whether it started here or arrived from another node
fn apply_invalidation(
    cache: &LocalCache<CachedValue>,
    message: &InvalidationMessage,
    origin: InvalidationOrigin,
) {
    match &message.key {
        Some(key) => {
            cache.remove(key);
            tracing::debug!(cache = %cache.name(), key = %key, ?origin, "cache invalidated");
            observability::record_cache_invalidation(cache.name(), InvalidationScope::Key, origin);
        }
        None => {
            let dropped = cache.purge();
            tracing::debug!(cache = %cache.name(), dropped, ?origin, "cache purged");
            observability::record_cache_invalidation(cache.name(), InvalidationScope::All, origin);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::cache::RecordingBus;

    fn coordinator() -> (Arc<RecordingBus>, CacheCoordinator) {
        let bus = Arc::new(RecordingBus::new("node-a"));
        let coordinator = CacheCoordinator::new(bus.clone());
        (bus, coordinator)
    }

    #[test]
    fn test_populate_then_read() {
        let (_, coordinator) = coordinator();
        coordinator.populate("roles", "admin", &vec!["manage_system"], None);

        let value: Option<Vec<String>> = coordinator.read_through("roles", "admin");
        assert_eq!(value, Some(vec!["manage_system".to_string()]));
    }

    #[test]
    fn test_populate_does_not_publish() {
        let (bus, coordinator) = coordinator();
        coordinator.populate("roles", "admin", &1, None);

        assert!(bus.published().is_empty());
    }

    #[test]
    fn test_invalidate_removes_locally_and_publishes() {
        let (bus, coordinator) = coordinator();
        coordinator.populate("roles", "admin", &1, None);

        coordinator.invalidate("roles", "admin");

        assert_eq!(coordinator.read_through::<i32>("roles", "admin"), None);
        assert_eq!(
            bus.published(),
            vec![InvalidationMessage::key("roles", "admin").with_origin("node-a")]
        );
    }

    #[test]
    fn test_invalidate_all_purges_and_publishes_null_key() {
        let (bus, coordinator) = coordinator();
        coordinator.populate("roles", "a", &1, None);
        coordinator.populate("roles", "b", &2, None);
        coordinator.populate("user_access_tokens", "t", &3, None);

        coordinator.invalidate_all("roles");

        assert_eq!(coordinator.stats("roles").unwrap().entries, 0);
        assert_eq!(coordinator.read_through::<i32>("user_access_tokens", "t"), Some(3));
        assert!(bus.published()[0].is_purge());
    }

    #[test]
    fn test_inbound_message_uses_same_path() {
        let (bus, coordinator) = coordinator();
        coordinator.populate("roles", "a", &1, None);
        coordinator.populate("roles", "b", &2, None);

        bus.deliver(&InvalidationMessage::key("roles", "a").with_origin("node-b"));
        assert_eq!(coordinator.read_through::<i32>("roles", "a"), None);
        assert_eq!(coordinator.read_through::<i32>("roles", "b"), Some(2));

        bus.deliver(&InvalidationMessage::purge("roles").with_origin("node-b"));
        assert_eq!(coordinator.read_through::<i32>("roles", "b"), None);
    }

    #[test]
    fn test_invalidation_is_idempotent_and_commutative() {
        let (bus, left) = coordinator();
        let (_, right) = coordinator();
        for c in [&left, &right] {
            c.populate("roles", "a", &1, None);
            c.populate("roles", "b", &2, None);
            c.populate("roles", "c", &3, None);
        }

        let drop_a = InvalidationMessage::key("roles", "a");
        let drop_b = InvalidationMessage::key("roles", "b");
        bus.deliver(&drop_a);
        bus.deliver(&drop_a);
        bus.deliver(&drop_b);

        right.invalidate("roles", "b");
        right.invalidate("roles", "a");

        for c in [&left, &right] {
            assert_eq!(c.read_through::<i32>("roles", "a"), None);
            assert_eq!(c.read_through::<i32>("roles", "b"), None);
            assert_eq!(c.read_through::<i32>("roles", "c"), Some(3));
        }
    }

    #[test]
    fn test_cache_is_subscribed_once_on_first_use() {
        let (bus, coordinator) = coordinator();
        assert!(!bus.subscribed("roles"));

        coordinator.register("roles");
        coordinator.register("roles");

        assert!(bus.subscribed("roles"));
        assert_eq!(coordinator.cache_names(), vec!["roles".to_string()]);
    }

    #[test]
    fn test_publish_failure_is_swallowed() {
        let bus = Arc::new(RecordingBus::new("node-a").with_error("transport down"));
        let coordinator = CacheCoordinator::new(bus);
        coordinator.populate("roles", "admin", &1, None);

        coordinator.invalidate("roles", "admin");

        assert_eq!(coordinator.read_through::<i32>("roles", "admin"), None);
    }

    #[test]
    fn test_undecodable_entry_is_dropped() {
        let (_, coordinator) = coordinator();
        coordinator.populate("roles", "admin", &"not a number", None);

        assert_eq!(coordinator.read_through::<i32>("roles", "admin"), None);
        assert_eq!(coordinator.stats("roles").unwrap().entries, 0);
    }

    #[test]
    fn test_fill_ticket_rejects_after_invalidation() {
        let (_, coordinator) = coordinator();
        let ticket = coordinator.begin_fill("roles");

        coordinator.invalidate("roles", "admin");

        assert!(!coordinator.populate_if_current(&ticket, "admin", &1, None));
        assert_eq!(coordinator.read_through::<i32>("roles", "admin"), None);

        let fresh = coordinator.begin_fill("roles");
        assert!(coordinator.populate_if_current(&fresh, "admin", &2, None));
        assert_eq!(coordinator.read_through::<i32>("roles", "admin"), Some(2));
    }

    #[test]
    fn test_fill_ticket_ignores_other_keys() {
        let (_, coordinator) = coordinator();
        let ticket = coordinator.begin_fill("roles");

        coordinator.invalidate("roles", "viewer");

        assert!(coordinator.populate_if_current(&ticket, "admin", &1, None));
        assert_eq!(coordinator.read_through::<i32>("roles", "admin"), Some(1));

        coordinator.invalidate_all("roles");
        assert!(!coordinator.populate_if_current(&ticket, "editor", &2, None));
    }

    #[test]
    fn test_per_cache_config_override() {
        let bus = Arc::new(RecordingBus::new("node-a"));
        let coordinator = CacheCoordinator::new(bus)
            .with_defaults(NamedCacheConfig::new(100))
            .with_cache_config("roles", NamedCacheConfig::new(2).without_ttl());

        coordinator.register("roles");
        coordinator.register("user_access_tokens");

        assert_eq!(coordinator.stats("roles").unwrap().capacity, 2);
        assert_eq!(coordinator.stats("user_access_tokens").unwrap().capacity, 100);
        assert!(coordinator.stats("unknown").is_none());
    }

    #[test]
    fn test_explicit_ttl_and_sweep() {
        let (_, coordinator) = coordinator();
        coordinator.populate("roles", "short", &1, Some(Duration::ZERO));
        coordinator.populate("roles", "long", &2, None);

        assert_eq!(coordinator.sweep_expired(), 1);
        assert_eq!(coordinator.read_through::<i32>("roles", "long"), Some(2));
    }
}
