//! Bounded in-process cache with LRU eviction and lazy TTL expiry

use std::fmt;
use std::num::NonZeroUsize;
use std::time::{Duration, Instant};

use lru::LruCache;
use parking_lot::Mutex;

use crate::domain::cache::{CacheEntry, CacheEntryMeta};
use crate::infrastructure::observability;

use super::config::NamedCacheConfig;

/// Lower bound on remembered key invalidations per cache
const MIN_TOMBSTONES: usize = 1024;

struct Inner<V> {
    /// Unbounded at the LRU level; `insert` enforces the capacity
    entries: LruCache<String, CacheEntry<V>>,
    /// Bumped by every remove and purge, hit or not
    generation: u64,
    /// key -> generation of its latest remove
    tombstones: LruCache<String, u64>,
    /// Generation of the latest purge
    purged_at: u64,
    /// Highest generation among tombstones pushed out of `tombstones`
    forgotten_at: u64,
}

impl<V> Inner<V> {
    fn new(tombstone_capacity: NonZeroUsize) -> Self {
        Self {
            entries: LruCache::unbounded(),
            generation: 0,
            tombstones: LruCache::new(tombstone_capacity),
            purged_at: 0,
            forgotten_at: 0,
        }
    }

    /// Inserts under the capacity bound, returning the evicted keys
    fn insert(&mut self, key: String, entry: CacheEntry<V>, capacity: usize) -> Vec<String> {
        let mut evicted = Vec::new();

        if !self.entries.contains(&key) {
            while self.entries.len() >= capacity {
                match self.entries.pop_lru() {
                    Some((victim, _)) => evicted.push(victim),
                    None => break,
                }
            }
        }

        self.entries.push(key, entry);
        evicted
    }

    fn remove(&mut self, key: &str) -> bool {
        self.generation += 1;
        let generation = self.generation;

        if let Some((dropped, at)) = self.tombstones.push(key.to_string(), generation) {
            if dropped != key {
                self.forgotten_at = self.forgotten_at.max(at);
            }
        }

        self.entries.pop(key).is_some()
    }

    fn purge(&mut self) -> usize {
        let count = self.entries.len();
        self.generation += 1;
        self.purged_at = self.generation;
        self.entries.clear();
        self.tombstones.clear();
        count
    }

    /// Whether `key` saw no invalidation after `generation`
    ///
    /// Once a tombstone is pushed out its key can no longer be told apart, so
    /// any fill that started before it is refused.
    fn unchanged_since(&self, key: &str, generation: u64) -> bool {
        generation >= self.purged_at
            && generation >= self.forgotten_at
            && self.tombstones.peek(key).is_none_or(|at| *at <= generation)
    }
}

/// Point-in-time view of a local cache
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalCacheStats {
    pub name: String,
    pub entries: usize,
    pub capacity: usize,
    pub size_bytes: usize,
}

/// Thread-safe, bounded key -> value table for one named cache
///
/// - `get` promotes the entry and never returns an expired one
/// - `put` evicts the least recently used entry when full; among never-read
///   entries the oldest insert goes first
/// - `remove` and `purge` never fail
pub struct LocalCache<V> {
    name: String,
    capacity: usize,
    default_ttl: Option<Duration>,
    inner: Mutex<Inner<V>>,
}

impl<V> fmt::Debug for LocalCache<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocalCache")
            .field("name", &self.name)
            .field("capacity", &self.capacity)
            .field("default_ttl", &self.default_ttl)
            .field("len", &self.inner.lock().entries.len())
            .finish()
    }
}

impl<V: Clone> LocalCache<V> {
    pub fn new(name: impl Into<String>, config: &NamedCacheConfig) -> Self {
        let tombstones = NonZeroUsize::new(config.capacity.max(MIN_TOMBSTONES))
            .unwrap_or(NonZeroUsize::MIN);

        Self {
            name: name.into(),
            capacity: config.capacity,
            default_ttl: config.default_ttl,
            inner: Mutex::new(Inner::new(tombstones)),
        }
    }

    /// Creates a cache holding at most `capacity` entries that never expire
    pub fn with_capacity(name: impl Into<String>, capacity: usize) -> Self {
        Self::new(name, &NamedCacheConfig::new(capacity).without_ttl())
    }

    pub fn get(&self, key: &str) -> Option<V> {
        let mut inner = self.inner.lock();

        if inner.entries.peek(key)?.is_expired() {
            inner.entries.pop(key);
            return None;
        }

        inner.entries.get(key).map(|entry| entry.value().clone())
    }

    /// Stores `value`, replacing any entry under `key`
    ///
    /// `ttl` falls back to the cache's default TTL when `None`.
    pub fn put(&self, key: impl Into<String>, value: V, ttl: Option<Duration>) {
        let entry = CacheEntry::new(value, ttl.or(self.default_ttl));
        self.put_entry(key.into(), entry);
    }

    pub fn put_entry(&self, key: String, entry: CacheEntry<V>) {
        if self.capacity == 0 {
            return;
        }

        let evicted = self.inner.lock().insert(key, entry, self.capacity);
        self.report_evictions(evicted);
    }

    /// Stores `entry` only if `key` was not removed and the cache not purged
    /// since `generation` was read
    ///
    /// A reader that missed, fetched from the durable store and then lost a race
    /// with an invalidation of the same key must not put the value it fetched
    /// back. Invalidations of other keys leave the fill alone.
    pub fn put_entry_if_generation(
        &self,
        key: String,
        entry: CacheEntry<V>,
        generation: u64,
    ) -> bool {
        if self.capacity == 0 {
            return false;
        }

        let evicted = {
            let mut inner = self.inner.lock();
            if !inner.unchanged_since(&key, generation) {
                return false;
            }
            inner.insert(key, entry, self.capacity)
        };
        self.report_evictions(evicted);
        true
    }

    fn report_evictions(&self, evicted: Vec<String>) {
        if evicted.is_empty() {
            return;
        }

        for key in &evicted {
            tracing::trace!(cache = %self.name, key = %key, "evicted");
        }
        observability::record_cache_evictions(&self.name, evicted.len() as u64);
    }

    /// Current invalidation generation, read before a durable-store fetch
    pub fn generation(&self) -> u64 {
        self.inner.lock().generation
    }

    /// Removes `key` if present, returning whether anything was dropped
    pub fn remove(&self, key: &str) -> bool {
        self.inner.lock().remove(key)
    }

    /// Drops every entry, returning how many were held
    pub fn purge(&self) -> usize {
        self.inner.lock().purge()
    }

    /// Whether a live entry exists, without promoting it
    pub fn contains(&self, key: &str) -> bool {
        self.inner
            .lock()
            .entries
            .peek(key)
            .is_some_and(|entry| !entry.is_expired())
    }

    pub fn meta(&self, key: &str) -> Option<CacheEntryMeta> {
        self.inner
            .lock()
            .entries
            .peek(key)
            .filter(|entry| !entry.is_expired())
            .map(|entry| entry.meta())
    }

    /// Removes every expired entry, returning how many were dropped
    pub fn sweep_expired(&self) -> usize {
        let now = Instant::now();
        let mut inner = self.inner.lock();

        let expired: Vec<String> = inner
            .entries
            .iter()
            .filter(|(_, entry)| entry.is_expired_at(now))
            .map(|(key, _)| key.clone())
            .collect();

        for key in &expired {
            inner.entries.pop(key);
        }

        expired.len()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn default_ttl(&self) -> Option<Duration> {
        self.default_ttl
    }

    pub fn len(&self) -> usize {
        self.inner.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> LocalCacheStats {
        let inner = self.inner.lock();
        LocalCacheStats {
            name: self.name.clone(),
            entries: inner.entries.len(),
            capacity: self.capacity,
            size_bytes: inner
                .entries
                .iter()
                .filter_map(|(_, entry)| entry.meta().size_bytes)
                .sum(),
        }
    }
}
