//! Cache entry container

use std::time::{Duration, Instant};

/// Cache entry metadata
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntryMeta {
    /// Time-to-live remaining, `None` when the entry never expires
    pub ttl_remaining: Option<Duration>,
    /// Size in bytes (if known)
    pub size_bytes: Option<usize>,
}

/// A cached value together with the bookkeeping needed for expiry
#[derive(Debug, Clone)]
pub struct CacheEntry<V> {
    value: V,
    inserted_at: Instant,
    ttl: Option<Duration>,
    size_bytes: Option<usize>,
}

impl<V> CacheEntry<V> {
    pub fn new(value: V, ttl: Option<Duration>) -> Self {
        Self::new_at(value, ttl, Instant::now())
    }

    /// Creates an entry stamped with an explicit insertion instant
    pub fn new_at(value: V, ttl: Option<Duration>, inserted_at: Instant) -> Self {
        Self {
            value,
            inserted_at,
            ttl,
            size_bytes: None,
        }
    }

    pub fn with_size(mut self, size_bytes: usize) -> Self {
        self.size_bytes = Some(size_bytes);
        self
    }

    pub fn value(&self) -> &V {
        &self.value
    }

    pub fn into_value(self) -> V {
        self.value
    }

    pub fn ttl(&self) -> Option<Duration> {
        self.ttl
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Instant::now())
    }

    /// An entry with a TTL expires once `ttl` has fully elapsed since insertion
    pub fn is_expired_at(&self, now: Instant) -> bool {
        match self.ttl {
            Some(ttl) => now.saturating_duration_since(self.inserted_at) >= ttl,
            None => false,
        }
    }

    pub fn meta(&self) -> CacheEntryMeta {
        CacheEntryMeta {
            ttl_remaining: self
                .ttl
                .map(|ttl| ttl.saturating_sub(self.inserted_at.elapsed())),
            size_bytes: self.size_bytes,
        }
    }
}
