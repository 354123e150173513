//! Per-cache invalidation handler registry shared by the bus transports

use std::collections::HashMap;
use std::fmt;

use parking_lot::RwLock;

use crate::domain::cache::{InvalidationHandler, InvalidationMessage};

/// Handlers keyed by cache name
#[derive(Default)]
pub struct SubscriptionRegistry {
    handlers: RwLock<HashMap<String, Vec<InvalidationHandler>>>,
}

impl fmt::Debug for SubscriptionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubscriptionRegistry")
            .field("caches", &self.cache_names())
            .finish()
    }
}

impl SubscriptionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, cache_name: &str, handler: InvalidationHandler) {
        self.handlers
            .write()
            .entry(cache_name.to_string())
            .or_default()
            .push(handler);
    }

    /// Runs every handler registered for the message's cache
    ///
    /// Handlers are called outside the lock. Returns how many ran.
    pub fn dispatch(&self, message: &InvalidationMessage) -> usize {
        let handlers = match self.handlers.read().get(&message.cache) {
            Some(handlers) => handlers.clone(),
            None => return 0,
        };

        for handler in &handlers {
            handler(message);
        }
        handlers.len()
    }

    /// Purges every subscribed cache
    ///
    /// Used when the transport may have dropped messages, e.g. after a
    /// lagging receiver or a reconnect.
    pub fn purge_all(&self) {
        for cache_name in self.cache_names() {
            self.dispatch(&InvalidationMessage::purge(cache_name));
        }
    }

    pub fn cache_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.handlers.read().keys().cloned().collect();
        names.sort();
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn counting_handler(counter: Arc<AtomicUsize>) -> InvalidationHandler {
        Arc::new(move |_: &InvalidationMessage| {
            counter.fetch_add(1, Ordering::SeqCst);
        })
    }

    #[test]
    fn test_dispatch_only_reaches_named_cache() {
        let registry = SubscriptionRegistry::new();
        let roles = Arc::new(AtomicUsize::new(0));
        let tokens = Arc::new(AtomicUsize::new(0));
        registry.register("roles", counting_handler(roles.clone()));
        registry.register("user_access_tokens", counting_handler(tokens.clone()));

        assert_eq!(registry.dispatch(&InvalidationMessage::key("roles", "admin")), 1);
        assert_eq!(roles.load(Ordering::SeqCst), 1);
        assert_eq!(tokens.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_dispatch_unknown_cache() {
        let registry = SubscriptionRegistry::new();
        assert_eq!(registry.dispatch(&InvalidationMessage::purge("nope")), 0);
    }

    #[test]
    fn test_purge_all_sends_purge_to_each_cache() {
        let registry = SubscriptionRegistry::new();
        let seen = Arc::new(parking_lot::Mutex::new(Vec::new()));
        for name in ["roles", "user_access_tokens"] {
            let seen = seen.clone();
            registry.register(
                name,
                Arc::new(move |message: &InvalidationMessage| seen.lock().push(message.clone())),
            );
        }

        registry.purge_all();

        let seen = seen.lock();
        assert_eq!(seen.len(), 2);
        assert!(seen.iter().all(|m| m.is_purge()));
    }
}
