//! Single-node invalidation bus

use crate::domain::cache::{InvalidationBus, InvalidationHandler, InvalidationMessage};
use crate::domain::DomainError;

use super::registry::SubscriptionRegistry;

/// Bus for a node that has no peers
///
/// Local invalidation already happened before `publish` is called, and the
/// node's own echo is ignored, so publishing has nothing left to do.
#[derive(Debug)]
pub struct LocalInvalidationBus {
    node_id: String,
    registry: SubscriptionRegistry,
}

impl LocalInvalidationBus {
    pub fn new(node_id: impl Into<String>) -> Self {
        Self {
            node_id: node_id.into(),
            registry: SubscriptionRegistry::new(),
        }
    }

    pub fn subscriptions(&self) -> Vec<String> {
        self.registry.cache_names()
    }
}

impl InvalidationBus for LocalInvalidationBus {
    fn node_id(&self) -> &str {
        &self.node_id
    }

    fn publish(&self, message: InvalidationMessage) -> Result<(), DomainError> {
        tracing::trace!(cache = %message.cache, key = ?message.key, "local bus publish");
        Ok(())
    }

    fn subscribe(&self, cache_name: &str, handler: InvalidationHandler) -> Result<(), DomainError> {
        self.registry.register(cache_name, handler);
        Ok(())
    }
}
