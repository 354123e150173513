//! In-process cluster bus over a tokio broadcast channel
//!
//! Every node joined to the same [`BroadcastHub`] sees every other node's
//! invalidations. Useful for running several nodes in one process and for
//! exercising cluster coherence in tests.

use std::fmt;
use std::sync::Arc;

use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use crate::domain::cache::{InvalidationBus, InvalidationHandler, InvalidationMessage};
use crate::domain::DomainError;

use super::registry::SubscriptionRegistry;

/// Shared channel the nodes of one in-process cluster join
#[derive(Debug, Clone)]
pub struct BroadcastHub {
    sender: broadcast::Sender<InvalidationMessage>,
}

impl BroadcastHub {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Attaches a node to the hub. Must be called within a Tokio runtime.
    pub fn join(&self, node_id: impl Into<String>) -> BroadcastInvalidationBus {
        let node_id = node_id.into();
        let registry = Arc::new(SubscriptionRegistry::new());
        let receiver = self.sender.subscribe();

        let listener = tokio::spawn(listen(node_id.clone(), receiver, Arc::clone(&registry)));

        tracing::debug!(node_id = %node_id, "joined broadcast hub");

        BroadcastInvalidationBus {
            node_id,
            sender: self.sender.clone(),
            registry,
            listener,
        }
    }

    pub fn node_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

async fn listen(
    node_id: String,
    mut receiver: broadcast::Receiver<InvalidationMessage>,
    registry: Arc<SubscriptionRegistry>,
) {
    loop {
        match receiver.recv().await {
            Ok(message) => {
                if message.is_from(&node_id) {
                    continue;
                }
                tracing::debug!(
                    node_id = %node_id,
                    cache = %message.cache,
                    key = ?message.key,
                    origin = ?message.origin,
                    "received invalidation"
                );
                registry.dispatch(&message);
            }
            Err(broadcast::error::RecvError::Lagged(missed)) => {
                tracing::warn!(
                    node_id = %node_id,
                    missed,
                    "Invalidation listener lagged; purging all subscribed caches"
                );
                registry.purge_all();
            }
            Err(broadcast::error::RecvError::Closed) => {
                tracing::info!(node_id = %node_id, "Broadcast hub closed, stopping listener");
                break;
            }
        }
    }
}

/// One node's handle on a [`BroadcastHub`]
pub struct BroadcastInvalidationBus {
    node_id: String,
    sender: broadcast::Sender<InvalidationMessage>,
    registry: Arc<SubscriptionRegistry>,
    listener: JoinHandle<()>,
}

impl fmt::Debug for BroadcastInvalidationBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BroadcastInvalidationBus")
            .field("node_id", &self.node_id)
            .field("registry", &self.registry)
            .finish()
    }
}

impl Drop for BroadcastInvalidationBus {
    fn drop(&mut self) {
        self.listener.abort();
    }
}

impl InvalidationBus for BroadcastInvalidationBus {
    fn node_id(&self) -> &str {
        &self.node_id
    }

    fn publish(&self, message: InvalidationMessage) -> Result<(), DomainError> {
        let message = message.with_origin(self.node_id.clone());
        self.sender
            .send(message)
            .map(|_| ())
            .map_err(|_| DomainError::bus("No nodes are listening on the broadcast hub"))
    }

    fn subscribe(&self, cache_name: &str, handler: InvalidationHandler) -> Result<(), DomainError> {
        self.registry.register(cache_name, handler);
        Ok(())
    }
}
