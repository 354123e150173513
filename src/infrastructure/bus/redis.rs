//! Redis pub/sub invalidation bus for multi-process clusters

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::domain::cache::{InvalidationBus, InvalidationHandler, InvalidationMessage};
use crate::domain::DomainError;
use crate::infrastructure::observability;

use super::registry::SubscriptionRegistry;

const INITIAL_BACKOFF: Duration = Duration::from_secs(1);
const MAX_BACKOFF: Duration = Duration::from_secs(300);
const DEFAULT_QUEUE_CAPACITY: usize = 1024;

/// Connection settings for the Redis bus
#[derive(Debug, Clone)]
pub struct RedisBusConfig {
    /// Redis connection URL (e.g., "redis://127.0.0.1:6379")
    pub url: String,
    /// Pub/sub channel shared by every node of the cluster
    pub channel: String,
    /// Outbound messages waiting for the publisher task; overflow is dropped
    pub queue_capacity: usize,
}

impl RedisBusConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            channel: super::DEFAULT_CHANNEL.to_string(),
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
        }
    }

    pub fn with_channel(mut self, channel: impl Into<String>) -> Self {
        self.channel = channel.into();
        self
    }

    pub fn with_queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity;
        self
    }
}

/// Invalidation bus over a Redis pub/sub channel
///
/// `publish` only queues the message; a background task owns the publishing
/// connection so callers never wait on the network; when its queue is full the
/// message is dropped and counted. A second task holds the subscription and
/// reconnects with exponential backoff. Messages published while no
/// subscription was held cannot be replayed, so every subscribed cache is
/// purged each time the subscription is established, the first time included.
pub struct RedisInvalidationBus {
    node_id: String,
    config: RedisBusConfig,
    registry: Arc<SubscriptionRegistry>,
    connection: ConnectionManager,
    outbound: mpsc::Sender<InvalidationMessage>,
    connected: Arc<AtomicBool>,
    tasks: Vec<JoinHandle<()>>,
}

impl fmt::Debug for RedisInvalidationBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RedisInvalidationBus")
            .field("node_id", &self.node_id)
            .field("channel", &self.config.channel)
            .field("connected", &self.is_connected())
            .field("connection", &"<ConnectionManager>")
            .finish()
    }
}

impl Drop for RedisInvalidationBus {
    fn drop(&mut self) {
        for task in &self.tasks {
            task.abort();
        }
    }
}

impl RedisInvalidationBus {
    pub async fn connect(
        config: RedisBusConfig,
        node_id: impl Into<String>,
    ) -> Result<Self, DomainError> {
        let node_id = node_id.into();

        let client = Client::open(config.url.as_str())
            .map_err(|e| DomainError::bus(format!("Failed to create Redis client: {}", e)))?;

        let connection = ConnectionManager::new(client.clone())
            .await
            .map_err(|e| DomainError::bus(format!("Failed to connect to Redis: {}", e)))?;

        let registry = Arc::new(SubscriptionRegistry::new());
        let connected = Arc::new(AtomicBool::new(false));
        let (outbound, inbound) = mpsc::channel(config.queue_capacity.max(1));

        let publisher = tokio::spawn(run_publisher(
            connection.clone(),
            config.channel.clone(),
            inbound,
        ));

        let subscriber = tokio::spawn(run_subscriber(
            client,
            config.channel.clone(),
            node_id.clone(),
            Arc::clone(&registry),
            Arc::clone(&connected),
        ));

        tracing::info!(
            node_id = %node_id,
            channel = %config.channel,
            "Redis invalidation bus started"
        );

        Ok(Self {
            node_id,
            config,
            registry,
            connection,
            outbound,
            connected,
            tasks: vec![publisher, subscriber],
        })
    }

    /// Whether the subscription is currently established
    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Relaxed)
    }

    pub fn channel(&self) -> &str {
        &self.config.channel
    }

    /// Publishes on the caller's task and waits for Redis to accept the message
    pub async fn publish_now(&self, message: InvalidationMessage) -> Result<(), DomainError> {
        let payload = message.with_origin(self.node_id.clone()).to_json()?;
        let mut connection = self.connection.clone();

        connection
            .publish::<_, _, ()>(&self.config.channel, &payload)
            .await
            .map_err(|e| DomainError::bus(format!("Failed to publish invalidation: {}", e)))
    }
}

impl InvalidationBus for RedisInvalidationBus {
    fn node_id(&self) -> &str {
        &self.node_id
    }

    fn publish(&self, message: InvalidationMessage) -> Result<(), DomainError> {
        enqueue(&self.outbound, message.with_origin(self.node_id.clone()))
    }

    fn subscribe(&self, cache_name: &str, handler: InvalidationHandler) -> Result<(), DomainError> {
        self.registry.register(cache_name, handler);
        Ok(())
    }
}

/// Hands a message to the publisher task without waiting
fn enqueue(
    outbound: &mpsc::Sender<InvalidationMessage>,
    message: InvalidationMessage,
) -> Result<(), DomainError> {
    match outbound.try_send(message) {
        Ok(()) => Ok(()),
        Err(mpsc::error::TrySendError::Full(message)) => {
            observability::record_bus_publish_failure(&message.cache);
            Err(DomainError::bus(format!(
                "Redis publish queue is full; dropped invalidation for '{}'",
                message.cache
            )))
        }
        Err(mpsc::error::TrySendError::Closed(_)) => {
            Err(DomainError::bus("Redis publisher task has stopped"))
        }
    }
}

async fn run_publisher(
    mut connection: ConnectionManager,
    channel: String,
    mut inbound: mpsc::Receiver<InvalidationMessage>,
) {
    while let Some(message) = inbound.recv().await {
        let payload = match message.to_json() {
            Ok(payload) => payload,
            Err(e) => {
                tracing::warn!(cache = %message.cache, error = %e, "Failed to encode invalidation");
                observability::record_bus_publish_failure(&message.cache);
                continue;
            }
        };

        match connection.publish::<_, _, ()>(&channel, &payload).await {
            Ok(()) => {
                tracing::debug!(cache = %message.cache, key = ?message.key, "published invalidation");
            }
            Err(e) => {
                tracing::warn!(
                    cache = %message.cache,
                    error = %e,
                    "Failed to publish invalidation to Redis"
                );
                observability::record_bus_publish_failure(&message.cache);
            }
        }
    }
}

async fn run_subscriber(
    client: Client,
    channel: String,
    node_id: String,
    registry: Arc<SubscriptionRegistry>,
    connected: Arc<AtomicBool>,
) {
    let mut backoff = INITIAL_BACKOFF;

    loop {
        let result = listen(&client, &channel, &node_id, &registry, &connected).await;
        connected.store(false, Ordering::Relaxed);

        match result {
            Ok(()) => {
                backoff = INITIAL_BACKOFF;
            }
            Err(e) => {
                tracing::error!(
                    error = %e,
                    backoff_secs = backoff.as_secs(),
                    "Invalidation subscriber error, reconnecting..."
                );
                tokio::time::sleep(backoff).await;
                backoff = (backoff * 2).min(MAX_BACKOFF);
            }
        }
    }
}

async fn listen(
    client: &Client,
    channel: &str,
    node_id: &str,
    registry: &SubscriptionRegistry,
    connected: &AtomicBool,
) -> Result<(), DomainError> {
    let mut pubsub = client
        .get_async_pubsub()
        .await
        .map_err(|e| DomainError::bus(format!("Failed to get pub/sub connection: {}", e)))?;

    pubsub
        .subscribe(channel)
        .await
        .map_err(|e| DomainError::bus(format!("Failed to subscribe to '{}': {}", channel, e)))?;

    connected.store(true, Ordering::Relaxed);
    tracing::info!(channel = %channel, "Subscribed to invalidation channel");
    resync_after_subscribe(registry);

    let mut stream = pubsub.on_message();
    while let Some(msg) = stream.next().await {
        let payload: String = match msg.get_payload() {
            Ok(payload) => payload,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to read invalidation payload");
                continue;
            }
        };

        match InvalidationMessage::from_json(&payload) {
            Ok(message) if message.is_from(node_id) => {}
            Ok(message) => {
                tracing::debug!(
                    cache = %message.cache,
                    key = ?message.key,
                    origin = ?message.origin,
                    "received invalidation"
                );
                registry.dispatch(&message);
            }
            Err(e) => {
                tracing::warn!(error = %e, "Ignoring malformed invalidation message");
            }
        }
    }

    Err(DomainError::bus("Pub/sub connection closed"))
}

/// Drops whatever was cached while no subscription was held
///
/// Stores are usable as soon as `connect` returns, before the first SUBSCRIBE,
/// so the first subscription gets the same treatment as a reconnect.
fn resync_after_subscribe(registry: &SubscriptionRegistry) {
    let caches = registry.cache_names();
    if caches.is_empty() {
        return;
    }

    tracing::warn!(
        caches = ?caches,
        "Invalidation subscription established; purging subscribed caches"
    );
    registry.purge_all();
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    #[test]
    fn test_config_defaults() {
        let config = RedisBusConfig::new("redis://localhost:6379");
        assert_eq!(config.channel, crate::infrastructure::bus::DEFAULT_CHANNEL);
        assert_eq!(config.queue_capacity, 1024);
        assert_eq!(config.clone().with_queue_capacity(8).queue_capacity, 8);

        let config = config.with_channel("custom:invalidate");
        assert_eq!(config.channel, "custom:invalidate");
    }

    #[test]
    fn test_every_subscribe_purges_subscribed_caches() {
        let registry = SubscriptionRegistry::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        registry.register(
            "roles",
            Arc::new(move |message: &InvalidationMessage| sink.lock().push(message.clone())),
        );

        // first subscription after connect
        resync_after_subscribe(&registry);
        // reconnect
        resync_after_subscribe(&registry);

        let seen = seen.lock();
        assert_eq!(seen.len(), 2);
        assert!(seen.iter().all(|m| m.cache == "roles" && m.key.is_none()));
    }

    #[test]
    fn test_subscribe_with_no_caches_is_quiet() {
        resync_after_subscribe(&SubscriptionRegistry::new());
    }

    #[tokio::test]
    async fn test_full_queue_drops_instead_of_growing() {
        let (outbound, mut inbound) = mpsc::channel(1);

        enqueue(&outbound, InvalidationMessage::key("roles", "admin")).unwrap();
        let overflow = enqueue(&outbound, InvalidationMessage::key("roles", "viewer"));
        assert!(matches!(overflow, Err(DomainError::Bus { .. })));

        let queued = inbound.recv().await.unwrap();
        assert_eq!(queued.key.as_deref(), Some("admin"));
        assert!(inbound.try_recv().is_err());

        enqueue(&outbound, InvalidationMessage::key("roles", "viewer")).unwrap();
    }

    #[tokio::test]
    async fn test_stopped_publisher_is_reported() {
        let (outbound, inbound) = mpsc::channel(4);
        drop(inbound);

        let result = enqueue(&outbound, InvalidationMessage::purge("roles"));
        assert!(matches!(result, Err(DomainError::Bus { .. })));
    }

    #[tokio::test]
    async fn test_invalid_url_is_rejected() {
        let result = RedisInvalidationBus::connect(RedisBusConfig::new("not a url"), "node-a").await;
        assert!(matches!(result, Err(DomainError::Bus { .. })));
    }

    #[tokio::test]
    #[ignore = "requires a running Redis at REDIS_URL"]
    async fn test_two_nodes_over_redis() {
        let url = std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://127.0.0.1:6379".into());
        let config = RedisBusConfig::new(url).with_channel("store_cache:test");

        let node_a = RedisInvalidationBus::connect(config.clone(), "node-a").await.unwrap();
        let node_b = RedisInvalidationBus::connect(config, "node-b").await.unwrap();

        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        node_b
            .subscribe(
                "roles",
                Arc::new(move |message: &InvalidationMessage| sink.lock().push(message.clone())),
            )
            .unwrap();

        tokio::time::timeout(Duration::from_secs(5), async {
            while !node_b.is_connected() {
                tokio::time::sleep(Duration::from_millis(20)).await;
            }
        })
        .await
        .unwrap();

        node_a.publish(InvalidationMessage::key("roles", "admin")).unwrap();

        tokio::time::timeout(Duration::from_secs(5), async {
            while seen.lock().is_empty() {
                tokio::time::sleep(Duration::from_millis(20)).await;
            }
        })
        .await
        .unwrap();

        assert_eq!(seen.lock()[0].origin.as_deref(), Some("node-a"));
    }
}
