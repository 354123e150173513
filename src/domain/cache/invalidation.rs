//! Cluster-wide invalidation contract

use std::fmt::Debug;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::domain::DomainError;

/// "Drop key K in cache C" or, with no key, "purge cache C" on every node
///
/// Applying a message is idempotent, and messages for unrelated keys commute.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvalidationMessage {
    pub cache: String,
    #[serde(default)]
    pub key: Option<String>,
    /// Node that published the message, stamped by the bus
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub origin: Option<String>,
}

impl InvalidationMessage {
    pub fn key(cache: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            cache: cache.into(),
            key: Some(key.into()),
            origin: None,
        }
    }

    pub fn purge(cache: impl Into<String>) -> Self {
        Self {
            cache: cache.into(),
            key: None,
            origin: None,
        }
    }

    pub fn with_origin(mut self, origin: impl Into<String>) -> Self {
        self.origin = Some(origin.into());
        self
    }

    pub fn is_purge(&self) -> bool {
        self.key.is_none()
    }

    /// Whether the message was published by `node_id`
    pub fn is_from(&self, node_id: &str) -> bool {
        self.origin.as_deref() == Some(node_id)
    }

    pub fn to_json(&self) -> Result<String, DomainError> {
        serde_json::to_string(self)
            .map_err(|e| DomainError::bus(format!("Failed to encode invalidation: {}", e)))
    }

    pub fn from_json(payload: &str) -> Result<Self, DomainError> {
        let message: Self = serde_json::from_str(payload)
            .map_err(|e| DomainError::bus(format!("Malformed invalidation message: {}", e)))?;

        if message.cache.is_empty() {
            return Err(DomainError::bus("Invalidation message has an empty cache name"));
        }

        Ok(message)
    }
}

/// Callback run for inbound messages addressed to one named cache
pub type InvalidationHandler = Arc<dyn Fn(&InvalidationMessage) + Send + Sync>;

/// Best-effort broadcast of invalidations to every other node
///
/// `publish` hands the message to the transport and returns without waiting
/// for remote nodes. Handlers run on a background task, never on the
/// publisher's call stack, and a node's own echoes are not delivered back to it.
pub trait InvalidationBus: Send + Sync + Debug {
    /// Identifier stamped as `origin` on every published message
    fn node_id(&self) -> &str;

    fn publish(&self, message: InvalidationMessage) -> Result<(), DomainError>;

    fn subscribe(&self, cache_name: &str, handler: InvalidationHandler)
        -> Result<(), DomainError>;
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_message_wire_format() {
        let message = InvalidationMessage::key("roles", "admin").with_origin("node-a");
        let json = message.to_json().unwrap();

        assert_eq!(json, r#"{"cache":"roles","key":"admin","origin":"node-a"}"#);
        assert_eq!(InvalidationMessage::from_json(&json).unwrap(), message);
    }

    #[test]
    fn test_purge_message_has_null_key() {
        let message = InvalidationMessage::purge("roles");
        assert!(message.is_purge());
        assert_eq!(message.to_json().unwrap(), r#"{"cache":"roles","key":null}"#);
    }

    #[test]
    fn test_missing_key_field_decodes_as_purge() {
        let message = InvalidationMessage::from_json(r#"{"cache":"roles"}"#).unwrap();
        assert!(message.is_purge());
        assert!(message.origin.is_none());
    }

    #[test]
    fn test_malformed_payloads_rejected() {
        assert!(InvalidationMessage::from_json("not json").is_err());
        assert!(InvalidationMessage::from_json(r#"{"key":"admin"}"#).is_err());
        assert!(InvalidationMessage::from_json(r#"{"cache":""}"#).is_err());
    }

    #[test]
    fn test_is_from() {
        let message = InvalidationMessage::key("roles", "admin").with_origin("node-a");
        assert!(message.is_from("node-a"));
        assert!(!message.is_from("node-b"));
        assert!(!InvalidationMessage::purge("roles").is_from("node-a"));
    }
}
