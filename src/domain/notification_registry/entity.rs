use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::cache::CacheableEntity;
use crate::domain::storage::{StorageEntity, StorageKey};
use crate::domain::DomainError;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AckId(String);

impl AckId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for AckId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl StorageKey for AckId {
    fn as_str(&self) -> &str {
        &self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum NotificationType {
    #[default]
    Message,
    Clear,
    UpdateBadge,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SendStatus {
    #[default]
    Pending,
    Sent,
    Received,
    NotSent,
    Failed,
}

/// Delivery record for a push notification, acknowledged by the device later
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationRegistry {
    #[serde(default)]
    ack_id: AckId,
    user_id: String,
    device_id: String,
    #[serde(default)]
    post_id: Option<String>,
    #[serde(default)]
    notification_type: NotificationType,
    #[serde(default)]
    send_status: SendStatus,
    #[serde(default)]
    error: Option<String>,
    created_at: DateTime<Utc>,
    #[serde(default)]
    received_at: Option<DateTime<Utc>>,
}

impl NotificationRegistry {
    pub fn new(user_id: impl Into<String>, device_id: impl Into<String>) -> Self {
        Self {
            ack_id: AckId::default(),
            user_id: user_id.into(),
            device_id: device_id.into(),
            post_id: None,
            notification_type: NotificationType::default(),
            send_status: SendStatus::default(),
            error: None,
            created_at: Utc::now(),
            received_at: None,
        }
    }

    pub fn with_ack_id(mut self, ack_id: impl Into<String>) -> Self {
        self.ack_id = AckId::new(ack_id);
        self
    }

    pub fn with_post_id(mut self, post_id: impl Into<String>) -> Self {
        self.post_id = Some(post_id.into());
        self
    }

    pub fn with_type(mut self, notification_type: NotificationType) -> Self {
        self.notification_type = notification_type;
        self
    }

    pub fn ack_id(&self) -> &AckId {
        &self.ack_id
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn device_id(&self) -> &str {
        &self.device_id
    }

    pub fn post_id(&self) -> Option<&str> {
        self.post_id.as_deref()
    }

    pub fn notification_type(&self) -> NotificationType {
        self.notification_type
    }

    pub fn send_status(&self) -> SendStatus {
        self.send_status
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn received_at(&self) -> Option<DateTime<Utc>> {
        self.received_at
    }

    pub fn mark_sent(&mut self) {
        self.send_status = SendStatus::Sent;
        self.error = None;
    }

    pub fn mark_failed(&mut self, error: impl Into<String>) {
        self.send_status = SendStatus::Failed;
        self.error = Some(error.into());
    }

    /// Records the device acknowledgement
    pub fn mark_received(&mut self) {
        self.send_status = SendStatus::Received;
        self.received_at = Some(Utc::now());
    }
}

impl StorageEntity for NotificationRegistry {
    type Key = AckId;

    fn key(&self) -> &Self::Key {
        &self.ack_id
    }

    fn assign_generated_key(&mut self) {
        if self.ack_id.is_unset() {
            self.ack_id = AckId::new(Uuid::new_v4().simple().to_string());
        }
    }

    fn validate(&self) -> Result<(), DomainError> {
        if self.user_id.is_empty() {
            return Err(DomainError::validation("Notification must target a user"));
        }

        if self.device_id.is_empty() {
            return Err(DomainError::validation("Notification must target a device"));
        }

        if self.notification_type == NotificationType::Message && self.post_id.is_none() {
            return Err(DomainError::validation("Message notifications require a post id"));
        }

        Ok(())
    }
}

impl CacheableEntity for NotificationRegistry {
    const CACHE_NAME: &'static str = "notification_registries";
}
