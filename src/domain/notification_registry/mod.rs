//! Push notification registry domain module

mod entity;

pub use entity::{AckId, NotificationRegistry, NotificationType, SendStatus};
