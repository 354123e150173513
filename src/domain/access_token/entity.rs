//! User access token entity

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::cache::CacheableEntity;
use crate::domain::storage::{StorageEntity, StorageKey};
use crate::domain::DomainError;

const MAX_DESCRIPTION_LENGTH: usize = 255;

/// Access token identifier, assigned by the store when left empty
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccessTokenId(String);

impl AccessTokenId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn generate() -> Self {
        Self(Uuid::new_v4().simple().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for AccessTokenId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl std::fmt::Display for AccessTokenId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl StorageKey for AccessTokenId {
    fn as_str(&self) -> &str {
        &self.0
    }
}

/// Personal access token issued to a user
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct UserAccessToken {
    #[serde(default)]
    id: AccessTokenId,
    token: String,
    user_id: String,
    #[serde(default)]
    description: String,
    #[serde(default = "default_active")]
    is_active: bool,
    created_at: DateTime<Utc>,
}

fn default_active() -> bool {
    true
}

impl UserAccessToken {
    /// Creates an active token with no id; the store assigns one on save
    pub fn new(user_id: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            id: AccessTokenId::default(),
            token: token.into(),
            user_id: user_id.into(),
            description: String::new(),
            is_active: true,
            created_at: Utc::now(),
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = AccessTokenId::new(id);
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn id(&self) -> &AccessTokenId {
        &self.id
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn is_active(&self) -> bool {
        self.is_active
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn disable(&mut self) {
        self.is_active = false;
    }

    pub fn enable(&mut self) {
        self.is_active = true;
    }
}

impl std::fmt::Debug for UserAccessToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UserAccessToken")
            .field("id", &self.id)
            .field("token", &"<redacted>")
            .field("user_id", &self.user_id)
            .field("is_active", &self.is_active)
            .finish()
    }
}

impl StorageEntity for UserAccessToken {
    type Key = AccessTokenId;

    fn key(&self) -> &Self::Key {
        &self.id
    }

    fn assign_generated_key(&mut self) {
        if self.id.is_unset() {
            self.id = AccessTokenId::generate();
        }
    }

    fn validate(&self) -> Result<(), DomainError> {
        if self.token.is_empty() {
            return Err(DomainError::validation("Access token value cannot be empty"));
        }

        if self.user_id.is_empty() {
            return Err(DomainError::validation("Access token must belong to a user"));
        }

        if self.description.chars().count() > MAX_DESCRIPTION_LENGTH {
            return Err(DomainError::validation(format!(
                "Access token description cannot exceed {} characters",
                MAX_DESCRIPTION_LENGTH
            )));
        }

        Ok(())
    }
}

impl CacheableEntity for UserAccessToken {
    const CACHE_NAME: &'static str = "user_access_tokens";
}
