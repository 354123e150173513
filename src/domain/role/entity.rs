//! Role entity and related types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::validation::{
    validate_description, validate_display_name, validate_permissions, validate_role_name,
};
use crate::domain::cache::CacheableEntity;
use crate::domain::storage::{StorageEntity, StorageKey};
use crate::domain::DomainError;

/// Role name - the key roles are looked up and cached by
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoleName(String);

impl RoleName {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for RoleName {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl std::fmt::Display for RoleName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl StorageKey for RoleName {
    fn as_str(&self) -> &str {
        &self.0
    }
}

/// A named set of permissions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Role {
    id: String,
    name: RoleName,
    #[serde(default)]
    display_name: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    permissions: Vec<String>,
    /// Managed by a permission scheme rather than edited directly
    #[serde(default)]
    scheme_managed: bool,
    #[serde(default)]
    built_in: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl Role {
    pub fn new(name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            name: RoleName::new(name),
            display_name: String::new(),
            description: String::new(),
            permissions: Vec::new(),
            scheme_managed: false,
            built_in: false,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_display_name(mut self, display_name: impl Into<String>) -> Self {
        self.display_name = display_name.into();
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_permissions(mut self, permissions: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.permissions = permissions.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_scheme_managed(mut self, scheme_managed: bool) -> Self {
        self.scheme_managed = scheme_managed;
        self
    }

    pub fn with_built_in(mut self, built_in: bool) -> Self {
        self.built_in = built_in;
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &RoleName {
        &self.name
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn permissions(&self) -> &[String] {
        &self.permissions
    }

    pub fn has_permission(&self, permission: &str) -> bool {
        self.permissions.iter().any(|p| p == permission)
    }

    pub fn is_scheme_managed(&self) -> bool {
        self.scheme_managed
    }

    pub fn is_built_in(&self) -> bool {
        self.built_in
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Replaces the permission set and bumps `updated_at`
    pub fn set_permissions(&mut self, permissions: impl IntoIterator<Item = impl Into<String>>) {
        self.permissions = permissions.into_iter().map(Into::into).collect();
        self.updated_at = Utc::now();
    }
}

impl StorageEntity for Role {
    type Key = RoleName;

    fn key(&self) -> &Self::Key {
        &self.name
    }

    fn validate(&self) -> Result<(), DomainError> {
        validate_role_name(self.name.as_str())
            .and_then(|_| validate_display_name(&self.display_name))
            .and_then(|_| validate_description(&self.description))
            .and_then(|_| validate_permissions(&self.permissions))
            .map_err(|e| DomainError::validation(e.to_string()))
    }
}

impl CacheableEntity for Role {
    const CACHE_NAME: &'static str = "roles";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_builder() {
        let role = Role::new("team_admin")
            .with_display_name("Team Admin")
            .with_permissions(["manage_team", "add_user_to_team"])
            .with_scheme_managed(true);

        assert_eq!(role.name().as_str(), "team_admin");
        assert_eq!(role.key().as_str(), "team_admin");
        assert_eq!(role.display_name(), "Team Admin");
        assert!(role.has_permission("manage_team"));
        assert!(!role.has_permission("delete_team"));
        assert!(role.is_scheme_managed());
        assert!(!role.id().is_empty());
    }

    #[test]
    fn test_role_validate() {
        assert!(Role::new("system_user").validate().is_ok());

        let err = Role::new("").validate().unwrap_err();
        assert!(matches!(err, DomainError::Validation { .. }));

        let err = Role::new("ok_name")
            .with_description("d".repeat(2000))
            .validate()
            .unwrap_err();
        assert!(err.to_string().contains("description"));
    }

    #[test]
    fn test_role_cache_key_is_name() {
        let role = Role::new("channel_user");
        assert_eq!(Role::cache_key(role.key()), "channel_user");
        assert_eq!(Role::CACHE_NAME, "roles");
    }

    #[test]
    fn test_role_serde_roundtrip_keeps_name_transparent() {
        let role = Role::new("channel_admin").with_permissions(["manage_channel"]);
        let json = serde_json::to_value(&role).unwrap();

        assert_eq!(json["name"], "channel_admin");
        let back: Role = serde_json::from_value(json).unwrap();
        assert_eq!(back, role);
    }

    #[test]
    fn test_set_permissions_bumps_updated_at() {
        let mut role = Role::new("custom_role");
        let before = role.updated_at();
        role.set_permissions(["read_channel"]);

        assert!(role.updated_at() >= before);
        assert_eq!(role.permissions(), ["read_channel".to_string()]);
    }
}
