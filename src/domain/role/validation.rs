//! Role validation

use thiserror::Error;

/// Errors that can occur during role validation
#[derive(Debug, Error, Clone, PartialEq)]
pub enum RoleValidationError {
    #[error("Role name cannot be empty")]
    EmptyName,

    #[error("Role name cannot exceed {0} characters")]
    NameTooLong(usize),

    #[error("Role name can only contain lowercase letters, digits and underscores")]
    InvalidNameCharacters,

    #[error("Role display name cannot exceed {0} characters")]
    DisplayNameTooLong(usize),

    #[error("Role description cannot exceed {0} characters")]
    DescriptionTooLong(usize),

    #[error("Role permission names cannot be empty")]
    EmptyPermission,
}

const MAX_ROLE_NAME_LENGTH: usize = 64;
const MAX_DISPLAY_NAME_LENGTH: usize = 128;
const MAX_DESCRIPTION_LENGTH: usize = 1024;

/// Validate a role name
pub fn validate_role_name(name: &str) -> Result<(), RoleValidationError> {
    if name.is_empty() {
        return Err(RoleValidationError::EmptyName);
    }

    if name.len() > MAX_ROLE_NAME_LENGTH {
        return Err(RoleValidationError::NameTooLong(MAX_ROLE_NAME_LENGTH));
    }

    if !name
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
    {
        return Err(RoleValidationError::InvalidNameCharacters);
    }

    Ok(())
}

pub fn validate_display_name(display_name: &str) -> Result<(), RoleValidationError> {
    if display_name.chars().count() > MAX_DISPLAY_NAME_LENGTH {
        return Err(RoleValidationError::DisplayNameTooLong(MAX_DISPLAY_NAME_LENGTH));
    }

    Ok(())
}

pub fn validate_description(description: &str) -> Result<(), RoleValidationError> {
    if description.chars().count() > MAX_DESCRIPTION_LENGTH {
        return Err(RoleValidationError::DescriptionTooLong(MAX_DESCRIPTION_LENGTH));
    }

    Ok(())
}

pub fn validate_permissions(permissions: &[String]) -> Result<(), RoleValidationError> {
    if permissions.iter().any(|p| p.trim().is_empty()) {
        return Err(RoleValidationError::EmptyPermission);
    }

    Ok(())
}
