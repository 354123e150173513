//! Role domain module
//!
//! Roles are small, read on nearly every permission check and rarely written,
//! which makes them the canonical cached entity kind.

mod entity;
mod validation;

pub use entity::{Role, RoleName};
pub use validation::{validate_role_name, RoleValidationError};
