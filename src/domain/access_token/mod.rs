//! User access token domain module

mod entity;

pub use entity::{AccessTokenId, UserAccessToken};
