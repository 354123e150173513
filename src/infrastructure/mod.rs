//! Infrastructure layer - Cache, bus and storage implementations

pub mod bus;
pub mod cache;
pub mod cached_store;
pub mod logging;
pub mod observability;
pub mod storage;
