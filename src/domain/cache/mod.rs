//! Cache domain - Entries, cacheable entities and cluster invalidation

mod cacheable;
mod entry;
mod invalidation;

pub use cacheable::CacheableEntity;
pub use entry::{CacheEntry, CacheEntryMeta};
pub use invalidation::{InvalidationBus, InvalidationHandler, InvalidationMessage};

#[cfg(test)]
pub use invalidation::mock::RecordingBus;
