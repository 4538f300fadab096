//! In-process stores for development and tests. Expiry is moka's per-entry
//! TTL; nothing here sweeps.

use std::time::{Duration, Instant};

use moka::Expiry;

mod ephemeral;
mod revocations;
mod sessions;
mod subjects;

pub use ephemeral::MemoryEphemeralStore;
pub use revocations::MemoryRevocationLedger;
pub use sessions::MemorySessionRepo;
pub use subjects::MemorySubjectRepo;

/// A cached value with the lifetime it was written with.
#[derive(Debug, Clone)]
pub(crate) struct Timed<V> {
    pub value: V,
    pub ttl: Duration,
}

impl<V> Timed<V> {
    pub fn new(value: V, ttl: Duration) -> Self {
        Self { value, ttl }
    }
}

/// Expire each entry `ttl` after its latest write.
pub(crate) struct PerEntryTtl;

impl<K, V> Expiry<K, Timed<V>> for PerEntryTtl {
    fn expire_after_create(
        &self,
        _key: &K,
        value: &Timed<V>,
        _created_at: Instant,
    ) -> Option<Duration> {
        Some(value.ttl)
    }

    fn expire_after_update(
        &self,
        _key: &K,
        value: &Timed<V>,
        _updated_at: Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        Some(value.ttl)
    }
}
