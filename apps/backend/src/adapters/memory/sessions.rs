use std::time::Duration;

use async_trait::async_trait;
use moka::future::Cache;
use moka::ops::compute::Op;

use super::{PerEntryTtl, Timed};
use crate::errors::{DomainError, InfraErrorKind};
use crate::repos::sessions::{newest_first, SessionFilter, SessionLogin, SessionRecord, SessionRepo};

#[derive(Clone)]
pub struct MemorySessionRepo {
    records: Cache<String, Timed<SessionRecord>>,
}

impl MemorySessionRepo {
    pub fn new() -> Self {
        Self {
            records: Cache::builder().expire_after(PerEntryTtl).build(),
        }
    }
}

impl Default for MemorySessionRepo {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SessionRepo for MemorySessionRepo {
    async fn upsert_login(
        &self,
        login: SessionLogin,
        retention: Duration,
    ) -> Result<SessionRecord, DomainError> {
        let key = login.external_id.clone();
        // and_compute_with serializes writers per key, so created_at survives
        // concurrent logins.
        let result = self
            .records
            .entry(key)
            .and_compute_with(|existing| {
                let record = login.apply(existing.as_ref().map(|e| &e.value().value));
                std::future::ready(Op::Put(Timed::new(record, retention)))
            })
            .await;

        result
            .into_entry()
            .map(|entry| entry.into_value().value)
            .ok_or_else(|| {
                DomainError::unavailable(InfraErrorKind::DataCorruption, "session upsert lost its record")
            })
    }

    async fn list(
        &self,
        filter: &SessionFilter,
        limit: usize,
    ) -> Result<Vec<SessionRecord>, DomainError> {
        let matching = self
            .records
            .iter()
            .map(|(_, timed)| timed.value)
            .filter(|record| filter.matches(record))
            .collect();
        Ok(newest_first(matching, limit))
    }
}
