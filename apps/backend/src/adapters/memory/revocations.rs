use std::time::Duration;

use async_trait::async_trait;
use moka::future::Cache;

use super::{PerEntryTtl, Timed};
use crate::errors::DomainError;
use crate::repos::revocations::{marker_key, RevocationLedger};

#[derive(Clone)]
pub struct MemoryRevocationLedger {
    markers: Cache<String, Timed<()>>,
}

impl MemoryRevocationLedger {
    pub fn new() -> Self {
        Self {
            markers: Cache::builder().expire_after(PerEntryTtl).build(),
        }
    }
}

impl Default for MemoryRevocationLedger {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RevocationLedger for MemoryRevocationLedger {
    async fn revoke(&self, token: &str, ttl: Duration) -> Result<(), DomainError> {
        self.markers
            .insert(marker_key(token), Timed::new((), ttl))
            .await;
        Ok(())
    }

    async fn claim(&self, token: &str, ttl: Duration) -> Result<bool, DomainError> {
        let entry = self
            .markers
            .entry(marker_key(token))
            .or_insert_with(async move { Timed::new((), ttl) })
            .await;
        Ok(entry.is_fresh())
    }

    async fn is_revoked(&self, token: &str) -> Result<bool, DomainError> {
        Ok(self.markers.get(&marker_key(token)).await.is_some())
    }
}
