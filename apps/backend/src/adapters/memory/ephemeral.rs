use std::time::Duration;

use async_trait::async_trait;
use moka::future::Cache;

use super::{PerEntryTtl, Timed};
use crate::errors::DomainError;
use crate::repos::ephemeral::EphemeralStore;

#[derive(Clone)]
pub struct MemoryEphemeralStore {
    entries: Cache<String, Timed<String>>,
}

impl MemoryEphemeralStore {
    pub fn new() -> Self {
        Self {
            entries: Cache::builder().expire_after(PerEntryTtl).build(),
        }
    }
}

impl Default for MemoryEphemeralStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EphemeralStore for MemoryEphemeralStore {
    async fn put(&self, key: &str, value: String, ttl: Duration) -> Result<(), DomainError> {
        self.entries
            .insert(key.to_string(), Timed::new(value, ttl))
            .await;
        Ok(())
    }

    async fn put_if_absent(
        &self,
        key: &str,
        value: String,
        ttl: Duration,
    ) -> Result<bool, DomainError> {
        let entry = self
            .entries
            .entry(key.to_string())
            .or_insert_with(async move { Timed::new(value, ttl) })
            .await;
        Ok(entry.is_fresh())
    }

    async fn get(&self, key: &str) -> Result<Option<String>, DomainError> {
        Ok(self.entries.get(key).await.map(|t| t.value))
    }

    async fn delete(&self, key: &str) -> Result<bool, DomainError> {
        Ok(self.entries.remove(key).await.is_some())
    }
}
