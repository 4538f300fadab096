use std::time::Duration;

use async_trait::async_trait;

use crate::errors::DomainError;

/// Short-lived key/value artifacts (one-time codes and their indexes).
/// Values vanish after their TTL; a multi-instance deployment shares them
/// through the Redis implementation.
#[async_trait]
pub trait EphemeralStore: Send + Sync {
    async fn put(&self, key: &str, value: String, ttl: Duration) -> Result<(), DomainError>;

    /// Write only when the key is vacant. `true` means this caller owns it.
    async fn put_if_absent(
        &self,
        key: &str,
        value: String,
        ttl: Duration,
    ) -> Result<bool, DomainError>;

    async fn get(&self, key: &str) -> Result<Option<String>, DomainError>;

    /// Returns whether the key was present. Callers that consume an artifact
    /// only proceed when this is `true`, which makes consumption single use.
    async fn delete(&self, key: &str) -> Result<bool, DomainError>;
}
