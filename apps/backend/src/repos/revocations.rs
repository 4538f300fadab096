use std::time::Duration;

use async_trait::async_trait;

use crate::errors::DomainError;

/// Set of revoked token markers. Markers expire on their own; nothing in the
/// application deletes them.
#[async_trait]
pub trait RevocationLedger: Send + Sync {
    async fn revoke(&self, token: &str, ttl: Duration) -> Result<(), DomainError>;

    /// Insert the marker only if none exists. `true` means this caller wrote
    /// it; single-use tokens are consumed by whoever wins.
    async fn claim(&self, token: &str, ttl: Duration) -> Result<bool, DomainError>;

    async fn is_revoked(&self, token: &str) -> Result<bool, DomainError>;
}

/// Storage key for a token's marker: BLAKE3 of the raw token, hex encoded.
pub fn marker_key(token: &str) -> String {
    blake3::hash(token.as_bytes()).to_hex().to_string()
}
