//! Redis-backed stores. Expiry uses Redis key TTLs. Every command runs
//! under [`STORE_TIMEOUT`] and failures surface as `Unavailable`.

use std::future::Future;
use std::time::Duration;

use redis::aio::ConnectionManager;
use redis::{Client, RedisError};
use tracing::warn;

use crate::errors::{DomainError, InfraErrorKind};

mod ephemeral;
mod revocations;
mod sessions;
mod subjects;

pub use ephemeral::RedisEphemeralStore;
pub use revocations::RedisRevocationLedger;
pub use sessions::RedisSessionRepo;
pub use subjects::RedisSubjectRepo;

pub const STORE_TIMEOUT: Duration = Duration::from_secs(2);

/// Open a managed connection. Invalid URLs are configuration errors.
pub async fn connect(redis_url: &str) -> Result<ConnectionManager, DomainError> {
    let client = Client::open(redis_url)
        .map_err(|err| DomainError::config(format!("Invalid REDIS_URL: {err}")))?;
    tokio::time::timeout(STORE_TIMEOUT, ConnectionManager::new(client))
        .await
        .map_err(|_| {
            DomainError::unavailable(InfraErrorKind::Timeout, "timed out connecting to Redis")
        })?
        .map_err(|err| map_redis_err("connect", err))
}

fn map_redis_err(op: &'static str, err: RedisError) -> DomainError {
    warn!(op, error = %err, "redis command failed");
    DomainError::unavailable(InfraErrorKind::StoreUnavailable, format!("redis {op}: {err}"))
}

/// Run one Redis round trip with the store timeout applied.
pub(crate) async fn bounded<T, F>(op: &'static str, fut: F) -> Result<T, DomainError>
where
    F: Future<Output = Result<T, RedisError>>,
{
    match tokio::time::timeout(STORE_TIMEOUT, fut).await {
        Ok(result) => result.map_err(|err| map_redis_err(op, err)),
        Err(_) => {
            warn!(op, "redis command timed out");
            Err(DomainError::unavailable(
                InfraErrorKind::Timeout,
                format!("redis {op}: timed out"),
            ))
        }
    }
}

/// Redis TTLs are whole units; never round a live artifact down to zero.
pub(crate) fn ttl_millis(ttl: Duration) -> u64 {
    u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX).max(1)
}

pub(crate) fn decode_json<T: serde::de::DeserializeOwned>(
    key: &str,
    raw: &str,
) -> Result<T, DomainError> {
    serde_json::from_str(raw).map_err(|err| {
        DomainError::unavailable(
            InfraErrorKind::DataCorruption,
            format!("undecodable value at {key}: {err}"),
        )
    })
}

pub(crate) fn encode_json<T: serde::Serialize>(value: &T) -> Result<String, DomainError> {
    serde_json::to_string(value).map_err(|err| {
        DomainError::unavailable(
            InfraErrorKind::DataCorruption,
            format!("unencodable value: {err}"),
        )
    })
}
