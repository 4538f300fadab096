use std::time::Duration;

use async_trait::async_trait;
use redis::aio::ConnectionManager;

use super::{bounded, ttl_millis};
use crate::errors::DomainError;
use crate::repos::revocations::{marker_key, RevocationLedger};

#[derive(Clone)]
pub struct RedisRevocationLedger {
    conn: ConnectionManager,
    namespace: String,
}

impl RedisRevocationLedger {
    pub fn new(conn: ConnectionManager, namespace: impl Into<String>) -> Self {
        Self {
            conn,
            namespace: namespace.into(),
        }
    }

    fn key(&self, token: &str) -> String {
        format!("{}:revoked:{}", self.namespace, marker_key(token))
    }
}

#[async_trait]
impl RevocationLedger for RedisRevocationLedger {
    async fn revoke(&self, token: &str, ttl: Duration) -> Result<(), DomainError> {
        let mut conn = self.conn.clone();
        bounded(
            "revoke",
            redis::cmd("SET")
                .arg(self.key(token))
                .arg(1)
                .arg("PX")
                .arg(ttl_millis(ttl))
                .query_async::<()>(&mut conn),
        )
        .await
    }

    async fn claim(&self, token: &str, ttl: Duration) -> Result<bool, DomainError> {
        let mut conn = self.conn.clone();
        let written = bounded(
            "claim",
            redis::cmd("SET")
                .arg(self.key(token))
                .arg(1)
                .arg("NX")
                .arg("PX")
                .arg(ttl_millis(ttl))
                .query_async::<Option<String>>(&mut conn),
        )
        .await?;
        Ok(written.is_some())
    }

    async fn is_revoked(&self, token: &str) -> Result<bool, DomainError> {
        let mut conn = self.conn.clone();
        bounded(
            "is_revoked",
            redis::cmd("EXISTS")
                .arg(self.key(token))
                .query_async::<bool>(&mut conn),
        )
        .await
    }
}
