use std::time::Duration;

use async_trait::async_trait;
use redis::aio::ConnectionManager;

use super::{bounded, ttl_millis};
use crate::errors::DomainError;
use crate::repos::ephemeral::EphemeralStore;

#[derive(Clone)]
pub struct RedisEphemeralStore {
    conn: ConnectionManager,
    namespace: String,
}

impl RedisEphemeralStore {
    pub fn new(conn: ConnectionManager, namespace: impl Into<String>) -> Self {
        Self {
            conn,
            namespace: namespace.into(),
        }
    }

    fn key(&self, key: &str) -> String {
        format!("{}:eph:{key}", self.namespace)
    }
}

#[async_trait]
impl EphemeralStore for RedisEphemeralStore {
    async fn put(&self, key: &str, value: String, ttl: Duration) -> Result<(), DomainError> {
        let mut conn = self.conn.clone();
        bounded(
            "eph_put",
            redis::cmd("SET")
                .arg(self.key(key))
                .arg(value)
                .arg("PX")
                .arg(ttl_millis(ttl))
                .query_async::<()>(&mut conn),
        )
        .await
    }

    async fn put_if_absent(
        &self,
        key: &str,
        value: String,
        ttl: Duration,
    ) -> Result<bool, DomainError> {
        let mut conn = self.conn.clone();
        let written = bounded(
            "eph_put_nx",
            redis::cmd("SET")
                .arg(self.key(key))
                .arg(value)
                .arg("NX")
                .arg("PX")
                .arg(ttl_millis(ttl))
                .query_async::<Option<String>>(&mut conn),
        )
        .await?;
        Ok(written.is_some())
    }

    async fn get(&self, key: &str) -> Result<Option<String>, DomainError> {
        let mut conn = self.conn.clone();
        bounded(
            "eph_get",
            redis::cmd("GET")
                .arg(self.key(key))
                .query_async::<Option<String>>(&mut conn),
        )
        .await
    }

    async fn delete(&self, key: &str) -> Result<bool, DomainError> {
        let mut conn = self.conn.clone();
        let removed = bounded(
            "eph_delete",
            redis::cmd("DEL")
                .arg(self.key(key))
                .query_async::<u64>(&mut conn),
        )
        .await?;
        Ok(removed > 0)
    }
}
