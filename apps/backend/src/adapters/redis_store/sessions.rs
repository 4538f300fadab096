use std::time::Duration;

use async_trait::async_trait;
use redis::aio::ConnectionManager;

use super::{bounded, decode_json, encode_json, ttl_millis};
use crate::errors::DomainError;
use crate::repos::sessions::{newest_first, SessionFilter, SessionLogin, SessionRecord, SessionRepo};

/// Records live at `{ns}:session:{external_id}` with a TTL of the retention
/// window. `{ns}:sessions:by_login` is a sorted set of external ids scored by
/// last-login, used for ordered listing.
#[derive(Clone)]
pub struct RedisSessionRepo {
    conn: ConnectionManager,
    namespace: String,
}

impl RedisSessionRepo {
    pub fn new(conn: ConnectionManager, namespace: impl Into<String>) -> Self {
        Self {
            conn,
            namespace: namespace.into(),
        }
    }

    fn record_key(&self, external_id: &str) -> String {
        format!("{}:session:{external_id}", self.namespace)
    }

    fn index_key(&self) -> String {
        format!("{}:sessions:by_login", self.namespace)
    }
}

#[async_trait]
impl SessionRepo for RedisSessionRepo {
    async fn upsert_login(
        &self,
        login: SessionLogin,
        retention: Duration,
    ) -> Result<SessionRecord, DomainError> {
        let key = self.record_key(&login.external_id);
        let mut conn = self.conn.clone();

        let existing = bounded(
            "session_get",
            redis::cmd("GET").arg(&key).query_async::<Option<String>>(&mut conn),
        )
        .await?
        .map(|raw| decode_json::<SessionRecord>(&key, &raw))
        .transpose()?;

        let record = login.apply(existing.as_ref());
        let body = encode_json(&record)?;
        let cutoff = record.last_login.unix_timestamp()
            - i64::try_from(retention.as_secs()).unwrap_or(i64::MAX);

        // Index entries older than the retention window point at expired
        // records; trim them with the write.
        bounded(
            "session_upsert",
            redis::pipe()
                .atomic()
                .cmd("SET")
                .arg(&key)
                .arg(body)
                .arg("PX")
                .arg(ttl_millis(retention))
                .ignore()
                .cmd("ZADD")
                .arg(self.index_key())
                .arg(record.last_login.unix_timestamp())
                .arg(&record.external_id)
                .ignore()
                .cmd("ZREMRANGEBYSCORE")
                .arg(self.index_key())
                .arg("-inf")
                .arg(format!("({cutoff}"))
                .ignore()
                .query_async::<()>(&mut conn),
        )
        .await?;
        Ok(record)
    }

    async fn list(
        &self,
        filter: &SessionFilter,
        limit: usize,
    ) -> Result<Vec<SessionRecord>, DomainError> {
        let mut conn = self.conn.clone();

        let ids: Vec<String> = match &filter.external_id {
            Some(id) => vec![id.clone()],
            None => {
                bounded(
                    "session_index",
                    redis::cmd("ZREVRANGEBYSCORE")
                        .arg(self.index_key())
                        .arg("+inf")
                        .arg("-inf")
                        .query_async::<Vec<String>>(&mut conn),
                )
                .await?
            }
        };
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let keys: Vec<String> = ids.iter().map(|id| self.record_key(id)).collect();
        let raws = bounded(
            "session_mget",
            redis::cmd("MGET")
                .arg(&keys)
                .query_async::<Vec<Option<String>>>(&mut conn),
        )
        .await?;

        let mut records = Vec::new();
        for (key, raw) in keys.iter().zip(raws) {
            // Missing means the record already expired.
            let Some(raw) = raw else { continue };
            let record: SessionRecord = decode_json(key, &raw)?;
            if filter.matches(&record) {
                records.push(record);
            }
        }
        Ok(newest_first(records, limit))
    }
}
