use async_trait::async_trait;
use redis::aio::ConnectionManager;

use super::{bounded, decode_json, encode_json};
use crate::domain::{CustomerId, Role};
use crate::errors::{ConflictKind, DomainError, NotFoundKind};
use crate::repos::subjects::{NewSubject, Subject, SubjectRepo};

/// Daily counters outlive their day by a margin, then expire.
const SEQUENCE_TTL_SECS: u64 = 2 * 86_400;

/// Layout:
/// - `{ns}:subject:{external_id}` JSON document
/// - `{ns}:subject:cid:{customer_id}` → external id (unique, `SET NX`)
/// - `{ns}:subject:email:{email}` → external id
/// - `{ns}:subject:seq:{yyMMdd}` daily counter (`INCR`)
#[derive(Clone)]
pub struct RedisSubjectRepo {
    conn: ConnectionManager,
    namespace: String,
}

impl RedisSubjectRepo {
    pub fn new(conn: ConnectionManager, namespace: impl Into<String>) -> Self {
        Self {
            conn,
            namespace: namespace.into(),
        }
    }

    fn doc_key(&self, external_id: &str) -> String {
        format!("{}:subject:{external_id}", self.namespace)
    }

    fn cid_key(&self, id: &CustomerId) -> String {
        format!("{}:subject:cid:{id}", self.namespace)
    }

    fn email_key(&self, email: &str) -> String {
        format!("{}:subject:email:{email}", self.namespace)
    }

    fn seq_key(&self, day: &str) -> String {
        format!("{}:subject:seq:{day}", self.namespace)
    }

    async fn get_string(&self, op: &'static str, key: String) -> Result<Option<String>, DomainError> {
        let mut conn = self.conn.clone();
        bounded(op, redis::cmd("GET").arg(key).query_async::<Option<String>>(&mut conn)).await
    }

    async fn set_nx(&self, op: &'static str, key: String, value: &str) -> Result<bool, DomainError> {
        let mut conn = self.conn.clone();
        let reply = bounded(
            op,
            redis::cmd("SET")
                .arg(key)
                .arg(value)
                .arg("NX")
                .query_async::<Option<String>>(&mut conn),
        )
        .await?;
        Ok(reply.is_some())
    }

    async fn del(&self, op: &'static str, key: String) -> Result<(), DomainError> {
        let mut conn = self.conn.clone();
        bounded(op, redis::cmd("DEL").arg(key).query_async::<()>(&mut conn)).await
    }

    async fn write_doc(&self, subject: &Subject) -> Result<(), DomainError> {
        let body = encode_json(subject)?;
        let mut conn = self.conn.clone();
        bounded(
            "subject_write",
            redis::cmd("SET")
                .arg(self.doc_key(&subject.external_id))
                .arg(body)
                .query_async::<()>(&mut conn),
        )
        .await
    }

    async fn load_by_customer_id(&self, id: &CustomerId) -> Result<Subject, DomainError> {
        self.find_by_customer_id(id)
            .await?
            .ok_or_else(|| DomainError::not_found(NotFoundKind::Subject, id.to_string()))
    }
}

#[async_trait]
impl SubjectRepo for RedisSubjectRepo {
    async fn find_by_external_id(
        &self,
        external_id: &str,
    ) -> Result<Option<Subject>, DomainError> {
        let key = self.doc_key(external_id);
        match self.get_string("subject_get", key.clone()).await? {
            Some(raw) => decode_json(&key, &raw).map(Some),
            None => Ok(None),
        }
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<Subject>, DomainError> {
        match self.get_string("subject_email", self.email_key(email)).await? {
            Some(ext) => self.find_by_external_id(&ext).await,
            None => Ok(None),
        }
    }

    async fn find_by_customer_id(&self, id: &CustomerId) -> Result<Option<Subject>, DomainError> {
        match self.get_string("subject_cid", self.cid_key(id)).await? {
            Some(ext) => self.find_by_external_id(&ext).await,
            None => Ok(None),
        }
    }

    async fn insert(&self, new: NewSubject) -> Result<Subject, DomainError> {
        let subject = Subject::from(new);
        let body = encode_json(&subject)?;

        if !self
            .set_nx("subject_reserve_cid", self.cid_key(&subject.customer_id), &subject.external_id)
            .await?
        {
            return Err(DomainError::conflict(
                ConflictKind::CustomerId,
                subject.customer_id.to_string(),
            ));
        }

        let claimed = match self
            .set_nx("subject_insert", self.doc_key(&subject.external_id), &body)
            .await
        {
            Ok(claimed) => claimed,
            Err(err) => {
                let _ = self
                    .del("subject_release_cid", self.cid_key(&subject.customer_id))
                    .await;
                return Err(err);
            }
        };
        if !claimed {
            self.del("subject_release_cid", self.cid_key(&subject.customer_id))
                .await?;
            return Err(DomainError::conflict(
                ConflictKind::ExternalId,
                subject.external_id,
            ));
        }

        if let Some(email) = &subject.email {
            let mut conn = self.conn.clone();
            bounded(
                "subject_index_email",
                redis::cmd("SET")
                    .arg(self.email_key(email))
                    .arg(&subject.external_id)
                    .query_async::<()>(&mut conn),
            )
            .await?;
        }
        Ok(subject)
    }

    async fn update_display_name(
        &self,
        id: &CustomerId,
        display_name: Option<String>,
    ) -> Result<Subject, DomainError> {
        let mut subject = self.load_by_customer_id(id).await?;
        subject.display_name = display_name;
        self.write_doc(&subject).await?;
        Ok(subject)
    }

    async fn set_role(&self, id: &CustomerId, role: Role) -> Result<Subject, DomainError> {
        let mut subject = self.load_by_customer_id(id).await?;
        subject.role = role;
        self.write_doc(&subject).await?;
        Ok(subject)
    }

    async fn set_password_hash(&self, id: &CustomerId, hash: String) -> Result<(), DomainError> {
        let mut subject = self.load_by_customer_id(id).await?;
        subject.password_hash = Some(hash);
        self.write_doc(&subject).await
    }

    async fn delete(&self, id: &CustomerId) -> Result<(), DomainError> {
        let subject = self.load_by_customer_id(id).await?;
        let mut keys = vec![self.doc_key(&subject.external_id), self.cid_key(id)];
        if let Some(email) = &subject.email {
            let owner = self.get_string("subject_email", self.email_key(email)).await?;
            if owner.as_deref() == Some(subject.external_id.as_str()) {
                keys.push(self.email_key(email));
            }
        }
        let mut conn = self.conn.clone();
        bounded(
            "subject_delete",
            redis::cmd("DEL").arg(keys).query_async::<()>(&mut conn),
        )
        .await
    }

    async fn next_daily_sequence(&self, day: &str) -> Result<u64, DomainError> {
        let key = self.seq_key(day);
        let mut conn = self.conn.clone();
        let (seq,): (u64,) = bounded(
            "subject_sequence",
            redis::pipe()
                .atomic()
                .cmd("INCR")
                .arg(&key)
                .cmd("EXPIRE")
                .arg(&key)
                .arg(SEQUENCE_TTL_SECS)
                .ignore()
                .query_async(&mut conn),
        )
        .await?;
        Ok(seq)
    }

    async fn ping(&self) -> Result<(), DomainError> {
        let mut conn = self.conn.clone();
        bounded("ping", redis::cmd("PING").query_async::<String>(&mut conn))
            .await
            .map(|_| ())
    }
}
