//! Last-login records, one per subject.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::errors::DomainError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoginMethod {
    IdentityProvider,
    Password,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionRecord {
    pub external_id: String,
    pub email: Option<String>,
    pub display_name: Option<String>,
    pub customer_id: String,
    pub login_method: LoginMethod,
    #[serde(with = "time::serde::rfc3339")]
    pub last_login: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// One successful authentication, as fed to `upsert_login`.
#[derive(Debug, Clone)]
pub struct SessionLogin {
    pub external_id: String,
    pub email: Option<String>,
    pub display_name: Option<String>,
    pub customer_id: String,
    pub login_method: LoginMethod,
    pub at: OffsetDateTime,
}

impl SessionLogin {
    /// Merge into an existing record, keeping its `created_at`.
    pub fn apply(self, existing: Option<&SessionRecord>) -> SessionRecord {
        SessionRecord {
            created_at: existing.map_or(self.at, |r| r.created_at),
            external_id: self.external_id,
            email: self.email,
            display_name: self.display_name,
            customer_id: self.customer_id,
            login_method: self.login_method,
            last_login: self.at,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct SessionFilter {
    pub external_id: Option<String>,
    /// Normalized email
    pub email: Option<String>,
}

impl SessionFilter {
    pub fn matches(&self, record: &SessionRecord) -> bool {
        self.external_id
            .as_deref()
            .is_none_or(|id| record.external_id == id)
            && self
                .email
                .as_deref()
                .is_none_or(|email| record.email.as_deref() == Some(email))
    }
}

#[async_trait]
pub trait SessionRepo: Send + Sync {
    /// Insert or refresh the record for `login.external_id`. The record
    /// expires `retention` after this call unless refreshed again.
    async fn upsert_login(
        &self,
        login: SessionLogin,
        retention: Duration,
    ) -> Result<SessionRecord, DomainError>;

    /// Matching records, newest `last_login` first, at most `limit`.
    async fn list(
        &self,
        filter: &SessionFilter,
        limit: usize,
    ) -> Result<Vec<SessionRecord>, DomainError>;
}

/// Sort newest first and truncate; shared by the adapters.
pub fn newest_first(mut records: Vec<SessionRecord>, limit: usize) -> Vec<SessionRecord> {
    records.sort_by(|a, b| {
        b.last_login
            .cmp(&a.last_login)
            .then_with(|| a.external_id.cmp(&b.external_id))
    });
    records.truncate(limit);
    records
}
