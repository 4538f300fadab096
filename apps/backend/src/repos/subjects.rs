//! Subject records: one per external identity.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::domain::{CustomerId, Role};
use crate::errors::DomainError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subject {
    pub external_id: String,
    pub display_name: Option<String>,
    pub email: Option<String>,
    pub customer_id: CustomerId,
    pub role: Role,
    /// One-way hash; `None` until a password is set through recovery.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password_hash: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// Fields supplied when a subject is first created.
#[derive(Debug, Clone)]
pub struct NewSubject {
    pub external_id: String,
    pub display_name: Option<String>,
    pub email: Option<String>,
    pub customer_id: CustomerId,
    pub role: Role,
    pub created_at: OffsetDateTime,
}

impl From<NewSubject> for Subject {
    fn from(new: NewSubject) -> Self {
        Self {
            external_id: new.external_id,
            display_name: new.display_name,
            email: new.email,
            customer_id: new.customer_id,
            role: new.role,
            password_hash: None,
            created_at: new.created_at,
        }
    }
}

/// Each call is atomic on its own; nothing spans calls.
#[async_trait]
pub trait SubjectRepo: Send + Sync {
    async fn find_by_external_id(&self, external_id: &str)
        -> Result<Option<Subject>, DomainError>;

    /// `email` must already be normalized.
    async fn find_by_email(&self, email: &str) -> Result<Option<Subject>, DomainError>;

    async fn find_by_customer_id(&self, id: &CustomerId) -> Result<Option<Subject>, DomainError>;

    /// Fails with `Conflict(ExternalId)` or `Conflict(CustomerId)` when either
    /// key is already taken; nothing is written in that case.
    async fn insert(&self, subject: NewSubject) -> Result<Subject, DomainError>;

    async fn update_display_name(
        &self,
        id: &CustomerId,
        display_name: Option<String>,
    ) -> Result<Subject, DomainError>;

    async fn set_role(&self, id: &CustomerId, role: Role) -> Result<Subject, DomainError>;

    async fn set_password_hash(&self, id: &CustomerId, hash: String) -> Result<(), DomainError>;

    async fn delete(&self, id: &CustomerId) -> Result<(), DomainError>;

    /// Atomically advance and return the sequence for a `yyMMdd` day key.
    /// The first call for a day returns 1.
    async fn next_daily_sequence(&self, day: &str) -> Result<u64, DomainError>;

    /// Reachability check for `/health`.
    async fn ping(&self) -> Result<(), DomainError>;
}
