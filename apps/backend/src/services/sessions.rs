use std::sync::Arc;

use time::OffsetDateTime;

use crate::errors::DomainError;
use crate::repos::{LoginMethod, SessionFilter, SessionLogin, SessionRecord, SessionRepo, Subject};
use crate::state::security_config::SessionPolicy;

/// Upsert-only last-login registry. Stale records expire in the store.
#[derive(Clone)]
pub struct SessionRegistry {
    repo: Arc<dyn SessionRepo>,
    policy: SessionPolicy,
}

impl SessionRegistry {
    pub fn new(repo: Arc<dyn SessionRepo>, policy: SessionPolicy) -> Self {
        Self { repo, policy }
    }

    pub async fn record_login(
        &self,
        subject: &Subject,
        method: LoginMethod,
        now: OffsetDateTime,
    ) -> Result<SessionRecord, DomainError> {
        let login = SessionLogin {
            external_id: subject.external_id.clone(),
            email: subject.email.clone(),
            display_name: subject.display_name.clone(),
            customer_id: subject.customer_id.to_string(),
            login_method: method,
            at: now,
        };
        self.repo.upsert_login(login, self.policy.retention).await
    }

    /// Newest first. `None` uses the default limit; larger requests are
    /// capped at the maximum.
    pub async fn list_sessions(
        &self,
        filter: &SessionFilter,
        limit: Option<usize>,
    ) -> Result<Vec<SessionRecord>, DomainError> {
        let limit = match limit {
            Some(0) => return Err(DomainError::validation("limit must be positive")),
            Some(n) => n.min(self.policy.max_list_limit),
            None => self.policy.default_list_limit,
        };
        self.repo.list(filter, limit).await
    }
}
