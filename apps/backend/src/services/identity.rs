//! First-login exchange of an identity-provider assertion, plus the
//! email/password login path.

use std::sync::Arc;

use time::OffsetDateTime;
use tracing::{debug, info};

use crate::domain::email::normalize_email;
use crate::errors::DomainError;
use crate::identity_provider::AssertionVerifier;
use crate::password::PasswordHashing;
use crate::repos::{LoginMethod, Subject, SubjectRepo};
use crate::services::credentials::{CredentialService, IssuedToken};
use crate::services::customer_ids::{create_subject, SubjectSeed};
use crate::services::sessions::SessionRegistry;

#[derive(Debug, Clone)]
pub struct ExchangeOutcome {
    pub subject: Subject,
    pub access: IssuedToken,
    /// True when this exchange created the subject.
    pub created: bool,
}

#[derive(Clone)]
pub struct IdentityResolver {
    verifier: Arc<dyn AssertionVerifier>,
    subjects: Arc<dyn SubjectRepo>,
    sessions: SessionRegistry,
    credentials: CredentialService,
    hasher: Arc<dyn PasswordHashing>,
}

impl IdentityResolver {
    pub fn new(
        verifier: Arc<dyn AssertionVerifier>,
        subjects: Arc<dyn SubjectRepo>,
        sessions: SessionRegistry,
        credentials: CredentialService,
        hasher: Arc<dyn PasswordHashing>,
    ) -> Self {
        Self {
            verifier,
            subjects,
            sessions,
            credentials,
            hasher,
        }
    }

    /// Verify `assertion`, find or create the subject, record the login and
    /// issue an access token. Re-entry for the same external id returns the
    /// same subject.
    pub async fn exchange(
        &self,
        assertion: &str,
        now: OffsetDateTime,
    ) -> Result<ExchangeOutcome, DomainError> {
        let identity = self.verifier.verify(assertion).await?;

        let (subject, created) = match self
            .subjects
            .find_by_external_id(&identity.external_id)
            .await?
        {
            Some(existing) => (existing, false),
            None => {
                let seed = SubjectSeed {
                    external_id: identity.external_id.clone(),
                    display_name: identity.name.clone(),
                    email: identity.email.as_deref().map(normalize_email),
                };
                create_subject(self.subjects.as_ref(), seed, now).await?
            }
        };

        self.finish(subject, created, LoginMethod::IdentityProvider, now)
            .await
    }

    /// Email/password login. Every failure is the same `InvalidCredentials`.
    pub async fn login_with_password(
        &self,
        email: &str,
        password: &str,
        now: OffsetDateTime,
    ) -> Result<ExchangeOutcome, DomainError> {
        let email = normalize_email(email);
        let Some(subject) = self.subjects.find_by_email(&email).await? else {
            debug!("password login for unknown email");
            return Err(DomainError::InvalidCredentials);
        };
        let Some(stored) = subject.password_hash.as_deref() else {
            debug!(customer_id = %subject.customer_id, "password login without a password set");
            return Err(DomainError::InvalidCredentials);
        };
        if !self.hasher.verify(password, stored)? {
            return Err(DomainError::InvalidCredentials);
        }

        self.finish(subject, false, LoginMethod::Password, now).await
    }

    async fn finish(
        &self,
        subject: Subject,
        created: bool,
        method: LoginMethod,
        now: OffsetDateTime,
    ) -> Result<ExchangeOutcome, DomainError> {
        self.sessions.record_login(&subject, method, now).await?;
        let access = self.credentials.issue(
            &subject.external_id,
            subject.customer_id.as_str(),
            subject.role,
            None,
            now,
        )?;
        info!(customer_id = %subject.customer_id, created, ?method, "login succeeded");
        Ok(ExchangeOutcome {
            subject,
            access,
            created,
        })
    }
}
