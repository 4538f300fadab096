//! Out-of-band password reset: an emailed one-time code plus a signed
//! recovery token. Either proof completes the reset, and each is single use.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use tracing::{debug, warn};

use crate::auth::claims::{RecoveryClaims, RecoveryPurpose};
use crate::auth::jwt;
use crate::domain::email::{normalize_email, parse_email};
use crate::domain::one_time_code::OneTimeCode;
use crate::domain::password_policy::check_password_policy;
use crate::errors::{DomainError, InfraErrorKind, NotFoundKind, TokenFault};
use crate::logging::security;
use crate::mail::{Mailer, OutboundEmail};
use crate::password::PasswordHashing;
use crate::repos::{EphemeralStore, SubjectRepo};
use crate::services::credentials::{remaining, CredentialService};
use crate::state::security_config::RecoveryPolicy;

pub const RESET_EMAIL_SUBJECT: &str = "Password Reset Request";

/// Draws allowed before giving up on finding a code no pending ticket holds.
const CODE_DRAW_ATTEMPTS: u32 = 8;

/// What the caller presents to `complete_reset`.
#[derive(Debug, Clone)]
pub enum ResetProof {
    /// A recovery token of either purpose
    Token(String),
    /// A one-time code on its own; the email is found through the code index
    Code(String),
}

impl ResetProof {
    fn kind(&self) -> &'static str {
        match self {
            ResetProof::Token(_) => "token",
            ResetProof::Code(_) => "code",
        }
    }
}

/// Stored under `otp:{email}`.
#[derive(Debug, Serialize, Deserialize)]
struct CodeTicket {
    code: String,
    /// Unix seconds
    expires_at: i64,
}

fn ticket_key(email: &str) -> String {
    format!("otp:{email}")
}

fn code_index_key(code: &str) -> String {
    format!("otp-code:{code}")
}

#[derive(Clone)]
pub struct RecoveryFlow {
    subjects: Arc<dyn SubjectRepo>,
    ephemeral: Arc<dyn EphemeralStore>,
    mailer: Arc<dyn Mailer>,
    hasher: Arc<dyn PasswordHashing>,
    credentials: CredentialService,
    policy: RecoveryPolicy,
}

impl RecoveryFlow {
    pub fn new(
        subjects: Arc<dyn SubjectRepo>,
        ephemeral: Arc<dyn EphemeralStore>,
        mailer: Arc<dyn Mailer>,
        hasher: Arc<dyn PasswordHashing>,
        credentials: CredentialService,
        policy: RecoveryPolicy,
    ) -> Self {
        Self {
            subjects,
            ephemeral,
            mailer,
            hasher,
            credentials,
            policy,
        }
    }

    /// Issue a code and a reset token for a registered email and mail them.
    /// Unknown emails succeed silently with nothing stored or sent.
    pub async fn request_reset(&self, email: &str, now: OffsetDateTime) -> Result<(), DomainError> {
        let email = parse_email(email)?;
        if self.subjects.find_by_email(&email).await?.is_none() {
            security::reset_requested(&email, false);
            return Ok(());
        }

        let store_ttl = self.policy.code_ttl + self.policy.code_grace;

        // Replacing a pending code: drop its index entry first.
        self.purge_code(&email).await?;
        let code = self
            .reserve_code(&email, store_ttl, OneTimeCode::generate)
            .await?;
        let ticket = CodeTicket {
            code: code.as_str().to_string(),
            expires_at: (now + self.policy.code_ttl).unix_timestamp(),
        };
        let raw = match serde_json::to_string(&ticket) {
            Ok(raw) => raw,
            Err(e) => {
                self.release_code(code.as_str(), &email).await?;
                return Err(DomainError::config(format!(
                    "failed to encode code ticket: {e}"
                )));
            }
        };
        self.ephemeral
            .put(&ticket_key(&email), raw, store_ttl)
            .await?;

        let token = jwt::mint_recovery_token(
            &email,
            RecoveryPurpose::PasswordReset,
            self.policy.reset_token_ttl,
            now,
            self.credentials.security(),
        )?;

        let message = OutboundEmail {
            to: email.clone(),
            subject: RESET_EMAIL_SUBJECT.to_string(),
            html_body: self.reset_email_body(&code, &token),
        };
        if let Err(err) = self.mailer.send(message).await {
            warn!(error = %err, "reset email dispatch failed; purging code");
            self.purge_code(&email).await?;
            return Err(err);
        }

        security::reset_requested(&email, true);
        Ok(())
    }

    /// Exchange a valid code for a short-lived confirm-reset token. The code
    /// is consumed. Expiry is checked before the value.
    pub async fn verify_one_time_code(
        &self,
        email: &str,
        code: &str,
        now: OffsetDateTime,
    ) -> Result<String, DomainError> {
        let email = normalize_email(email);
        let code = OneTimeCode::parse(code).ok_or(DomainError::InvalidCode)?;
        self.consume_code(&email, &code, now).await?;

        jwt::mint_recovery_token(
            &email,
            RecoveryPurpose::ConfirmReset,
            self.policy.confirm_token_ttl,
            now,
            self.credentials.security(),
        )
    }

    /// Apply `new_password` to the subject the proof resolves to. Returns
    /// the normalized email.
    pub async fn complete_reset(
        &self,
        proof: ResetProof,
        new_password: &str,
        now: OffsetDateTime,
    ) -> Result<String, DomainError> {
        check_password_policy(new_password)?;

        let (email, single_use_token) = match &proof {
            ResetProof::Token(token) => {
                let claims = self.credentials.verify_recovery(token, now).await?;
                (claims.email, Some((token.as_str(), claims.exp)))
            }
            ResetProof::Code(raw) => {
                let code = OneTimeCode::parse(raw).ok_or(DomainError::InvalidCode)?;
                let email = self
                    .ephemeral
                    .get(&code_index_key(code.as_str()))
                    .await?
                    .ok_or(DomainError::InvalidCode)?;
                self.consume_code(&email, &code, now).await?;
                (email, None)
            }
        };

        let subject = self
            .subjects
            .find_by_email(&email)
            .await?
            .ok_or_else(|| DomainError::not_found(NotFoundKind::Subject, "User not found"))?;

        let hash = self.hasher.hash(new_password)?;

        // Spend the token before the password changes. Concurrent callers
        // holding the same token stop here with `RevokedToken`.
        if let Some((token, exp)) = single_use_token {
            let ceiling = self
                .policy
                .reset_token_ttl
                .max(self.policy.confirm_token_ttl);
            self.credentials
                .consume(token, remaining(exp, now, ceiling))
                .await?;
        }
        self.subjects
            .set_password_hash(&subject.customer_id, hash)
            .await?;
        self.purge_code(&email).await?;

        security::reset_completed(&email, proof.kind());
        Ok(email)
    }

    /// Check an emailed reset link's token without consuming it.
    pub async fn inspect_recovery_token(
        &self,
        token: &str,
        now: OffsetDateTime,
    ) -> Result<RecoveryClaims, DomainError> {
        let claims = self.credentials.verify_recovery(token, now).await?;
        if claims.purpose != RecoveryPurpose::PasswordReset {
            return Err(DomainError::InvalidToken(TokenFault::WrongPurpose));
        }
        Ok(claims)
    }

    fn reset_email_body(&self, code: &OneTimeCode, token: &str) -> String {
        let base = self.policy.frontend_url.trim_end_matches('/');
        let minutes = self.policy.code_ttl.as_secs() / 60;
        format!(
            "<p>You requested a password reset.</p>\
             <p>Your one-time code is <strong>{code}</strong>. It expires in {minutes} minutes.</p>\
             <p>Or follow this link: <a href=\"{base}/reset-password?token={token}\">Reset password</a></p>\
             <p>If you did not request this, you can ignore this email.</p>",
            code = code.as_str(),
        )
    }

    async fn load_ticket(&self, email: &str) -> Result<Option<CodeTicket>, DomainError> {
        let Some(raw) = self.ephemeral.get(&ticket_key(email)).await? else {
            return Ok(None);
        };
        match serde_json::from_str(&raw) {
            Ok(ticket) => Ok(Some(ticket)),
            Err(err) => {
                warn!(error = %err, "discarding unreadable code ticket");
                self.ephemeral.delete(&ticket_key(email)).await?;
                Ok(None)
            }
        }
    }

    /// Expired → purge + `ExpiredCode`; absent or mismatched → `InvalidCode`.
    /// Only the caller whose delete removes the ticket gets to consume it.
    async fn consume_code(
        &self,
        email: &str,
        code: &OneTimeCode,
        now: OffsetDateTime,
    ) -> Result<(), DomainError> {
        let ticket = self.load_ticket(email).await?.ok_or(DomainError::InvalidCode)?;
        if now.unix_timestamp() >= ticket.expires_at {
            self.purge_code(email).await?;
            return Err(DomainError::ExpiredCode);
        }
        if ticket.code != code.as_str() {
            debug!("one-time code mismatch");
            return Err(DomainError::InvalidCode);
        }
        if !self.ephemeral.delete(&ticket_key(email)).await? {
            return Err(DomainError::InvalidCode);
        }
        self.release_code(code.as_str(), email).await
    }

    /// Reserve a code in the index for `email`. A live code maps to exactly
    /// one email; draws that hit a pending code are discarded.
    async fn reserve_code<G>(
        &self,
        email: &str,
        ttl: Duration,
        mut draw: G,
    ) -> Result<OneTimeCode, DomainError>
    where
        G: FnMut() -> OneTimeCode + Send,
    {
        for attempt in 1..=CODE_DRAW_ATTEMPTS {
            let code = draw();
            if self
                .ephemeral
                .put_if_absent(&code_index_key(code.as_str()), email.to_string(), ttl)
                .await?
            {
                return Ok(code);
            }
            debug!(attempt, "drawn code is pending for another ticket");
        }
        warn!("no free one-time code after {CODE_DRAW_ATTEMPTS} draws");
        Err(DomainError::unavailable(
            InfraErrorKind::Other("one-time code space".into()),
            "could not reserve a one-time code",
        ))
    }

    /// Drop the index entry for `code` if `email` owns it.
    async fn release_code(&self, code: &str, email: &str) -> Result<(), DomainError> {
        let key = code_index_key(code);
        if self.ephemeral.get(&key).await?.as_deref() == Some(email) {
            self.ephemeral.delete(&key).await?;
        }
        Ok(())
    }

    async fn purge_code(&self, email: &str) -> Result<(), DomainError> {
        if let Some(ticket) = self.load_ticket(email).await? {
            self.release_code(&ticket.code, email).await?;
        }
        self.ephemeral.delete(&ticket_key(email)).await?;
        Ok(())
    }
}
