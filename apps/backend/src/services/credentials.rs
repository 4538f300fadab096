//! Issue, verify, revoke and refresh bearer tokens.

use std::sync::Arc;
use std::time::Duration;

use time::OffsetDateTime;
use tracing::debug;

use crate::auth::claims::{AccessClaims, RecoveryClaims};
use crate::auth::jwt;
use crate::domain::Role;
use crate::errors::{DomainError, TokenFault};
use crate::logging::security;
use crate::repos::RevocationLedger;
use crate::state::security_config::{RevocationFailMode, SecurityConfig};

/// A freshly signed access token.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub expires_at: OffsetDateTime,
    pub ttl: Duration,
}

#[derive(Clone)]
pub struct CredentialService {
    security: SecurityConfig,
    ledger: Arc<dyn RevocationLedger>,
}

impl CredentialService {
    pub fn new(security: SecurityConfig, ledger: Arc<dyn RevocationLedger>) -> Self {
        Self { security, ledger }
    }

    pub fn security(&self) -> &SecurityConfig {
        &self.security
    }

    /// Sign a token for the triple. `ttl` defaults to the configured lifetime.
    pub fn issue(
        &self,
        sub: &str,
        customer_id: &str,
        role: Role,
        ttl: Option<Duration>,
        now: OffsetDateTime,
    ) -> Result<IssuedToken, DomainError> {
        let ttl = ttl.unwrap_or(self.security.access_ttl);
        let token = jwt::mint_access_token(sub, customer_id, role, ttl, now, &self.security)?;
        Ok(IssuedToken {
            token,
            expires_at: now + ttl,
            ttl,
        })
    }

    /// Ledger first, then expiry and signature.
    pub async fn verify(&self, token: &str, now: OffsetDateTime) -> Result<AccessClaims, DomainError> {
        self.ensure_not_revoked(token).await?;
        jwt::decode_access_token(token, now, &self.security)
    }

    /// Recovery tokens share the ledger so that consumption is single use.
    pub async fn verify_recovery(
        &self,
        token: &str,
        now: OffsetDateTime,
    ) -> Result<RecoveryClaims, DomainError> {
        self.ensure_not_revoked(token).await?;
        jwt::decode_recovery_token(token, now, &self.security)
    }

    async fn ensure_not_revoked(&self, token: &str) -> Result<(), DomainError> {
        match self.ledger.is_revoked(token).await {
            Ok(false) => Ok(()),
            Ok(true) => Err(DomainError::RevokedToken),
            Err(err) => match self.security.revocation_fail_mode {
                RevocationFailMode::Closed => {
                    security::ledger_unavailable(false, &err.to_string());
                    Err(DomainError::RevokedToken)
                }
                RevocationFailMode::Open => {
                    security::ledger_unavailable(true, &err.to_string());
                    Ok(())
                }
            },
        }
    }

    /// Mark a single-use token spent. Of any number of concurrent callers
    /// exactly one gets `Ok`; the rest see `RevokedToken`. A ledger outage
    /// is returned as-is whatever the fail mode, since nothing was consumed.
    pub async fn consume(&self, token: &str, ttl: Duration) -> Result<(), DomainError> {
        if self.ledger.claim(token, ttl).await? {
            Ok(())
        } else {
            Err(DomainError::RevokedToken)
        }
    }

    /// Revoke an access token for the rest of its natural life, clamped to
    /// `[1s, access TTL]`. Already-expired tokens need no marker.
    pub async fn revoke(&self, token: &str, now: OffsetDateTime) -> Result<(), DomainError> {
        let ceiling = self.security.access_ttl;
        let ttl = match jwt::decode_access_token(token, now, &self.security) {
            Ok(claims) => remaining(claims.exp, now, ceiling),
            Err(DomainError::InvalidToken(TokenFault::Expired)) => {
                debug!("revoke skipped for expired token");
                return Ok(());
            }
            Err(DomainError::Config(detail)) => return Err(DomainError::Config(detail)),
            // Unreadable tokens still get a marker for the maximum lifetime.
            Err(_) => ceiling,
        };
        self.ledger.revoke(token, ttl).await
    }

    /// Revoke `token` and issue a replacement with the same subject,
    /// customer id and role.
    pub async fn refresh(&self, token: &str, now: OffsetDateTime) -> Result<IssuedToken, DomainError> {
        let claims = self.verify(token, now).await?;
        self.ledger
            .revoke(token, remaining(claims.exp, now, self.security.access_ttl))
            .await?;
        security::token_revoked(&claims.cid, "refresh");
        self.issue(&claims.sub, &claims.cid, claims.role, None, now)
    }
}

/// Seconds left until `exp`, clamped to `[1s, ceiling]`.
pub fn remaining(exp: i64, now: OffsetDateTime, ceiling: Duration) -> Duration {
    let left = u64::try_from(exp.saturating_sub(now.unix_timestamp())).unwrap_or(0);
    Duration::from_secs(left).clamp(Duration::from_secs(1), ceiling.max(Duration::from_secs(1)))
}
