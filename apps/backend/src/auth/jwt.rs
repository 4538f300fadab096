//! HS256 token codec. Pure: callers supply `now`, and revocation is checked
//! one layer up in `services::credentials`.

use std::collections::HashSet;
use std::time::Duration;

use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::auth::claims::{AccessClaims, Expiring, RecoveryClaims, RecoveryPurpose};
use crate::domain::Role;
use crate::errors::{DomainError, TokenFault};
use crate::state::security_config::SecurityConfig;

#[derive(Deserialize)]
struct ExpiryOnly {
    exp: i64,
}

fn ensure_key(security: &SecurityConfig) -> Result<(), DomainError> {
    if security.jwt_secret.is_empty() {
        return Err(DomainError::config("JWT signing key is not configured"));
    }
    Ok(())
}

fn expiry_of(now: OffsetDateTime, ttl: Duration) -> (i64, i64) {
    let iat = now.unix_timestamp();
    let ttl = i64::try_from(ttl.as_secs()).unwrap_or(i64::MAX);
    (iat, iat.saturating_add(ttl))
}

fn sign<T: Serialize>(claims: &T, security: &SecurityConfig) -> Result<String, DomainError> {
    ensure_key(security)?;
    encode(
        &Header::new(security.algorithm),
        claims,
        &EncodingKey::from_secret(&security.jwt_secret),
    )
    .map_err(|e| DomainError::config(format!("failed to encode JWT: {e}")))
}

/// Read `exp` without trusting anything else in the token.
fn peek_expiry(token: &str, security: &SecurityConfig) -> Result<i64, DomainError> {
    let mut validation = Validation::new(security.algorithm);
    validation.insecure_disable_signature_validation();
    validation.validate_exp = false;
    validation.validate_aud = false;
    validation.required_spec_claims = HashSet::from(["exp".to_string()]);

    decode::<ExpiryOnly>(token, &DecodingKey::from_secret(&[]), &validation)
        .map(|data| data.claims.exp)
        .map_err(|_| DomainError::InvalidToken(TokenFault::Malformed))
}

/// Expiry first, then signature. Zero leeway: a token is expired at `exp`.
fn verify<T>(token: &str, now: OffsetDateTime, security: &SecurityConfig) -> Result<T, DomainError>
where
    T: DeserializeOwned + Expiring,
{
    ensure_key(security)?;

    if now.unix_timestamp() >= peek_expiry(token, security)? {
        return Err(DomainError::InvalidToken(TokenFault::Expired));
    }

    let mut validation = Validation::new(security.algorithm);
    validation.validate_exp = false;
    validation.validate_aud = false;
    validation.leeway = 0;

    let claims = decode::<T>(
        token,
        &DecodingKey::from_secret(&security.jwt_secret),
        &validation,
    )
    .map(|data| data.claims)
    .map_err(|e| match e.kind() {
        ErrorKind::InvalidSignature | ErrorKind::InvalidAlgorithm => {
            DomainError::InvalidToken(TokenFault::BadSignature)
        }
        _ => DomainError::InvalidToken(TokenFault::Malformed),
    })?;

    // The signed payload must agree with what was peeked.
    if now.unix_timestamp() >= claims.exp() {
        return Err(DomainError::InvalidToken(TokenFault::Expired));
    }
    Ok(claims)
}

/// Sign an access token for `sub`/`cid`/`role` valid for `ttl` from `now`.
pub fn mint_access_token(
    sub: &str,
    cid: &str,
    role: Role,
    ttl: Duration,
    now: OffsetDateTime,
    security: &SecurityConfig,
) -> Result<String, DomainError> {
    let (iat, exp) = expiry_of(now, ttl);
    let claims = AccessClaims {
        sub: sub.to_string(),
        cid: cid.to_string(),
        role,
        iat,
        exp,
        jti: Uuid::new_v4().to_string(),
    };
    sign(&claims, security)
}

/// Verify signature and expiry. Revocation is not consulted here.
pub fn decode_access_token(
    token: &str,
    now: OffsetDateTime,
    security: &SecurityConfig,
) -> Result<AccessClaims, DomainError> {
    verify(token, now, security)
}

pub fn mint_recovery_token(
    email: &str,
    purpose: RecoveryPurpose,
    ttl: Duration,
    now: OffsetDateTime,
    security: &SecurityConfig,
) -> Result<String, DomainError> {
    let (iat, exp) = expiry_of(now, ttl);
    let claims = RecoveryClaims {
        email: email.to_string(),
        purpose,
        iat,
        exp,
        jti: Uuid::new_v4().to_string(),
    };
    sign(&claims, security)
}

/// Access tokens fail here as `Malformed` since they lack `email`/`purpose`.
pub fn decode_recovery_token(
    token: &str,
    now: OffsetDateTime,
    security: &SecurityConfig,
) -> Result<RecoveryClaims, DomainError> {
    verify(token, now, security)
}
