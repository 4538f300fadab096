//! Claims carried by backend-issued tokens.

use serde::{Deserialize, Serialize};

use crate::domain::Role;

/// Access token payload; also what the auth gate attaches to requests.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct AccessClaims {
    /// External identity id
    pub sub: String,
    /// Customer id
    pub cid: String,
    pub role: Role,
    /// Issued-at (seconds since epoch)
    pub iat: i64,
    /// Expiry (seconds since epoch)
    pub exp: i64,
    /// Unique per issuance
    pub jti: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum RecoveryPurpose {
    /// Emailed with the one-time code
    PasswordReset,
    /// Issued after the one-time code is verified
    ConfirmReset,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct RecoveryClaims {
    pub email: String,
    pub purpose: RecoveryPurpose,
    pub iat: i64,
    pub exp: i64,
    pub jti: String,
}

/// Anything with an absolute expiry, so the codec can check it generically.
pub trait Expiring {
    fn exp(&self) -> i64;
}

impl Expiring for AccessClaims {
    fn exp(&self) -> i64 {
        self.exp
    }
}

impl Expiring for RecoveryClaims {
    fn exp(&self) -> i64 {
        self.exp
    }
}
