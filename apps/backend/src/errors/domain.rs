//! Domain-level error type used across services, stores and adapters.
//!
//! This type is HTTP-agnostic. Handlers return `Result<T, AppError>` and
//! convert with the `From<DomainError> for AppError` implementation in
//! `crate::error`.

use std::error::Error;
use std::fmt::{Display, Formatter, Result as FmtResult};

/// Why a bearer or recovery token was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenFault {
    Malformed,
    BadSignature,
    Expired,
    WrongPurpose,
}

/// Operational failure kinds for backing services.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum InfraErrorKind {
    Timeout,
    StoreUnavailable,
    DataCorruption,
    MailDispatch,
    IdentityProvider,
    Other(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum NotFoundKind {
    Subject,
    Other(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ConflictKind {
    ExternalId,
    CustomerId,
    Other(String),
}

/// Central domain error type
#[derive(Debug, Clone, PartialEq)]
pub enum DomainError {
    /// Missing or unusable configuration (for example an empty signing key)
    Config(String),
    /// Identity provider rejected the assertion
    InvalidAssertion(String),
    /// Signature, shape, expiry or purpose check failed
    InvalidToken(TokenFault),
    /// Token is listed in the revocation ledger (or the ledger failed closed)
    RevokedToken,
    /// One-time code exists but is past its expiry
    ExpiredCode,
    /// One-time code does not match or does not exist
    InvalidCode,
    /// Email/password pair did not match
    InvalidCredentials,
    NotFound(NotFoundKind, String),
    /// Authenticated but not allowed
    Forbidden(String),
    Conflict(ConflictKind, String),
    /// Input validation or business rule violation
    Validation(String),
    /// Store, mailer or identity provider could not be reached
    Unavailable(InfraErrorKind, String),
}

impl Display for DomainError {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            DomainError::Config(d) => write!(f, "configuration error: {d}"),
            DomainError::InvalidAssertion(d) => write!(f, "invalid identity assertion: {d}"),
            DomainError::InvalidToken(fault) => write!(f, "invalid token: {fault:?}"),
            DomainError::RevokedToken => write!(f, "token revoked"),
            DomainError::ExpiredCode => write!(f, "one-time code expired"),
            DomainError::InvalidCode => write!(f, "one-time code invalid"),
            DomainError::InvalidCredentials => write!(f, "invalid credentials"),
            DomainError::NotFound(kind, d) => write!(f, "not found {kind:?}: {d}"),
            DomainError::Forbidden(d) => write!(f, "forbidden: {d}"),
            DomainError::Conflict(kind, d) => write!(f, "conflict {kind:?}: {d}"),
            DomainError::Validation(d) => write!(f, "validation error: {d}"),
            DomainError::Unavailable(kind, d) => write!(f, "unavailable {kind:?}: {d}"),
        }
    }
}

impl Error for DomainError {}

impl DomainError {
    pub fn config(detail: impl Into<String>) -> Self {
        Self::Config(detail.into())
    }
    pub fn invalid_assertion(detail: impl Into<String>) -> Self {
        Self::InvalidAssertion(detail.into())
    }
    pub fn validation(detail: impl Into<String>) -> Self {
        Self::Validation(detail.into())
    }
    pub fn forbidden(detail: impl Into<String>) -> Self {
        Self::Forbidden(detail.into())
    }
    pub fn conflict(kind: ConflictKind, detail: impl Into<String>) -> Self {
        Self::Conflict(kind, detail.into())
    }
    pub fn not_found(kind: NotFoundKind, detail: impl Into<String>) -> Self {
        Self::NotFound(kind, detail.into())
    }
    pub fn unavailable(kind: InfraErrorKind, detail: impl Into<String>) -> Self {
        Self::Unavailable(kind, detail.into())
    }

    /// True for every variant that means "the caller failed to authenticate".
    pub fn is_auth_failure(&self) -> bool {
        matches!(
            self,
            DomainError::InvalidAssertion(_)
                | DomainError::InvalidToken(_)
                | DomainError::RevokedToken
                | DomainError::InvalidCredentials
        )
    }
}
