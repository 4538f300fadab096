//! Error codes for the Zen backend API.
//!
//! Add new codes here; never pass ad-hoc strings as error codes. Every code
//! is SCREAMING_SNAKE_CASE and maps 1:1 to the string in HTTP responses.

use core::fmt;

/// Centralized error codes for the Zen backend API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    // Authentication & Authorization
    /// Any authentication failure (missing, malformed, invalid, expired, revoked)
    Unauthorized,
    /// Access denied
    Forbidden,
    /// Role does not grant the required permission
    InsufficientRole,

    // Request Validation
    /// General validation error
    ValidationError,
    /// Malformed or missing email address
    InvalidEmail,
    /// Identity assertion missing from the request
    InvalidIdToken,
    /// New password does not satisfy the password policy
    WeakPassword,
    /// Neither a recovery token nor a one-time code was supplied
    MissingResetProof,
    /// Unknown role name
    InvalidRole,
    /// General bad request error
    BadRequest,

    // Recovery flow
    /// One-time code is past its expiry
    ExpiredCode,
    /// One-time code does not match or does not exist
    InvalidCode,
    /// Recovery token is invalid, expired or already used
    InvalidResetToken,

    // Resource Not Found
    /// Subject not found
    SubjectNotFound,
    /// General not found error
    NotFound,

    // Conflicts
    /// External identity already registered
    SubjectExists,
    /// Customer id already allocated
    CustomerIdTaken,
    /// Generic conflict
    Conflict,

    // System Errors
    /// Backing store unreachable or timed out
    StoreUnavailable,
    /// Outbound email could not be dispatched
    MailUnavailable,
    /// Identity provider unreachable
    IdentityProviderUnavailable,
    /// Configuration error
    ConfigError,
    /// Internal server error
    Internal,
}

impl ErrorCode {
    /// Returns the canonical SCREAMING_SNAKE_CASE string for this error code.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Unauthorized => "UNAUTHORIZED",
            Self::Forbidden => "FORBIDDEN",
            Self::InsufficientRole => "INSUFFICIENT_ROLE",

            Self::ValidationError => "VALIDATION_ERROR",
            Self::InvalidEmail => "INVALID_EMAIL",
            Self::InvalidIdToken => "INVALID_ID_TOKEN",
            Self::WeakPassword => "WEAK_PASSWORD",
            Self::MissingResetProof => "MISSING_RESET_PROOF",
            Self::InvalidRole => "INVALID_ROLE",
            Self::BadRequest => "BAD_REQUEST",

            Self::ExpiredCode => "EXPIRED_CODE",
            Self::InvalidCode => "INVALID_CODE",
            Self::InvalidResetToken => "INVALID_RESET_TOKEN",

            Self::SubjectNotFound => "SUBJECT_NOT_FOUND",
            Self::NotFound => "NOT_FOUND",

            Self::SubjectExists => "SUBJECT_EXISTS",
            Self::CustomerIdTaken => "CUSTOMER_ID_TAKEN",
            Self::Conflict => "CONFLICT",

            Self::StoreUnavailable => "STORE_UNAVAILABLE",
            Self::MailUnavailable => "MAIL_UNAVAILABLE",
            Self::IdentityProviderUnavailable => "IDENTITY_PROVIDER_UNAVAILABLE",
            Self::ConfigError => "CONFIG_ERROR",
            Self::Internal => "INTERNAL",
        }
    }

    /// Every code, for uniqueness checks.
    pub const ALL: &'static [ErrorCode] = &[
        Self::Unauthorized,
        Self::Forbidden,
        Self::InsufficientRole,
        Self::ValidationError,
        Self::InvalidEmail,
        Self::InvalidIdToken,
        Self::WeakPassword,
        Self::MissingResetProof,
        Self::InvalidRole,
        Self::BadRequest,
        Self::ExpiredCode,
        Self::InvalidCode,
        Self::InvalidResetToken,
        Self::SubjectNotFound,
        Self::NotFound,
        Self::SubjectExists,
        Self::CustomerIdTaken,
        Self::Conflict,
        Self::StoreUnavailable,
        Self::MailUnavailable,
        Self::IdentityProviderUnavailable,
        Self::ConfigError,
        Self::Internal,
    ];
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
