//! Error handling for the Zen backend.

pub mod domain;
pub mod error_code;

pub use domain::{ConflictKind, DomainError, InfraErrorKind, NotFoundKind, TokenFault};
pub use error_code::ErrorCode;
