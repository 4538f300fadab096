pub mod claims;
pub mod jwt;

pub use claims::{AccessClaims, RecoveryClaims, RecoveryPurpose};
