//! One-way password hashing behind a small trait so services never touch
//! the algorithm directly.

use argon2::password_hash::SaltString;
use argon2::{Algorithm, Argon2, Params, PasswordHash, PasswordHasher, PasswordVerifier, Version};
use rand::Rng;

use crate::errors::{DomainError, InfraErrorKind};

pub trait PasswordHashing: Send + Sync {
    /// PHC-format hash of `password` with a fresh salt.
    fn hash(&self, password: &str) -> Result<String, DomainError>;

    /// `Ok(false)` on mismatch; errors only for unparseable stored hashes.
    fn verify(&self, password: &str, stored_hash: &str) -> Result<bool, DomainError>;
}

/// Argon2id with configurable cost.
#[derive(Debug, Clone)]
pub struct Argon2Hashing {
    params: Params,
}

impl Argon2Hashing {
    /// `memory_kib`, `iterations`, `parallelism` as in RFC 9106.
    pub fn with_cost(memory_kib: u32, iterations: u32, parallelism: u32) -> Result<Self, DomainError> {
        let params = Params::new(memory_kib, iterations, parallelism, None)
            .map_err(|e| DomainError::config(format!("invalid argon2 params: {e}")))?;
        Ok(Self { params })
    }

    fn argon2(&self) -> Argon2<'static> {
        Argon2::new(Algorithm::Argon2id, Version::V0x13, self.params.clone())
    }
}

impl Default for Argon2Hashing {
    fn default() -> Self {
        Self {
            params: Params::default(),
        }
    }
}

impl PasswordHashing for Argon2Hashing {
    fn hash(&self, password: &str) -> Result<String, DomainError> {
        let mut salt_bytes = [0u8; 16];
        rand::rng().fill(&mut salt_bytes);
        let salt = SaltString::encode_b64(&salt_bytes)
            .map_err(|e| DomainError::unavailable(InfraErrorKind::Other("salt".into()), e.to_string()))?;
        self.argon2()
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| {
                DomainError::unavailable(InfraErrorKind::Other("argon2".into()), e.to_string())
            })
    }

    fn verify(&self, password: &str, stored_hash: &str) -> Result<bool, DomainError> {
        let parsed = PasswordHash::new(stored_hash).map_err(|e| {
            DomainError::unavailable(
                InfraErrorKind::DataCorruption,
                format!("stored password hash unreadable: {e}"),
            )
        })?;
        Ok(self
            .argon2()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok())
    }
}
