use std::sync::Arc;

use zen_backend::password::Argon2Hashing;
use zen_backend::state::security_config::CookiePolicy;
use zen_backend::{build_state, SecurityConfig, StateBuilder};

use super::fakes::FakeVerifier;

pub const TEST_SIGNING_KEY: &[u8] = b"zen-integration-test-signing-key";

pub fn test_security() -> SecurityConfig {
    SecurityConfig::new(TEST_SIGNING_KEY.to_vec())
}

/// In-memory state with the fake identity provider and a cheap hasher.
/// Callers add a mailer or ledger as needed before `build()`.
pub fn test_state_builder() -> StateBuilder {
    let hasher = Argon2Hashing::with_cost(8, 1, 1).expect("argon2 test params");
    build_state(test_security())
        .with_verifier(Arc::new(FakeVerifier))
        .with_hasher(Arc::new(hasher))
        .with_cookie_policy(CookiePolicy { secure: false })
}
