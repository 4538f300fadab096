use std::time::Duration;

use jsonwebtoken::Algorithm;

/// What `verify` does when the revocation ledger cannot be consulted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RevocationFailMode {
    /// Treat the token as revoked.
    #[default]
    Closed,
    /// Log and continue with signature validation.
    Open,
}

impl std::str::FromStr for RevocationFailMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "closed" => Ok(Self::Closed),
            "open" => Ok(Self::Open),
            other => Err(format!("expected 'closed' or 'open', got '{other}'")),
        }
    }
}

/// Token signing and lifetime settings.
#[derive(Clone)]
pub struct SecurityConfig {
    /// HS256 signing key
    pub jwt_secret: Vec<u8>,
    pub algorithm: Algorithm,
    /// Default access token lifetime
    pub access_ttl: Duration,
    pub revocation_fail_mode: RevocationFailMode,
}

impl SecurityConfig {
    pub fn new(jwt_secret: impl Into<Vec<u8>>) -> Self {
        Self {
            jwt_secret: jwt_secret.into(),
            algorithm: Algorithm::HS256,
            access_ttl: Duration::from_secs(3600),
            revocation_fail_mode: RevocationFailMode::Closed,
        }
    }

    pub fn with_access_ttl(mut self, ttl: Duration) -> Self {
        self.access_ttl = ttl;
        self
    }

    pub fn with_fail_mode(mut self, mode: RevocationFailMode) -> Self {
        self.revocation_fail_mode = mode;
        self
    }
}

impl std::fmt::Debug for SecurityConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecurityConfig")
            .field("jwt_secret", &"<redacted>")
            .field("algorithm", &self.algorithm)
            .field("access_ttl", &self.access_ttl)
            .field("revocation_fail_mode", &self.revocation_fail_mode)
            .finish()
    }
}

/// Session registry settings.
#[derive(Debug, Clone)]
pub struct SessionPolicy {
    /// Records expire this long after their last login.
    pub retention: Duration,
    pub default_list_limit: usize,
    pub max_list_limit: usize,
}

impl Default for SessionPolicy {
    fn default() -> Self {
        Self {
            retention: Duration::from_secs(30 * 24 * 3600),
            default_list_limit: 100,
            max_list_limit: 1000,
        }
    }
}

/// Password recovery lifetimes and link target.
#[derive(Debug, Clone)]
pub struct RecoveryPolicy {
    pub code_ttl: Duration,
    pub reset_token_ttl: Duration,
    pub confirm_token_ttl: Duration,
    /// Expired-but-present codes stay this long so they report as expired
    /// rather than unknown.
    pub code_grace: Duration,
    pub frontend_url: String,
}

impl Default for RecoveryPolicy {
    fn default() -> Self {
        Self {
            code_ttl: Duration::from_secs(600),
            reset_token_ttl: Duration::from_secs(600),
            confirm_token_ttl: Duration::from_secs(300),
            code_grace: Duration::from_secs(300),
            frontend_url: "http://localhost:3000".to_string(),
        }
    }
}

/// Attributes of the `token` auth cookie.
#[derive(Debug, Clone)]
pub struct CookiePolicy {
    pub secure: bool,
}

impl Default for CookiePolicy {
    fn default() -> Self {
        Self { secure: true }
    }
}
