//! Rate limit settings for the credential-issuing endpoints.
//!
//! - Exchange and password login: 10 requests per minute per IP
//! - Password reset: 5 requests per minute per IP
//! - Everything else: not limited
//!
//! Counters are keyed by client IP and path.

use std::time::Duration;

use actix_extensible_rate_limit::backend::memory::InMemoryBackend;
use actix_extensible_rate_limit::backend::SimpleInputFunctionBuilder;

pub fn auth_rate_limit_config() -> SimpleInputFunctionBuilder {
    SimpleInputFunctionBuilder::new(Duration::from_secs(60), 10).real_ip_key().path_key()
}

pub fn recovery_rate_limit_config() -> SimpleInputFunctionBuilder {
    SimpleInputFunctionBuilder::new(Duration::from_secs(60), 5).real_ip_key().path_key()
}

/// Shared counters for every limited route. Build once per process and
/// clone into each worker so limits hold across workers.
#[derive(Clone)]
pub struct RateLimits {
    pub backend: InMemoryBackend,
    pub enabled: bool,
}

impl RateLimits {
    pub fn enabled() -> Self {
        Self {
            backend: InMemoryBackend::builder().build(),
            enabled: true,
        }
    }

    /// Limiters stay mounted but pass everything through.
    pub fn disabled() -> Self {
        Self {
            backend: InMemoryBackend::builder().build(),
            enabled: false,
        }
    }
}
