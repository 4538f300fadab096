#![deny(clippy::wildcard_imports)]
#![cfg_attr(test, allow(clippy::wildcard_imports))]

pub mod adapters;
pub mod auth;
pub mod config;
pub mod domain;
pub mod error;
pub mod errors;
pub mod extractors;
pub mod http;
pub mod identity_provider;
pub mod infra;
pub mod logging;
pub mod mail;
pub mod middleware;
pub mod password;
pub mod repos;
pub mod routes;
pub mod services;
pub mod state;
pub mod telemetry;
pub mod trace_ctx;

// Re-exports for public API
pub use auth::claims::{AccessClaims, RecoveryClaims, RecoveryPurpose};
pub use error::AppError;
pub use errors::{DomainError, ErrorCode};
pub use extractors::{AuthToken, CurrentSubject, ValidatedJson};
pub use infra::state::{build_state, StateBuilder};
pub use middleware::{AuthGate, RequestTrace, RoleGate, StructuredLogger, TraceSpan};
pub use state::app_state::AppState;
pub use state::security_config::SecurityConfig;

// Auto-initialize logging for unit tests
#[cfg(test)]
#[ctor::ctor]
fn init_test_logging() {
    backend_test_support::logging::init();
}
