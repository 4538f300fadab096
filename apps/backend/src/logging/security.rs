//! Security event log lines. Each carries a stable `event` field so log
//! pipelines can alert on them.

use tracing::{error, info, warn};

use crate::logging::pii::Redacted;
use crate::trace_ctx;

/// A request failed authentication. `reason` is internal only.
pub fn auth_rejected(reason: &str) {
    let trace_id = trace_ctx::trace_id();
    warn!(
        event = "SECURITY_AUTH_REJECTED",
        %trace_id,
        reason,
        "Authentication rejected"
    );
}

pub fn token_revoked(customer_id: &str, cause: &str) {
    let trace_id = trace_ctx::trace_id();
    info!(
        event = "SECURITY_TOKEN_REVOKED",
        %trace_id,
        customer_id,
        cause,
        "Token revoked"
    );
}

pub fn reset_requested(email: &str, registered: bool) {
    let trace_id = trace_ctx::trace_id();
    info!(
        event = "SECURITY_RESET_REQUESTED",
        %trace_id,
        email = %Redacted(email),
        registered,
        "Password reset requested"
    );
}

pub fn reset_completed(email: &str, proof: &str) {
    let trace_id = trace_ctx::trace_id();
    info!(
        event = "SECURITY_RESET_COMPLETED",
        %trace_id,
        email = %Redacted(email),
        proof,
        "Password reset completed"
    );
}

/// The revocation ledger could not be consulted. `fail_open` says whether the
/// token was allowed through anyway.
pub fn ledger_unavailable(fail_open: bool, error: &str) {
    let trace_id = trace_ctx::trace_id();
    error!(
        event = "SECURITY_LEDGER_UNAVAILABLE",
        %trace_id,
        fail_open,
        error = %Redacted(error),
        "Revocation ledger unavailable"
    );
}
