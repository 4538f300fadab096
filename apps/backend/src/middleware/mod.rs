pub mod auth_gate;
pub mod cors;
pub mod rate_limit;
pub mod request_trace;
pub mod role_gate;
pub mod structured_logger;
pub mod trace_span;

pub use auth_gate::AuthGate;
pub use cors::cors_middleware;
pub use rate_limit::RateLimits;
pub use request_trace::RequestTrace;
pub use role_gate::{Policy, RoleGate};
pub use structured_logger::StructuredLogger;
pub use trace_span::TraceSpan;
