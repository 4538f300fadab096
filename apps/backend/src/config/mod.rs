pub mod env;

pub use env::{parse_duration, AppConfig, IdentityConfig, MailRelayConfig, StoreBackend};
