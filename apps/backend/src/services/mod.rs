//! Auth core services. Each is cheap to clone and lives in `AppState`.

pub mod credentials;
pub mod customer_ids;
pub mod identity;
pub mod recovery;
pub mod sessions;

pub use credentials::{CredentialService, IssuedToken};
pub use identity::{ExchangeOutcome, IdentityResolver};
pub use recovery::{RecoveryFlow, ResetProof};
pub use sessions::SessionRegistry;
