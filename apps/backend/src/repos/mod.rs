//! Storage traits for the auth core. Each has an in-memory and a Redis
//! implementation under `crate::adapters`.

pub mod ephemeral;
pub mod revocations;
pub mod sessions;
pub mod subjects;

pub use ephemeral::EphemeralStore;
pub use revocations::RevocationLedger;
pub use sessions::{LoginMethod, SessionFilter, SessionLogin, SessionRecord, SessionRepo};
pub use subjects::{NewSubject, Subject, SubjectRepo};
