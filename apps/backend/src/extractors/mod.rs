pub mod auth_token;
pub mod current_subject;
pub mod validated_json;

pub use auth_token::{AuthToken, MaybeAuthToken};
pub use current_subject::CurrentSubject;
pub use validated_json::ValidatedJson;
