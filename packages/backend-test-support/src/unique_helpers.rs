//! Test helpers for generating unique test data
//!
//! ULID suffixes keep parallel tests from colliding on shared stores.

use ulid::Ulid;

/// Generate a unique string in the format `{prefix}-{ulid}`.
///
/// ```
/// use backend_test_support::unique_helpers::unique_str;
///
/// let id1 = unique_str("ext");
/// let id2 = unique_str("ext");
/// assert_ne!(id1, id2);
/// assert!(id1.starts_with("ext-"));
/// ```
pub fn unique_str(prefix: &str) -> String {
    format!("{}-{}", prefix, Ulid::new())
}

/// Generate a unique, already-normalized (lower-case) email address.
///
/// ```
/// use backend_test_support::unique_helpers::unique_email;
///
/// let email = unique_email("reset");
/// assert!(email.starts_with("reset-"));
/// assert!(email.ends_with("@example.test"));
/// assert_eq!(email, email.to_lowercase());
/// ```
pub fn unique_email(prefix: &str) -> String {
    format!("{}-{}@example.test", prefix, Ulid::new()).to_lowercase()
}

/// Generate a unique identity-provider subject id (the "uid" of an assertion).
pub fn unique_external_id() -> String {
    format!("ext-{}", Ulid::new().to_string().to_lowercase())
}
