//! Email normalization shared by every lookup keyed on email.

use unicode_normalization::UnicodeNormalization;

use crate::errors::DomainError;

/// Trim, NFKC-normalize and lowercase.
pub fn normalize_email(email: &str) -> String {
    email.trim().nfkc().collect::<String>().to_lowercase()
}

/// Normalize and apply a structural sanity check (one `@`, non-empty local
/// part, dotted domain).
pub fn parse_email(raw: &str) -> Result<String, DomainError> {
    let email = normalize_email(raw);
    let valid = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && !email.chars().any(char::is_whitespace)
        }
        None => false,
    };
    if valid {
        Ok(email)
    } else {
        Err(DomainError::validation("Valid email required"))
    }
}
