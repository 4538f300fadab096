use crate::errors::DomainError;

pub const MIN_PASSWORD_LEN: usize = 8;

/// New passwords need 8+ characters with an upper-case letter, a lower-case
/// letter and a digit. The first violated rule is reported.
pub fn check_password_policy(password: &str) -> Result<(), DomainError> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(DomainError::validation(
            "Password must be at least 8 characters",
        ));
    }
    if !password.chars().any(char::is_uppercase) {
        return Err(DomainError::validation(
            "Password must contain an uppercase letter",
        ));
    }
    if !password.chars().any(char::is_lowercase) {
        return Err(DomainError::validation(
            "Password must contain a lowercase letter",
        ));
    }
    if !password.chars().any(|c| c.is_ascii_digit()) {
        return Err(DomainError::validation("Password must contain a number"));
    }
    Ok(())
}
