use std::sync::LazyLock;

use regex::Regex;

use crate::utils::error::CustomError;

pub const MIN_PASSWORD_LENGTH: usize = 8;
/// bcrypt ignores everything past 72 bytes.
pub const MAX_PASSWORD_BYTES: usize = 72;

static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9._%+\-]+@[A-Za-z0-9](?:[A-Za-z0-9\-]*[A-Za-z0-9])?(?:\.[A-Za-z0-9](?:[A-Za-z0-9\-]*[A-Za-z0-9])?)*\.[A-Za-z]{2,}$")
        .expect("email pattern is valid")
});

pub fn validate_password(password: &str) -> Result<(), CustomError> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(CustomError::ValidationError(format!(
            "Password must be at least {} characters long",
            MIN_PASSWORD_LENGTH
        )));
    }

    if password.len() > MAX_PASSWORD_BYTES {
        return Err(CustomError::ValidationError(format!(
            "Password must be at most {} bytes long",
            MAX_PASSWORD_BYTES
        )));
    }

    Ok(())
}

/// Lower-cases and trims an address before validation and lookup.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

pub fn validate_email(email: &str) -> Result<(), CustomError> {
    if email.len() > 254 || email.contains("..") || !EMAIL_RE.is_match(email) {
        return Err(CustomError::ValidationError("Invalid email format".into()));
    }
    Ok(())
}
