//! User account validation.

use std::sync::LazyLock;

use regex::Regex;

use crate::error::CoreError;
use crate::roles::VALID_ROLES;

/// Conflict message for a duplicate username or email.
pub const USER_ALREADY_EXISTS: &str = "User Already Exists";

/// Minimum password length accepted on account creation.
pub const MIN_PASSWORD_LENGTH: usize = 8;

pub const MAX_USERNAME_LENGTH: usize = 64;

static USERNAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_.\-]+$").expect("valid regex"));

static EMAIL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("valid regex"));

pub fn validate_username(username: &str) -> Result<(), CoreError> {
    if username.is_empty() || username.len() > MAX_USERNAME_LENGTH {
        return Err(CoreError::Validation(format!(
            "Username must be between 1 and {MAX_USERNAME_LENGTH} characters"
        )));
    }
    if !USERNAME_RE.is_match(username) {
        return Err(CoreError::Validation(
            "Username may only contain letters, digits, '.', '_' and '-'".to_string(),
        ));
    }
    Ok(())
}

pub fn validate_email(email: &str) -> Result<(), CoreError> {
    if !EMAIL_RE.is_match(email) {
        return Err(CoreError::Validation(format!(
            "'{email}' is not a valid email address"
        )));
    }
    Ok(())
}

pub fn validate_role(role: &str) -> Result<(), CoreError> {
    if !VALID_ROLES.contains(&role) {
        return Err(CoreError::Validation(format!(
            "Invalid role '{role}'. Must be one of: {}",
            VALID_ROLES.join(", ")
        )));
    }
    Ok(())
}

pub fn validate_password(password: &str) -> Result<(), CoreError> {
    if password.len() < MIN_PASSWORD_LENGTH {
        return Err(CoreError::Validation(format!(
            "Password must be at least {MIN_PASSWORD_LENGTH} characters long"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn usernames() {
        assert!(validate_username("jane.doe-01").is_ok());
        assert!(validate_username("").is_err());
        assert!(validate_username("has space").is_err());
    }

    #[test]
    fn emails() {
        assert!(validate_email("a@example.org").is_ok());
        assert!(validate_email("not-an-email").is_err());
        assert!(validate_email("two@@example.org").is_err());
    }

    #[test]
    fn roles() {
        assert!(validate_role("trainer").is_ok());
        assert!(validate_role("superuser").is_err());
    }

    #[test]
    fn passwords() {
        assert!(validate_password("short").is_err());
        assert!(validate_password("long-enough").is_ok());
    }
}
