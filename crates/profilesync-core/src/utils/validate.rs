//! Client-side form validation.
//!
//! These mirror the rules the backend enforces so obviously bad input is
//! rejected before a request is made. The backend stays authoritative.

use thiserror::Error;

use crate::models::{Credentials, ProfilePatch, RegistrationForm};

const MIN_LOGIN_PASSWORD_LENGTH: usize = 6;
const MIN_REGISTER_PASSWORD_LENGTH: usize = 8;
const MIN_USERNAME_LENGTH: usize = 3;
const MAX_USERNAME_LENGTH: usize = 20;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct ValidationError {
    pub field: &'static str,
    pub message: &'static str,
}

impl ValidationError {
    fn new(field: &'static str, message: &'static str) -> Self {
        Self { field, message }
    }
}

/// Loose email check: one `@`, a non-empty local part, and a dotted domain
pub fn is_valid_email(email: &str) -> bool {
    if email.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
        && !domain.contains("..")
}

fn check_username(username: &str) -> Result<(), ValidationError> {
    let len = username.chars().count();
    if len < MIN_USERNAME_LENGTH {
        return Err(ValidationError::new(
            "username",
            "Username must be at least 3 characters",
        ));
    }
    if len > MAX_USERNAME_LENGTH {
        return Err(ValidationError::new(
            "username",
            "Username must be less than 20 characters",
        ));
    }
    Ok(())
}

fn check_email(email: &str) -> Result<(), ValidationError> {
    if !is_valid_email(email) {
        return Err(ValidationError::new("email", "Enter a valid email"));
    }
    Ok(())
}

pub fn validate_credentials(credentials: &Credentials) -> Result<(), ValidationError> {
    if credentials.identifier.trim().is_empty() {
        return Err(ValidationError::new(
            "identifier",
            "Email or username is required",
        ));
    }
    if credentials.password.is_empty() {
        return Err(ValidationError::new("password", "Password is required"));
    }
    if credentials.password.chars().count() < MIN_LOGIN_PASSWORD_LENGTH {
        return Err(ValidationError::new(
            "password",
            "Password must be at least 6 characters",
        ));
    }
    Ok(())
}

pub fn validate_registration(form: &RegistrationForm) -> Result<(), ValidationError> {
    if form.username.is_empty() {
        return Err(ValidationError::new("username", "Username is required"));
    }
    check_username(&form.username)?;

    if form.email.is_empty() {
        return Err(ValidationError::new("email", "Email is required"));
    }
    check_email(&form.email)?;

    let password = &form.password;
    if password.is_empty() {
        return Err(ValidationError::new("password", "Password is required"));
    }
    if password.chars().count() < MIN_REGISTER_PASSWORD_LENGTH {
        return Err(ValidationError::new(
            "password",
            "Password must be at least 8 characters",
        ));
    }
    let has_lower = password.chars().any(|c| c.is_ascii_lowercase());
    let has_upper = password.chars().any(|c| c.is_ascii_uppercase());
    let has_digit = password.chars().any(|c| c.is_ascii_digit());
    if !(has_lower && has_upper && has_digit) {
        return Err(ValidationError::new(
            "password",
            "Password must contain at least one uppercase letter, one lowercase letter, and one number",
        ));
    }

    if form.confirm_password.is_empty() {
        return Err(ValidationError::new(
            "confirm_password",
            "Please confirm your password",
        ));
    }
    if form.confirm_password != form.password {
        return Err(ValidationError::new("confirm_password", "Passwords must match"));
    }
    Ok(())
}

/// Blank fields are allowed (they mean "unchanged"); filled ones must be valid.
pub fn validate_profile_patch(patch: &ProfilePatch) -> Result<(), ValidationError> {
    if let Some(username) = patch.get("username").filter(|s| !s.trim().is_empty()) {
        check_username(username)?;
    }
    if let Some(email) = patch.get("email").filter(|s| !s.trim().is_empty()) {
        check_email(email)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form(username: &str, email: &str, password: &str, confirm: &str) -> RegistrationForm {
        RegistrationForm {
            username: username.to_string(),
            email: email.to_string(),
            password: password.to_string(),
            confirm_password: confirm.to_string(),
        }
    }

    #[test]
    fn test_is_valid_email() {
        assert!(is_valid_email("a@b.com"));
        assert!(is_valid_email("first.last+tag@example.co.uk"));

        assert!(!is_valid_email(""));
        assert!(!is_valid_email("alice"));
        assert!(!is_valid_email("@b.com"));
        assert!(!is_valid_email("a@b"));
        assert!(!is_valid_email("a@.com"));
        assert!(!is_valid_email("a@b..com"));
        assert!(!is_valid_email("a b@c.com"));
        assert!(!is_valid_email("a@b@c.com"));
    }

    #[test]
    fn test_validate_credentials() {
        assert!(validate_credentials(&Credentials::new("a@b.com", "secret1")).is_ok());

        let err = validate_credentials(&Credentials::new("  ", "secret1")).unwrap_err();
        assert_eq!(err.field, "identifier");

        let err = validate_credentials(&Credentials::new("alice", "")).unwrap_err();
        assert_eq!(err.message, "Password is required");

        let err = validate_credentials(&Credentials::new("alice", "12345")).unwrap_err();
        assert_eq!(err.message, "Password must be at least 6 characters");
    }

    #[test]
    fn test_validate_registration() {
        assert!(validate_registration(&form("alice", "a@b.com", "Secret12", "Secret12")).is_ok());

        let err = validate_registration(&form("al", "a@b.com", "Secret12", "Secret12")).unwrap_err();
        assert_eq!(err.field, "username");

        let long = "a".repeat(21);
        let err = validate_registration(&form(&long, "a@b.com", "Secret12", "Secret12")).unwrap_err();
        assert_eq!(err.message, "Username must be less than 20 characters");

        let err = validate_registration(&form("alice", "nope", "Secret12", "Secret12")).unwrap_err();
        assert_eq!(err.field, "email");

        let err = validate_registration(&form("alice", "a@b.com", "Secret1", "Secret1")).unwrap_err();
        assert_eq!(err.message, "Password must be at least 8 characters");

        let err = validate_registration(&form("alice", "a@b.com", "secret12", "secret12")).unwrap_err();
        assert!(err.message.starts_with("Password must contain"));

        let err = validate_registration(&form("alice", "a@b.com", "Secret12", "Secret13")).unwrap_err();
        assert_eq!(err.message, "Passwords must match");
    }

    #[test]
    fn test_validate_profile_patch() {
        assert!(validate_profile_patch(&ProfilePatch::new()).is_ok());
        assert!(validate_profile_patch(&ProfilePatch::new().with("username", "")).is_ok());
        assert!(validate_profile_patch(&ProfilePatch::new().with("username", "bob")).is_ok());

        let err = validate_profile_patch(&ProfilePatch::new().with("username", "bo")).unwrap_err();
        assert_eq!(err.field, "username");

        let err = validate_profile_patch(&ProfilePatch::new().with("email", "bob")).unwrap_err();
        assert_eq!(err.field, "email");
    }
}
