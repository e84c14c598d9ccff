//! Login input checks shared by the HTTP handler and the `login` probe.

use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

/// Login body as sent by clients.
///
/// Older clients send the password as `senha`; newer ones as `password`.
#[derive(ToSchema, Serialize, Deserialize, Debug, Clone, Default)]
pub struct LoginRequest {
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub senha: Option<String>,
}

/// Validated login input.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &"***")
            .finish()
    }
}

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Invalid email")]
    InvalidEmail,
    #[error("Password not provided")]
    MissingPassword,
}

/// Normalize an email for lookup.
#[must_use]
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Basic email format check.
#[must_use]
pub fn valid_email(email: &str) -> bool {
    Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").is_ok_and(|re| re.is_match(email))
}

/// Pick the password field: `senha` whenever it is present, else `password`.
///
/// A present but blank `senha` shadows `password`. `""` and `"0"` count as
/// no password.
#[must_use]
pub fn resolve_password<'a>(senha: Option<&'a str>, password: Option<&'a str>) -> Option<&'a str> {
    senha
        .or(password)
        .filter(|value| !value.is_empty() && *value != "0")
}

/// Validate a login body. The email is checked before the password.
///
/// # Errors
/// Returns `InvalidEmail` or `MissingPassword`.
pub fn validate_login(request: &LoginRequest) -> Result<Credentials, ValidationError> {
    let email = normalize_email(&request.email);
    if !valid_email(&email) {
        return Err(ValidationError::InvalidEmail);
    }

    let password = resolve_password(request.senha.as_deref(), request.password.as_deref())
        .ok_or(ValidationError::MissingPassword)?;

    Ok(Credentials {
        email,
        password: password.to_string(),
    })
}

/// One `*` per character, for echoing a password back to an operator.
#[must_use]
pub fn mask_password(password: &str) -> String {
    "*".repeat(password.chars().count())
}
