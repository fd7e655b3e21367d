//! Admin login and registration form validation.

use thiserror::Error;

use crate::api_client::{BoardApiError, LoginRequest, RegisterRequest};

pub const MIN_PASSWORD_CHARS: usize = 6;
pub const LOGIN_FAILURE_MESSAGE: &str = "Invalid email or password.";
pub const REGISTRATION_FAILURE_MESSAGE: &str = "Registration failed. Please try again.";
pub const NETWORK_FAILURE_MESSAGE: &str = "Network error. Please check if the backend is running.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AuthFormError {
    #[error("Email and password are required.")]
    MissingCredentials,
    #[error("All fields are required.")]
    MissingFields,
    #[error("Password must be at least 6 characters.")]
    PasswordTooShort,
    #[error("Passwords do not match.")]
    PasswordMismatch,
    #[error("An authentication request is already in progress.")]
    AlreadySubmitting,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthKind {
    Login,
    Register,
}

impl AuthKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Login => "login",
            Self::Register => "register",
        }
    }
}

pub fn validate_login(email: &str, password: &str) -> Result<LoginRequest, AuthFormError> {
    let email = email.trim();
    if email.is_empty() || password.is_empty() {
        return Err(AuthFormError::MissingCredentials);
    }
    Ok(LoginRequest {
        email: email.to_string(),
        password: password.to_string(),
    })
}

pub fn validate_registration(
    username: &str,
    email: &str,
    password: &str,
    confirm_password: &str,
) -> Result<RegisterRequest, AuthFormError> {
    let username = username.trim();
    let email = email.trim();
    if username.is_empty() || email.is_empty() || password.is_empty() || confirm_password.is_empty()
    {
        return Err(AuthFormError::MissingFields);
    }
    if password.chars().count() < MIN_PASSWORD_CHARS {
        return Err(AuthFormError::PasswordTooShort);
    }
    if password != confirm_password {
        return Err(AuthFormError::PasswordMismatch);
    }
    Ok(RegisterRequest {
        username: username.to_string(),
        email: email.to_string(),
        password: password.to_string(),
    })
}

/// Alert text for a failed login or registration request.
pub fn auth_failure_message(kind: AuthKind, error: &BoardApiError) -> String {
    if error.is_transport() {
        return NETWORK_FAILURE_MESSAGE.to_string();
    }
    if let Some(detail) = error.detail() {
        return detail.to_string();
    }
    match kind {
        AuthKind::Login => LOGIN_FAILURE_MESSAGE.to_string(),
        AuthKind::Register => REGISTRATION_FAILURE_MESSAGE.to_string(),
    }
}
