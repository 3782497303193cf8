//! Authentication Error Types

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::db::StoreError;

/// Authentication error types.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Unknown email or wrong password. Deliberately one variant for both.
    #[error("Invalid email or password.")]
    InvalidCredentials,

    /// Password and confirmation differ.
    #[error("Passwords do not match.")]
    PasswordMismatch,

    /// Email does not look like an address.
    #[error("Invalid email format.")]
    InvalidEmail,

    /// Email already registered (registration or profile update).
    #[error("A user with this email already exists.")]
    AccountExists,

    /// Account addressed by a valid token no longer exists.
    #[error("User not found.")]
    AccountNotFound,

    /// Empty or missing identity assertion.
    #[error("Identity token is required.")]
    InvalidAssertion,

    /// Identity assertion failed provider verification.
    #[error("Invalid identity token.")]
    InvalidIdentityToken,

    /// Identity already bound elsewhere, or a create race could not be resolved.
    #[error("This identity conflicts with an existing account.")]
    IdentityConflict,

    /// Federated login is not configured on this server.
    #[error("Federated login is not configured")]
    FederationNotConfigured,

    /// First-login role selection was already used.
    #[error("Role has already been selected.")]
    RoleAlreadySelected,

    /// Invalid, expired or tampered bearer token.
    #[error("Invalid or expired token")]
    InvalidToken,

    /// Missing Authorization header.
    #[error("Missing authorization header")]
    MissingAuthHeader,

    /// Invalid authorization header format.
    #[error("Invalid authorization header format")]
    InvalidAuthHeader,

    /// Validation error.
    #[error("Validation failed: {0}")]
    Validation(String),

    /// Password hashing error.
    #[error("Password processing failed")]
    PasswordHash,

    /// Store error.
    #[error("Database error")]
    Store(#[from] StoreError),

    /// Internal server error.
    #[error("Internal server error")]
    Internal(String),
}

/// Error response body for JSON responses.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Always `false`.
    pub success: bool,
    /// Machine-readable error code.
    pub error: String,
    /// Human-readable error message.
    pub message: String,
}

impl ErrorResponse {
    #[must_use]
    pub fn new(code: &str, message: impl Into<String>) -> Self {
        Self {
            success: false,
            error: code.to_string(),
            message: message.into(),
        }
    }
}

impl AuthError {
    /// Status code and machine-readable code for this error.
    #[must_use]
    pub const fn status(&self) -> (StatusCode, &'static str) {
        match self {
            Self::InvalidCredentials => (StatusCode::UNAUTHORIZED, "INVALID_CREDENTIALS"),
            Self::PasswordMismatch => (StatusCode::BAD_REQUEST, "PASSWORD_MISMATCH"),
            Self::InvalidEmail => (StatusCode::BAD_REQUEST, "INVALID_EMAIL"),
            Self::AccountExists => (StatusCode::CONFLICT, "USER_EXISTS"),
            Self::AccountNotFound => (StatusCode::NOT_FOUND, "USER_NOT_FOUND"),
            Self::InvalidAssertion => (StatusCode::BAD_REQUEST, "INVALID_ASSERTION"),
            Self::InvalidIdentityToken => (StatusCode::UNAUTHORIZED, "INVALID_IDENTITY_TOKEN"),
            Self::IdentityConflict => (StatusCode::CONFLICT, "IDENTITY_CONFLICT"),
            Self::FederationNotConfigured => {
                (StatusCode::SERVICE_UNAVAILABLE, "FEDERATION_NOT_CONFIGURED")
            }
            Self::RoleAlreadySelected => (StatusCode::CONFLICT, "ROLE_ALREADY_SELECTED"),
            Self::InvalidToken => (StatusCode::UNAUTHORIZED, "INVALID_TOKEN"),
            Self::MissingAuthHeader => (StatusCode::UNAUTHORIZED, "MISSING_AUTH"),
            Self::InvalidAuthHeader => (StatusCode::UNAUTHORIZED, "INVALID_AUTH_HEADER"),
            Self::Validation(_) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR"),
            Self::PasswordHash | Self::Store(_) | Self::Internal(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR")
            }
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let (status, code) = self.status();

        match &self {
            Self::Store(e) => tracing::error!(error = ?e, "Auth store error"),
            Self::Internal(detail) => tracing::error!(detail = %detail, "Auth internal error"),
            Self::PasswordHash => tracing::error!("Password hashing failed"),
            _ => {}
        }

        let body = Json(ErrorResponse::new(code, self.to_string()));

        (status, body).into_response()
    }
}

impl From<JsonRejection> for AuthError {
    fn from(rejection: JsonRejection) -> Self {
        Self::Validation(rejection.body_text())
    }
}

/// Result type for auth operations.
pub type AuthResult<T> = Result<T, AuthError>;
