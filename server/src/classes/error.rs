//! Class Error Types

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use crate::auth::ErrorResponse;
use crate::db::StoreError;
use crate::permissions::RoleMismatch;

#[derive(Debug, Error)]
pub enum ClassError {
    #[error("Class not found.")]
    ClassNotFound,

    #[error("User not found.")]
    UserNotFound,

    /// Wrong role for the operation, or not the class owner.
    #[error(transparent)]
    RoleMismatch(#[from] RoleMismatch),

    #[error("User is already a participant of this class.")]
    AlreadyParticipant,

    #[error("Class is full.")]
    ClassFull,

    #[error("User is not a participant of this class.")]
    NotParticipant,

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Database error")]
    Store(#[from] StoreError),
}

impl ClassError {
    #[must_use]
    pub const fn status(&self) -> (StatusCode, &'static str) {
        match self {
            Self::ClassNotFound => (StatusCode::NOT_FOUND, "CLASS_NOT_FOUND"),
            Self::UserNotFound => (StatusCode::NOT_FOUND, "USER_NOT_FOUND"),
            Self::RoleMismatch(_) => (StatusCode::FORBIDDEN, "ROLE_MISMATCH"),
            Self::AlreadyParticipant => (StatusCode::CONFLICT, "ALREADY_PARTICIPANT"),
            Self::ClassFull => (StatusCode::CONFLICT, "CLASS_FULL"),
            Self::NotParticipant => (StatusCode::BAD_REQUEST, "NOT_PARTICIPANT"),
            Self::Validation(_) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR"),
            Self::Store(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        }
    }
}

impl IntoResponse for ClassError {
    fn into_response(self) -> Response {
        let (status, code) = self.status();

        if let Self::Store(e) = &self {
            tracing::error!(error = ?e, "Class store error");
        }

        (status, Json(ErrorResponse::new(code, self.to_string()))).into_response()
    }
}

impl From<JsonRejection> for ClassError {
    fn from(rejection: JsonRejection) -> Self {
        Self::Validation(rejection.body_text())
    }
}

pub type ClassResult<T> = Result<T, ClassError>;
