//! Authenticated identity and role checks.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use crate::auth::{jwt::Claims, AuthError, ErrorResponse};
use crate::db::Role;

/// Caller lacks the role or ownership an operation requires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("You do not have permission to perform this action.")]
pub struct RoleMismatch;

impl IntoResponse for RoleMismatch {
    fn into_response(self) -> Response {
        (
            StatusCode::FORBIDDEN,
            Json(ErrorResponse::new("ROLE_MISMATCH", self.to_string())),
        )
            .into_response()
    }
}

/// Authenticated account injected into request extensions by `require_auth`.
///
/// A projection of the session token's claims, so role and name reflect the
/// moment the token was issued.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthUser {
    /// Account ID.
    pub id: i64,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub role: Role,
}

impl TryFrom<Claims> for AuthUser {
    type Error = AuthError;

    fn try_from(claims: Claims) -> Result<Self, Self::Error> {
        Ok(Self {
            id: claims.account_id()?,
            email: claims.email,
            first_name: claims.first_name,
            last_name: claims.last_name,
            role: claims.role,
        })
    }
}

impl AuthUser {
    #[must_use]
    pub const fn current_account_id(&self) -> i64 {
        self.id
    }

    /// Check if the caller holds `role`.
    #[must_use]
    pub fn has_role(&self, role: Role) -> bool {
        self.role == role
    }

    /// Require that the caller holds `role`.
    pub fn require_role(&self, role: Role) -> Result<(), RoleMismatch> {
        if self.has_role(role) {
            Ok(())
        } else {
            tracing::info!(
                account_id = self.id,
                required = %role,
                actual = %self.role,
                "Role check failed"
            );
            Err(RoleMismatch)
        }
    }

    /// Require that the caller is `owner_id`.
    pub fn require_owner(&self, owner_id: i64) -> Result<(), RoleMismatch> {
        if self.id == owner_id {
            Ok(())
        } else {
            tracing::info!(account_id = self.id, owner_id, "Ownership check failed");
            Err(RoleMismatch)
        }
    }
}
