//! Authentication and account HTTP handlers.

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::api::{AppState, DataResponse, MessageResponse};
use crate::permissions::AuthUser;

use super::error::{AuthError, AuthResult};
use super::service::{Profile, ProfileUpdate, Registration};

// ============================================================================
// Request/Response Types
// ============================================================================

/// Login request.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Registration request.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub confirm_password: String,
    pub first_name: String,
    pub last_name: String,
}

/// Federated login request carrying a provider ID token.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GoogleLoginRequest {
    pub id_token: String,
}

/// First-login role selection.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectRoleRequest {
    pub is_educator: bool,
}

/// Profile update request.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProfileRequest {
    pub email: String,
    #[validate(length(min = 1, max = 50, message = "First name must be 1-50 characters"))]
    pub first_name: String,
    #[validate(length(min = 1, max = 50, message = "Last name must be 1-50 characters"))]
    pub last_name: String,
}

/// Session token response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub auth_token: String,
    pub success: bool,
}

impl LoginResponse {
    const fn new(auth_token: String) -> Self {
        Self {
            auth_token,
            success: true,
        }
    }
}

// ============================================================================
// Handlers
// ============================================================================

/// Log in with email and password.
///
/// POST /auth/login
#[tracing::instrument(skip_all)]
pub async fn login(
    State(state): State<AppState>,
    body: Result<Json<LoginRequest>, JsonRejection>,
) -> AuthResult<Json<LoginResponse>> {
    let Json(body) = body?;
    let token = state.auth.login(&body.email, &body.password).await?;
    Ok(Json(LoginResponse::new(token)))
}

/// Register a password account.
///
/// POST /auth/register
#[tracing::instrument(skip_all)]
pub async fn register(
    State(state): State<AppState>,
    body: Result<Json<RegisterRequest>, JsonRejection>,
) -> AuthResult<(StatusCode, Json<MessageResponse>)> {
    let Json(body) = body?;
    state
        .auth
        .register(Registration {
            email: body.email,
            password: body.password,
            confirm_password: body.confirm_password,
            first_name: body.first_name,
            last_name: body.last_name,
        })
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(MessageResponse::new("User registered successfully.")),
    ))
}

/// Log in with a Google ID token.
///
/// POST /auth/google
#[tracing::instrument(skip_all)]
pub async fn google_login(
    State(state): State<AppState>,
    body: Result<Json<GoogleLoginRequest>, JsonRejection>,
) -> AuthResult<Json<LoginResponse>> {
    let Json(body) = body?;
    let token = state
        .auth
        .login_with_federated_identity(&body.id_token)
        .await?;
    Ok(Json(LoginResponse::new(token)))
}

/// Get the current account.
///
/// GET /users/me
pub async fn get_profile(
    State(state): State<AppState>,
    auth_user: AuthUser,
) -> AuthResult<Json<DataResponse<Profile>>> {
    let profile = state.auth.profile(auth_user.id).await?;
    Ok(Json(DataResponse::new(profile)))
}

/// Update the current account.
///
/// PUT /users/me
#[tracing::instrument(skip(state, body), fields(account_id = auth_user.id))]
pub async fn update_profile(
    State(state): State<AppState>,
    auth_user: AuthUser,
    body: Result<Json<UpdateProfileRequest>, JsonRejection>,
) -> AuthResult<Json<DataResponse<Profile>>> {
    let Json(body) = body?;
    body.validate()
        .map_err(|e| AuthError::Validation(e.to_string()))?;

    let profile = state
        .auth
        .update_profile(
            auth_user.id,
            ProfileUpdate {
                email: body.email,
                first_name: body.first_name,
                last_name: body.last_name,
            },
        )
        .await?;
    Ok(Json(DataResponse::new(profile)))
}

/// Delete the current account along with its classes and participations.
///
/// DELETE /users/me
#[tracing::instrument(skip(state), fields(account_id = auth_user.id))]
pub async fn delete_account(
    State(state): State<AppState>,
    auth_user: AuthUser,
) -> AuthResult<Json<MessageResponse>> {
    state.auth.delete_account(auth_user.id).await?;
    Ok(Json(MessageResponse::new("User deleted successfully.")))
}

/// Choose educator or student on first login.
///
/// POST /users/me/role
#[tracing::instrument(skip(state, body), fields(account_id = auth_user.id))]
pub async fn select_role(
    State(state): State<AppState>,
    auth_user: AuthUser,
    body: Result<Json<SelectRoleRequest>, JsonRejection>,
) -> AuthResult<Json<LoginResponse>> {
    let Json(body) = body?;
    let token = state
        .auth
        .select_role(auth_user.id, body.is_educator)
        .await?;
    Ok(Json(LoginResponse::new(token)))
}
