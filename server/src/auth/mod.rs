//! Authentication Service
//!
//! Password and federated login, session tokens, and the account endpoints
//! that sit behind a session.

mod error;
pub mod federation;
mod handlers;
pub mod jwt;
mod middleware;
pub mod oidc;
pub mod password;
mod service;

use axum::{
    middleware as axum_middleware,
    routing::{get, post},
    Router,
};

use crate::api::AppState;

pub use error::{AuthError, AuthResult, ErrorResponse};
pub use federation::FederationResolver;
pub use jwt::{Claims, TokenIssuer};
pub use middleware::require_auth;
pub use oidc::{GoogleIdTokenVerifier, IdentityError, IdentityVerifier, VerifiedIdentity};
pub use service::{AuthService, Profile, ProfileUpdate, Registration};

/// Create authentication router.
///
/// Public routes:
/// - POST /login - Login with email/password
/// - POST /register - Register a new account
/// - POST /google - Login with a Google ID token
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/login", post(handlers::login))
        .route("/register", post(handlers::register))
        .route("/google", post(handlers::google_login))
}

/// Create the current-account router.
///
/// Protected routes (auth required):
/// - GET /me - Get profile
/// - PUT /me - Update profile
/// - DELETE /me - Delete account
/// - POST /me/role - One-time role selection
pub fn users_router(state: AppState) -> Router<AppState> {
    Router::new()
        .route(
            "/me",
            get(handlers::get_profile)
                .put(handlers::update_profile)
                .delete(handlers::delete_account),
        )
        .route("/me/role", post(handlers::select_role))
        .layer(axum_middleware::from_fn_with_state(state, require_auth))
}
