//! API Router and Application State
//!
//! Central routing configuration and shared state.

use std::any::Any;
use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::Serialize;
use tower_http::{
    catch_panic::CatchPanicLayer,
    cors::{Any as AnyOrigin, CorsLayer},
    trace::TraceLayer,
};

use crate::{
    auth::{self, AuthService, ErrorResponse, FederationResolver, IdentityVerifier, TokenIssuer},
    classes::{self, ClassService},
    config::Config,
    db::{AccountStore, ClassStore},
};

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Server configuration
    pub config: Arc<Config>,
    /// Login, registration and account operations
    pub auth: AuthService,
    /// Class participation
    pub classes: ClassService,
}

impl AppState {
    /// Create new application state over one store backend.
    ///
    /// Federated login is enabled when a verifier is given.
    #[must_use]
    pub fn new<S>(
        config: Config,
        store: Arc<S>,
        verifier: Option<Arc<dyn IdentityVerifier>>,
    ) -> Self
    where
        S: AccountStore + ClassStore + 'static,
    {
        let accounts: Arc<dyn AccountStore> = store.clone();
        let class_store: Arc<dyn ClassStore> = store;

        let federation = verifier.map(|v| FederationResolver::new(v, accounts.clone()));
        let tokens = TokenIssuer::from_config(&config);

        Self {
            config: Arc::new(config),
            auth: AuthService::new(accounts.clone(), tokens, federation),
            classes: ClassService::new(accounts, class_store),
        }
    }
}

/// Success body carrying a payload.
#[derive(Debug, Serialize)]
pub struct DataResponse<T> {
    pub success: bool,
    pub data: T,
}

impl<T> DataResponse<T> {
    pub const fn new(data: T) -> Self {
        Self {
            success: true,
            data,
        }
    }
}

/// Success body carrying a message.
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub success: bool,
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }
}

/// Create the main application router.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(AnyOrigin)
        .allow_methods(AnyOrigin)
        .allow_headers(AnyOrigin);

    Router::new()
        // Health check
        .route("/health", get(health_check))
        // Public auth routes
        .nest("/auth", auth::router())
        // Protected routes
        .nest("/users", auth::users_router(state.clone()))
        .nest("/classes", classes::router(state.clone()))
        // Middleware
        .layer(CatchPanicLayer::custom(handle_panic))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        // State
        .with_state(state)
}

/// Turn a handler panic into a generic 500.
fn handle_panic(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = err
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| err.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic");
    tracing::error!(panic = %detail, "Handler panicked");

    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorResponse::new("INTERNAL_ERROR", "Internal server error")),
    )
        .into_response()
}

/// Health check response.
#[derive(Serialize)]
struct HealthResponse {
    /// Service status
    status: &'static str,
    /// Whether federated login is enabled
    federation: bool,
}

/// Health check endpoint.
async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        federation: state.auth.has_federation(),
    })
}
