//! Classes
//!
//! Educator-owned classes and student participation.

mod error;
mod handlers;
mod service;

use axum::{
    middleware::from_fn_with_state,
    routing::{delete, get, post},
    Router,
};

use crate::api::AppState;
use crate::auth::require_auth;

pub use error::{ClassError, ClassResult};
pub use service::{ClassDetails, ClassService, ClassSummary};

/// Create classes router. Every route requires authentication.
pub fn router(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/my-classes", get(handlers::my_classes))
        .route("/create", post(handlers::create_class))
        .route("/join/{class_id}", post(handlers::join_class))
        .route("/{class_id}", get(handlers::get_class))
        .route("/{class_id}/leave", delete(handlers::leave_class))
        .route("/{class_id}/remove-user", delete(handlers::remove_user))
        .layer(from_fn_with_state(state, require_auth))
}
