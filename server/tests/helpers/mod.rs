//! Reusable test helpers for HTTP integration tests.
//!
//! Provides `TestApp` for building and sending requests through the full axum
//! router on the in-memory store, plus a fake identity provider and helpers for
//! registering accounts and reading JSON bodies.
#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{self, header, Method, Request, Response, StatusCode};
use axum::Router;
use classroom_server::api::{create_router, AppState};
use classroom_server::auth::{IdentityError, IdentityVerifier, VerifiedIdentity};
use classroom_server::config::Config;
use classroom_server::db::InMemoryStore;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

// ============================================================================
// Fake identity provider
// ============================================================================

/// Identity provider that accepts a fixed set of ID tokens.
#[derive(Default)]
pub struct FakeGoogle {
    identities: HashMap<String, VerifiedIdentity>,
}

impl FakeGoogle {
    /// Accept `id_token` as proof of `(subject, email)`.
    pub fn accept(mut self, id_token: &str, subject: &str, email: &str) -> Self {
        self.identities.insert(
            id_token.to_string(),
            VerifiedIdentity {
                subject: subject.to_string(),
                email: Some(email.to_string()),
                email_verified: Some(true),
                given_name: Some("Grace".to_string()),
                family_name: Some("Hopper".to_string()),
            },
        );
        self
    }
}

#[async_trait]
impl IdentityVerifier for FakeGoogle {
    fn provider(&self) -> &str {
        "Google"
    }

    async fn verify(&self, assertion: &str) -> Result<VerifiedIdentity, IdentityError> {
        self.identities
            .get(assertion)
            .cloned()
            .ok_or_else(|| IdentityError::Rejected("signature mismatch".into()))
    }
}

// ============================================================================
// Test App
// ============================================================================

/// A test application wrapping the full axum router.
pub struct TestApp {
    pub router: Router,
    pub store: Arc<InMemoryStore>,
    pub config: Config,
}

impl TestApp {
    /// Create a test app without federated login.
    pub fn new() -> Self {
        Self::build(None)
    }

    /// Create a test app that trusts the given fake provider.
    pub fn with_google(google: FakeGoogle) -> Self {
        Self::build(Some(Arc::new(google)))
    }

    fn build(verifier: Option<Arc<dyn IdentityVerifier>>) -> Self {
        let config = Config::default_for_test();
        let store = Arc::new(InMemoryStore::new());
        let state = AppState::new(config.clone(), store.clone(), verifier);

        Self {
            router: create_router(state),
            store,
            config,
        }
    }

    /// Build an HTTP request with the given method and URI.
    pub fn request(method: Method, uri: &str) -> http::request::Builder {
        Request::builder().method(method).uri(uri)
    }

    /// Send a request through the router via `tower::ServiceExt::oneshot`.
    pub async fn oneshot(&self, request: Request<Body>) -> Response<Body> {
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("oneshot request failed")
    }

    /// Send a JSON request, optionally with a bearer token.
    pub async fn send(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Self::request(method, uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string())),
            None => builder.body(Body::empty()),
        }
        .expect("Failed to build request");

        let response = self.oneshot(request).await;
        let status = response.status();
        (status, body_to_json(response).await)
    }

    /// Register an account and log in. Returns the session token.
    pub async fn register_and_login(&self, email: &str, password: &str) -> String {
        let (status, _) = self
            .send(
                Method::POST,
                "/auth/register",
                None,
                Some(json!({
                    "email": email,
                    "password": password,
                    "confirmPassword": password,
                    "firstName": "Test",
                    "lastName": "User",
                })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "registration of {email} failed");

        self.login(email, password).await
    }

    /// Log in and return the session token.
    pub async fn login(&self, email: &str, password: &str) -> String {
        let (status, body) = self
            .send(
                Method::POST,
                "/auth/login",
                None,
                Some(json!({ "email": email, "password": password })),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "login of {email} failed: {body}");
        body["authToken"]
            .as_str()
            .expect("authToken missing")
            .to_string()
    }

    /// Register an account, pick its role, and return a token carrying that role.
    pub async fn account_with_role(&self, email: &str, is_educator: bool) -> String {
        let token = self.register_and_login(email, "password123").await;
        let (status, body) = self
            .send(
                Method::POST,
                "/users/me/role",
                Some(&token),
                Some(json!({ "isEducator": is_educator })),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "role selection failed: {body}");
        body["authToken"]
            .as_str()
            .expect("authToken missing")
            .to_string()
    }
}

/// Collect a response body and parse it as JSON.
///
/// Plain-text bodies (extractor rejections) come back as a JSON string.
pub async fn body_to_json(response: Response<Body>) -> Value {
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("Failed to collect response body")
        .to_bytes();
    if bytes.is_empty() {
        return Value::Null;
    }
    serde_json::from_slice(&bytes)
        .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
}
