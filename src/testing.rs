//! Shared fixtures for router tests.

use std::{net::SocketAddr, sync::Arc};

use axum::{
    body::{Body, Bytes},
    extract::connect_info::MockConnectInfo,
    http::{HeaderMap, Method, Request, StatusCode},
    Router,
};
use tower::ServiceExt;

use crate::config::AppConfig;
use crate::session::{create_access_token, ADMIN_ROLE};
use crate::state::AppState;
use crate::store::MemoryStore;

pub const ADMIN_EMAIL: &str = "admin@finance90.test";
pub const ADMIN_PASSWORD: &str = "correct-horse-battery";

pub fn test_config() -> AppConfig {
    AppConfig {
        jwt_secret: "test-jwt-secret".to_string(),
        ..Default::default()
    }
}

/// Memory-backed state with default categories and one admin (low bcrypt cost).
pub fn test_state() -> AppState {
    let hash = bcrypt::hash(ADMIN_PASSWORD, 4).unwrap();
    AppState::new(
        Arc::new(MemoryStore::seeded(Some((ADMIN_EMAIL, &hash)))),
        test_config(),
    )
}

pub fn token_with_role(state: &AppState, role: &str) -> String {
    create_access_token(&state.config().jwt_secret, "test-admin", ADMIN_EMAIL, role).unwrap()
}

pub fn admin_bearer(state: &AppState) -> String {
    format!("Bearer {}", token_with_role(state, ADMIN_ROLE))
}

pub fn with_client_addr(router: Router) -> Router {
    router.layer(MockConnectInfo(SocketAddr::from(([127, 0, 0, 1], 12345))))
}

pub fn json_request(
    method: Method,
    uri: &str,
    auth: Option<&str>,
    json: &impl serde::Serialize,
) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json");
    if let Some(auth) = auth {
        builder = builder.header("authorization", auth);
    }
    builder
        .body(Body::from(serde_json::to_vec(json).unwrap()))
        .unwrap()
}

pub fn empty_request(method: Method, uri: &str, auth: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(auth) = auth {
        builder = builder.header("authorization", auth);
    }
    builder.body(Body::empty()).unwrap()
}

pub async fn send(app: Router, req: Request<Body>) -> (StatusCode, HeaderMap, Bytes) {
    let res = app.oneshot(req).await.unwrap();
    let status = res.status();
    let headers = res.headers().clone();
    let bytes = axum::body::to_bytes(res.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, headers, bytes)
}

pub async fn send_json<T: serde::de::DeserializeOwned>(
    app: Router,
    req: Request<Body>,
) -> (StatusCode, T) {
    let (status, _, bytes) = send(app, req).await;
    (status, serde_json::from_slice(&bytes).unwrap())
}
