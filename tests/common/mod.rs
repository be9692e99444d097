//! Shared helpers for router-level integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use axum::response::Response;
use axum::Router;
use serde_json::Value;
use tower::ServiceExt;

use prompt_wheel::config::AppConfig;
use prompt_wheel::local_store::LocalStorage;
use prompt_wheel::routes::build_router;
use prompt_wheel::state::AppState;

/// Local backend, no remote store, near-instant spins.
pub fn test_config() -> AppConfig {
    let mut cfg = AppConfig { local_state_path: None, ..AppConfig::default() };
    cfg.remote.url = None;
    cfg.remote.api_key = None;
    cfg.wheel.spin_duration_ms = 5;
    cfg
}

pub async fn build_test_state(cfg: AppConfig, storage: LocalStorage) -> Arc<AppState> {
    Arc::new(AppState::with_storage(cfg, storage).await)
}

pub fn build_test_app(state: Arc<AppState>) -> Router {
    build_router(state)
}

pub async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> Response {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(json) => builder
            .header("content-type", "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    app.clone().oneshot(request).await.unwrap()
}

pub async fn get(app: &Router, uri: &str) -> Response {
    send(app, Method::GET, uri, None).await
}

pub async fn post_json(app: &Router, uri: &str, body: Value) -> Response {
    send(app, Method::POST, uri, Some(body)).await
}

pub async fn body_json(response: Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

/// Log in with the default password.
pub async fn login(app: &Router) {
    let response = post_json(app, "/api/v1/login", serde_json::json!({ "password": "6677" })).await;
    assert_eq!(response.status(), StatusCode::OK);
}
