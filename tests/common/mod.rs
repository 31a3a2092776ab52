//! Shared fixtures for the integration tests.
//!
//! Every test gets its own in-memory SQLite database, so tests never observe
//! each other's rows.

#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    body::Body,
    http::{header, HeaderMap, Method, Request, StatusCode},
    Router,
};
use serde_json::Value;
use tower::ServiceExt;

use task_manager_api::{
    config::Config, db, model::User, route::create_router, AppState,
};

pub const PASSWORD: &str = "pw123";

pub fn test_config() -> Config {
    Config {
        database_url: "sqlite::memory:".to_string(),
        database_max_connections: 1,
        jwt_secret: "integration-test-secret".to_string(),
        allowed_origins: vec!["http://localhost:5173".to_string()],
        production: false,
        host: "127.0.0.1".to_string(),
        port: 0,
        // Lowest cost bcrypt accepts keeps the suite fast
        bcrypt_cost: 4,
    }
}

pub async fn create_test_app_state() -> Arc<AppState> {
    let config = test_config();
    let pool = db::connect(&config).await.expect("in-memory database");
    db::init_schema(&pool).await.expect("schema");
    Arc::new(AppState::new(config, pool))
}

pub async fn create_test_app() -> (Arc<AppState>, Router) {
    let state = create_test_app_state().await;
    let app = create_router(state.clone());
    (state, app)
}

/// Registers `<name>` with `<name>@gmail.com` and the shared password.
pub async fn register_user(state: &AppState, name: &str) -> User {
    state
        .auth
        .register(name, &format!("{name}@gmail.com"), PASSWORD)
        .await
        .expect("registration succeeds")
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
}

pub async fn send(
    app: &Router,
    method: Method,
    uri: &str,
    cookie: Option<&str>,
    body: Option<Value>,
) -> TestResponse {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    let request = match body {
        Some(json) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json.to_string())),
        None => builder.body(Body::empty()),
    }
    .expect("valid request");

    let response = app.clone().oneshot(request).await.expect("infallible router");
    let status = response.status();
    let headers = response.headers().clone();
    let bytes = hyper::body::to_bytes(response.into_body())
        .await
        .expect("readable body");
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).expect("JSON body")
    };

    TestResponse {
        status,
        headers,
        body,
    }
}

/// The `name=value` pair of the `token` cookie set by a response.
pub fn token_cookie(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .find(|value| value.starts_with("token="))
        .and_then(|value| value.split(';').next())
        .map(str::to_string)
}
