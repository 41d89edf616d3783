//! Helpers for driving the full router in tests

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;

use crate::api::{build_router, AppState};
use crate::db::{create_test_pool, migrations};

/// Fresh router over a migrated in-memory database
pub async fn setup_app() -> (Router, AppState) {
    let pool = create_test_pool().await.expect("Failed to create test pool");
    migrations::run_migrations(&pool)
        .await
        .expect("Failed to run migrations");

    let state = AppState::new(pool);
    let app = build_router(state.clone(), "http://localhost:3000").expect("Failed to build router");
    (app, state)
}

async fn dispatch(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.expect("Request failed");
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("Failed to read body");

    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, body)
}

fn builder(method: Method, uri: &str, token: Option<&str>) -> axum::http::request::Builder {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    builder
}

/// Send a request with a JSON body
pub async fn send_json(
    app: &Router,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Value,
) -> (StatusCode, Value) {
    let request = builder(method, uri, token)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .expect("Failed to build request");
    dispatch(app, request).await
}

/// Send a request without a body
pub async fn send(
    app: &Router,
    method: Method,
    uri: &str,
    token: Option<&str>,
) -> (StatusCode, Value) {
    let request = builder(method, uri, token)
        .body(Body::empty())
        .expect("Failed to build request");
    dispatch(app, request).await
}

/// Register through the API and return the created user
pub async fn register(app: &Router, email: &str, password: &str) -> Value {
    let (status, body) = send_json(
        app,
        Method::POST,
        "/api/auth/register",
        None,
        json!({"email": email, "password": password, "name": "Tester"}),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "register failed: {}", body);
    body
}

/// Log in through the API and return the bearer token
pub async fn login_token(app: &Router, email: &str, password: &str) -> String {
    let (status, body) = send_json(
        app,
        Method::POST,
        "/api/auth/login",
        None,
        json!({"email": email, "password": password}),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "login failed: {}", body);
    body["token"]
        .as_str()
        .expect("Login response has no token")
        .to_string()
}

/// Bootstrap an admin account and return its bearer token
pub async fn admin_token(app: &Router, state: &AppState) -> String {
    state
        .user_service
        .ensure_admin("admin@x.com", "adminpass", "Admin")
        .await
        .expect("Failed to create admin");
    login_token(app, "admin@x.com", "adminpass").await
}
