//! Authentication API endpoints
//!
//! - POST /api/auth/register - Create an account (role `user`)
//! - POST /api/auth/login - Exchange credentials for a bearer token
//! - POST /api/auth/logout - Drop the session behind a bearer token

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::post,
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::api::middleware::{bearer_token, ApiError, AppState};
use crate::models::User;
use crate::services::{LoginInput, RegisterInput};

/// Response for successful login
#[derive(Debug, Serialize, Deserialize)]
pub struct LoginResponse {
    pub token: String,
    pub user: User,
}

/// Plain message response
#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

/// Build the auth router. None of these routes sit behind the gate.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/logout", post(logout))
}

/// POST /api/auth/register
async fn register(
    State(state): State<AppState>,
    Json(body): Json<RegisterInput>,
) -> Result<impl IntoResponse, ApiError> {
    let user = state.auth_service.register(body).await?;

    Ok((StatusCode::CREATED, Json(user)))
}

/// POST /api/auth/login
async fn login(
    State(state): State<AppState>,
    Json(body): Json<LoginInput>,
) -> Result<Json<LoginResponse>, ApiError> {
    let (token, user) = state.auth_service.login(body).await?;

    Ok(Json(LoginResponse { token, user }))
}

/// POST /api/auth/logout
///
/// Needs a well-formed bearer header but not a live session: logging out
/// twice, or with an expired token, still succeeds.
async fn logout(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<MessageResponse>, ApiError> {
    let token = bearer_token(&headers)
        .ok_or_else(|| ApiError::unauthorized("Missing or malformed authorization header"))?;

    state.auth_service.logout(token).await?;

    Ok(Json(MessageResponse {
        message: "Logged out successfully".to_string(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::test_util::{login_token, register, send, send_json, setup_app};
    use axum::body::Body;
    use axum::http::{Method, Request};
    use serde_json::json;
    use tower::ServiceExt;

    #[tokio::test]
    async fn test_register_returns_created_without_password() {
        let (app, _) = setup_app().await;

        let (status, body) = send_json(
            &app,
            Method::POST,
            "/api/auth/register",
            None,
            json!({"email": "a@x.com", "password": "secret1", "name": "A"}),
        )
        .await;

        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["email"], "a@x.com");
        assert_eq!(body["role"], "user");
        assert!(body.get("password_hash").is_none());
        assert!(body.get("password").is_none());
        assert!(!body.to_string().contains("secret1"));
    }

    #[tokio::test]
    async fn test_register_duplicate_conflict() {
        let (app, _) = setup_app().await;
        register(&app, "a@x.com", "secret1").await;

        let (status, body) = send_json(
            &app,
            Method::POST,
            "/api/auth/register",
            None,
            json!({"email": "a@x.com", "password": "other-pass", "name": "B"}),
        )
        .await;

        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["error"]["code"], "CONFLICT");
    }

    #[tokio::test]
    async fn test_register_validation_error() {
        let (app, _) = setup_app().await;

        let (status, body) = send_json(
            &app,
            Method::POST,
            "/api/auth/register",
            None,
            json!({"email": "a@x.com", "password": "123", "name": "A"}),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn test_login_returns_token_and_user() {
        let (app, _) = setup_app().await;
        register(&app, "a@x.com", "secret1").await;

        let (status, body) = send_json(
            &app,
            Method::POST,
            "/api/auth/login",
            None,
            json!({"email": "a@x.com", "password": "secret1"}),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["token"].as_str().map(str::len), Some(64));
        assert_eq!(body["user"]["email"], "a@x.com");
        assert!(body["user"].get("password_hash").is_none());
    }

    #[tokio::test]
    async fn test_login_failures_share_one_response() {
        let (app, _) = setup_app().await;
        register(&app, "a@x.com", "secret1").await;

        let (wrong_status, wrong_body) = send_json(
            &app,
            Method::POST,
            "/api/auth/login",
            None,
            json!({"email": "a@x.com", "password": "nope-nope"}),
        )
        .await;
        let (unknown_status, unknown_body) = send_json(
            &app,
            Method::POST,
            "/api/auth/login",
            None,
            json!({"email": "ghost@x.com", "password": "secret1"}),
        )
        .await;

        assert_eq!(wrong_status, StatusCode::UNAUTHORIZED);
        assert_eq!(unknown_status, StatusCode::UNAUTHORIZED);
        assert_eq!(wrong_body, unknown_body);
        assert_eq!(wrong_body["error"]["message"], "Invalid credentials");
    }

    #[tokio::test]
    async fn test_logout_invalidates_token() {
        let (app, _) = setup_app().await;
        register(&app, "a@x.com", "secret1").await;
        let token = login_token(&app, "a@x.com", "secret1").await;

        let (status, body) = send(&app, Method::POST, "/api/auth/logout", Some(&token)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "Logged out successfully");

        let (status, _) = send(&app, Method::GET, "/api/users/me", Some(&token)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        // Second logout with the same token still succeeds
        let (status, _) = send(&app, Method::POST, "/api/auth/logout", Some(&token)).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_logout_requires_bearer_header() {
        let (app, _) = setup_app().await;

        let (status, _) = send(&app, Method::POST, "/api/auth/logout", None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let request = Request::builder()
            .method(Method::POST)
            .uri("/api/auth/logout")
            .header("authorization", "Token abc")
            .body(Body::empty())
            .unwrap();
        let response = app.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}
