//! User API endpoints
//!
//! Authenticated:
//! - GET /api/users/me - The caller
//! - GET /api/users/{id} - Any user by id
//!
//! Admin only:
//! - GET /api/users - List all users
//! - POST /api/users - Create a user with an explicit role
//! - PUT /api/users/{id} - Update a user
//! - DELETE /api/users/{id} - Delete a user

use axum::{
    extract::{Path, State},
    http::StatusCode,
    middleware as axum_middleware,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use uuid::Uuid;

use crate::api::middleware::{self, ApiError, AppState, AuthenticatedUser};
use crate::models::User;
use crate::services::{CreateUserInput, UpdateUserInput};

/// Build the users router with both gates attached
pub fn router(state: AppState) -> Router<AppState> {
    let admin_routes = Router::new()
        .route("/", get(list_users).post(create_user))
        .route("/{id}", axum::routing::put(update_user).delete(delete_user))
        .route_layer(axum_middleware::from_fn(middleware::require_admin));

    Router::new()
        .route("/me", get(current_user))
        .route("/{id}", get(get_user))
        .merge(admin_routes)
        .route_layer(axum_middleware::from_fn_with_state(
            state,
            middleware::require_auth,
        ))
}

fn parse_user_id(raw: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw).map_err(|_| ApiError::validation_error("Invalid user ID"))
}

/// GET /api/users/me
async fn current_user(AuthenticatedUser(user): AuthenticatedUser) -> Json<User> {
    Json(user)
}

/// GET /api/users/{id}
async fn get_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<User>, ApiError> {
    let id = parse_user_id(&id)?;
    let user = state.user_service.get_by_id(id).await?;
    Ok(Json(user))
}

/// GET /api/users
async fn list_users(State(state): State<AppState>) -> Result<Json<Vec<User>>, ApiError> {
    Ok(Json(state.user_service.list_all().await?))
}

/// POST /api/users
async fn create_user(
    State(state): State<AppState>,
    AuthenticatedUser(admin): AuthenticatedUser,
    Json(body): Json<CreateUserInput>,
) -> Result<impl IntoResponse, ApiError> {
    let user = state.user_service.create_user(body).await?;
    tracing::debug!(admin_id = %admin.id, user_id = %user.id, "Admin created user");

    Ok((StatusCode::CREATED, Json(user)))
}

/// PUT /api/users/{id}
async fn update_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<UpdateUserInput>,
) -> Result<Json<User>, ApiError> {
    let id = parse_user_id(&id)?;
    Ok(Json(state.user_service.update_user(id, body).await?))
}

/// DELETE /api/users/{id}
///
/// The deleted user's sessions are left behind and fail validation.
async fn delete_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let id = parse_user_id(&id)?;
    state.user_service.delete_user(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::test_util::{admin_token, login_token, register, send, send_json, setup_app};
    use axum::http::Method;
    use serde_json::json;

    #[tokio::test]
    async fn test_me_requires_auth() {
        let (app, _) = setup_app().await;

        let (status, body) = send(&app, Method::GET, "/api/users/me", None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"]["code"], "UNAUTHORIZED");

        let (status, _) = send(&app, Method::GET, "/api/users/me", Some("wrongtoken")).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_get_user_by_id() {
        let (app, _) = setup_app().await;
        let created = register(&app, "a@x.com", "secret1").await;
        let token = login_token(&app, "a@x.com", "secret1").await;
        let id = created["id"].as_str().unwrap();

        let (status, body) = send(&app, Method::GET, &format!("/api/users/{}", id), Some(&token)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["email"], "a@x.com");

        let missing = format!("/api/users/{}", Uuid::new_v4());
        let (status, body) = send(&app, Method::GET, &missing, Some(&token)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"]["code"], "NOT_FOUND");

        let (status, body) = send(&app, Method::GET, "/api/users/not-a-uuid", Some(&token)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn test_admin_routes_forbidden_for_users() {
        let (app, _) = setup_app().await;
        let created = register(&app, "a@x.com", "secret1").await;
        let token = login_token(&app, "a@x.com", "secret1").await;
        let own = format!("/api/users/{}", created["id"].as_str().unwrap());

        let (status, body) = send(&app, Method::GET, "/api/users", Some(&token)).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["error"]["code"], "FORBIDDEN");

        let (status, _) = send_json(
            &app,
            Method::POST,
            "/api/users",
            Some(&token),
            json!({"email": "b@x.com", "password": "secret1", "name": "B", "role": "admin"}),
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, _) = send(&app, Method::DELETE, &own, Some(&token)).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_admin_routes_require_auth_first() {
        let (app, _) = setup_app().await;

        let (status, _) = send(&app, Method::GET, "/api/users", None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_admin_create_list_update_delete() {
        let (app, state) = setup_app().await;
        let admin = admin_token(&app, &state).await;

        let (status, created) = send_json(
            &app,
            Method::POST,
            "/api/users",
            Some(&admin),
            json!({"email": "ed@x.com", "password": "secret1", "name": "Ed", "role": "admin"}),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(created["role"], "admin");
        let path = format!("/api/users/{}", created["id"].as_str().unwrap());

        let (status, duplicate) = send_json(
            &app,
            Method::POST,
            "/api/users",
            Some(&admin),
            json!({"email": "ed@x.com", "password": "secret1", "name": "Ed2"}),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(duplicate["error"]["code"], "CONFLICT");

        let (status, list) = send(&app, Method::GET, "/api/users", Some(&admin)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(list.as_array().map(Vec::len), Some(2));

        let (status, updated) = send_json(
            &app,
            Method::PUT,
            &path,
            Some(&admin),
            json!({"name": "Edward", "role": "user"}),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(updated["name"], "Edward");
        assert_eq!(updated["role"], "user");

        let (status, _) = send(&app, Method::DELETE, &path, Some(&admin)).await;
        assert_eq!(status, StatusCode::NO_CONTENT);

        let (status, _) = send(&app, Method::DELETE, &path, Some(&admin)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_deleted_user_token_is_rejected() {
        let (app, state) = setup_app().await;
        let admin = admin_token(&app, &state).await;
        let created = register(&app, "a@x.com", "secret1").await;
        let token = login_token(&app, "a@x.com", "secret1").await;

        let path = format!("/api/users/{}", created["id"].as_str().unwrap());
        let (status, _) = send(&app, Method::DELETE, &path, Some(&admin)).await;
        assert_eq!(status, StatusCode::NO_CONTENT);

        let (status, _) = send(&app, Method::GET, "/api/users/me", Some(&token)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }
}
