//! API middleware
//!
//! Contains:
//! - `AppState` shared by all handlers
//! - `ApiError`, the JSON error body returned by every endpoint
//! - `require_auth`, the bearer-token gate
//! - `require_admin`, the role check layered behind it
//! - `AuthenticatedUser`, the typed principal the gate attaches to requests

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts, HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::db::repositories::{SqlxSessionRepository, SqlxUserRepository};
use crate::db::DynDatabasePool;
use crate::models::{User, UserRole};
use crate::services::{AuthError, AuthService, UserService};

/// Application state containing shared services
#[derive(Clone)]
pub struct AppState {
    pub pool: DynDatabasePool,
    pub auth_service: Arc<AuthService>,
    pub user_service: Arc<UserService>,
}

impl AppState {
    /// Wire repositories and services over a single pool
    pub fn new(pool: DynDatabasePool) -> Self {
        let user_repo = SqlxUserRepository::boxed(pool.clone());
        let session_repo = SqlxSessionRepository::boxed(pool.clone());

        Self {
            auth_service: Arc::new(AuthService::new(user_repo.clone(), session_repo)),
            user_service: Arc::new(UserService::new(user_repo)),
            pool,
        }
    }
}

/// Authenticated user extracted from request
#[derive(Debug, Clone)]
pub struct AuthenticatedUser(pub User);

impl AuthenticatedUser {
    /// Reject with `FORBIDDEN` unless the principal holds `role`
    pub fn require_role(&self, role: UserRole) -> Result<(), ApiError> {
        if self.0.has_role(role) {
            Ok(())
        } else {
            Err(ApiError::forbidden(format!("{} role required", role)))
        }
    }
}

impl<S> FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthenticatedUser>()
            .cloned()
            .ok_or_else(|| ApiError::unauthorized("Authentication required"))
    }
}

/// Error response for API errors
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiError {
    pub error: ApiErrorDetail,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiErrorDetail {
    pub code: String,
    pub message: String,
}

impl ApiError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: ApiErrorDetail {
                code: code.into(),
                message: message.into(),
            },
        }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new("UNAUTHORIZED", message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new("FORBIDDEN", message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new("NOT_FOUND", message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new("CONFLICT", message)
    }

    pub fn validation_error(message: impl Into<String>) -> Self {
        Self::new("VALIDATION_ERROR", message)
    }

    pub fn internal_error(message: impl Into<String>) -> Self {
        Self::new("INTERNAL_ERROR", message)
    }

    /// HTTP status for this error's code
    pub fn status(&self) -> StatusCode {
        match self.error.code.as_str() {
            "VALIDATION_ERROR" => StatusCode::BAD_REQUEST,
            "UNAUTHORIZED" => StatusCode::UNAUTHORIZED,
            "FORBIDDEN" => StatusCode::FORBIDDEN,
            "NOT_FOUND" => StatusCode::NOT_FOUND,
            "CONFLICT" => StatusCode::CONFLICT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status(), Json(self)).into_response()
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::InvalidCredentials => ApiError::unauthorized("Invalid credentials"),
            AuthError::InvalidToken => ApiError::unauthorized("Invalid or expired token"),
            AuthError::UserNotFound => ApiError::not_found("User not found"),
            AuthError::AlreadyExists => ApiError::conflict("User already exists"),
            AuthError::Validation(msg) => ApiError::validation_error(msg),
            AuthError::Hashing(e) => {
                tracing::error!("Credential hashing failed: {:#}", e);
                ApiError::internal_error("Internal server error")
            }
            AuthError::Storage(e) => {
                tracing::error!("Storage failure: {:#}", e);
                ApiError::internal_error("Internal server error")
            }
        }
    }
}

/// Parse an `Authorization` value of the exact form `Bearer <token>`.
///
/// One space, scheme spelled exactly `Bearer`, non-empty token with no
/// further spaces.
pub fn parse_bearer(value: &str) -> Option<&str> {
    let mut parts = value.split(' ');
    match (parts.next(), parts.next(), parts.next()) {
        (Some("Bearer"), Some(token), None) if !token.is_empty() => Some(token),
        _ => None,
    }
}

/// Extract the bearer token from request headers
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(parse_bearer)
}

/// Authentication middleware.
///
/// Every failure, including an unreachable store, is answered with 401.
pub async fn require_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = bearer_token(request.headers())
        .map(str::to_owned)
        .ok_or_else(|| ApiError::unauthorized("Missing or malformed authorization header"))?;

    let user = match state.auth_service.validate_token(&token).await {
        Ok(user) => user,
        Err(AuthError::Storage(e)) => {
            tracing::warn!("Token validation failed on storage: {:#}", e);
            return Err(ApiError::unauthorized("Invalid or expired token"));
        }
        Err(e) => {
            tracing::debug!("Token rejected: {}", e);
            return Err(ApiError::unauthorized("Invalid or expired token"));
        }
    };

    request.extensions_mut().insert(AuthenticatedUser(user));
    Ok(next.run(request).await)
}

/// Admin authorization middleware. Must run behind `require_auth`.
pub async fn require_admin(request: Request, next: Next) -> Result<Response, ApiError> {
    let user = request
        .extensions()
        .get::<AuthenticatedUser>()
        .ok_or_else(|| ApiError::unauthorized("Authentication required"))?;

    user.require_role(UserRole::Admin)?;

    Ok(next.run(request).await)
}


#[cfg(test)]
mod property_tests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(20))]

        #[test]
        fn well_formed_header_yields_token(token in "[A-Za-z0-9._~+/=-]{1,80}") {
            let header = format!("Bearer {}", token);
            prop_assert_eq!(parse_bearer(&header), Some(token.as_str()));
        }

        #[test]
        fn other_schemes_rejected(scheme in "[A-Za-z]{1,10}", token in "[a-f0-9]{1,64}") {
            prop_assume!(scheme != "Bearer");
            let header = format!("{} {}", scheme, token);
            prop_assert_eq!(parse_bearer(&header), None);
        }

        #[test]
        fn tokens_with_spaces_rejected(a in "[a-f0-9]{1,16}", b in "[a-f0-9]{1,16}") {
            let header = format!("Bearer {} {}", a, b);
            prop_assert_eq!(parse_bearer(&header), None);
        }
    }
}
