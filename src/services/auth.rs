//! Authentication service
//!
//! Owns the account and session invariants:
//! - registration with unique email
//! - login issuing an opaque bearer token backed by a session row
//! - token validation resolving to the owning user
//! - logout and expired-session cleanup
//!
//! Unknown email and wrong password fail identically, as do unknown and
//! expired tokens.

use crate::db::repositories::{is_unique_violation, SessionRepository, UserRepository};
use crate::models::{Session, User, UserRole};
use crate::services::password::{hash_password_blocking, verify_password_blocking};
use argon2::password_hash::rand_core::{OsRng, RngCore};
use chrono::{Duration, Utc};
use data_encoding::HEXLOWER;
use serde::Deserialize;
use std::sync::Arc;

/// Session lifetime in hours
pub const SESSION_TTL_HOURS: i64 = 24;

/// Random bytes per session token (hex-encoded to twice as many chars)
pub const TOKEN_BYTES: usize = 32;

/// Minimum accepted password length
pub const MIN_PASSWORD_LEN: usize = 6;

/// Well-formed Argon2id hash that no password matches. Unknown-email logins
/// verify against it in place of a stored hash.
const DUMMY_PASSWORD_HASH: &str =
    "$argon2id$v=19$m=19456,t=2,p=1$YXV0aGdhdGUtZHVtbXkhIQ$AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA";

/// Error types for authentication and user management
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// Unknown email or wrong password
    #[error("Invalid credentials")]
    InvalidCredentials,

    /// No active session for the token
    #[error("Invalid or expired token")]
    InvalidToken,

    /// User record missing
    #[error("User not found")]
    UserNotFound,

    /// Email already registered
    #[error("User already exists")]
    AlreadyExists,

    /// Rejected input
    #[error("Validation error: {0}")]
    Validation(String),

    /// Hasher or entropy source failure
    #[error("Credential hashing failed: {0}")]
    Hashing(anyhow::Error),

    /// Persistence failure
    #[error("Storage error: {0}")]
    Storage(#[from] anyhow::Error),
}

/// Input for user registration
#[derive(Debug, Clone, Deserialize)]
pub struct RegisterInput {
    pub email: String,
    pub password: String,
    pub name: String,
}

/// Input for user login
#[derive(Debug, Clone, Deserialize)]
pub struct LoginInput {
    pub email: String,
    pub password: String,
}

/// Check account fields before anything is hashed or stored
pub fn validate_account_input(email: &str, password: &str, name: &str) -> Result<(), AuthError> {
    validate_email(email)?;
    validate_password(password)?;
    validate_name(name)
}

pub(crate) fn validate_email(email: &str) -> Result<(), AuthError> {
    if email.trim().is_empty() {
        return Err(AuthError::Validation("Email is required".to_string()));
    }
    if !email.contains('@') {
        return Err(AuthError::Validation("Email is invalid".to_string()));
    }
    Ok(())
}

pub(crate) fn validate_password(password: &str) -> Result<(), AuthError> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AuthError::Validation(format!(
            "Password must be at least {} characters",
            MIN_PASSWORD_LEN
        )));
    }
    Ok(())
}

pub(crate) fn validate_name(name: &str) -> Result<(), AuthError> {
    if name.trim().is_empty() {
        return Err(AuthError::Validation("Name is required".to_string()));
    }
    Ok(())
}

/// Generate a session token: 256 bits from the OS CSPRNG, lowercase hex
pub fn generate_token() -> Result<String, AuthError> {
    let mut bytes = [0u8; TOKEN_BYTES];
    OsRng
        .try_fill_bytes(&mut bytes)
        .map_err(|e| AuthError::Hashing(anyhow::anyhow!("OS random source failed: {}", e)))?;
    Ok(HEXLOWER.encode(&bytes))
}

/// Validate, hash and insert a new account with the given role.
///
/// Shared by self-registration and admin-created accounts.
pub(crate) async fn create_account(
    user_repo: &dyn UserRepository,
    email: String,
    password: String,
    name: String,
    role: UserRole,
) -> Result<User, AuthError> {
    validate_account_input(&email, &password, &name)?;

    if user_repo.find_by_email(&email).await?.is_some() {
        return Err(AuthError::AlreadyExists);
    }

    let password_hash = hash_password_blocking(password)
        .await
        .map_err(AuthError::Hashing)?;

    let user = User::new(email, password_hash, name, role);
    match user_repo.create(&user).await {
        Ok(created) => Ok(created),
        // Lost a race with a concurrent registration of the same email
        Err(e) if is_unique_violation(&e) => Err(AuthError::AlreadyExists),
        Err(e) => Err(AuthError::Storage(e)),
    }
}

/// Authentication service
pub struct AuthService {
    user_repo: Arc<dyn UserRepository>,
    session_repo: Arc<dyn SessionRepository>,
    session_ttl: Duration,
}

impl AuthService {
    /// Create a new auth service with the default 24h session lifetime
    pub fn new(
        user_repo: Arc<dyn UserRepository>,
        session_repo: Arc<dyn SessionRepository>,
    ) -> Self {
        Self::with_session_ttl(user_repo, session_repo, Duration::hours(SESSION_TTL_HOURS))
    }

    /// Create a new auth service with a custom session lifetime
    pub fn with_session_ttl(
        user_repo: Arc<dyn UserRepository>,
        session_repo: Arc<dyn SessionRepository>,
        session_ttl: Duration,
    ) -> Self {
        Self {
            user_repo,
            session_repo,
            session_ttl,
        }
    }

    /// Register a new account with role `user`.
    ///
    /// # Errors
    ///
    /// - `Validation` for malformed input
    /// - `AlreadyExists` if the email is taken
    /// - `Hashing` / `Storage` for internal failures
    pub async fn register(&self, input: RegisterInput) -> Result<User, AuthError> {
        let user = create_account(
            self.user_repo.as_ref(),
            input.email,
            input.password,
            input.name,
            UserRole::User,
        )
        .await?;

        tracing::info!(user_id = %user.id, "User registered");
        Ok(user)
    }

    /// Verify credentials and open a new session.
    ///
    /// Returns the bearer token and the user. Every user may hold any
    /// number of concurrent sessions.
    pub async fn login(&self, input: LoginInput) -> Result<(String, User), AuthError> {
        let user = match self.user_repo.find_by_email(&input.email).await? {
            Some(user) => user,
            None => {
                let _ = verify_password_blocking(input.password, DUMMY_PASSWORD_HASH.to_string())
                    .await;
                tracing::debug!("Login rejected: unknown email");
                return Err(AuthError::InvalidCredentials);
            }
        };

        let valid = verify_password_blocking(input.password, user.password_hash.clone())
            .await
            .map_err(AuthError::Hashing)?;
        if !valid {
            tracing::debug!(user_id = %user.id, "Login rejected: wrong password");
            return Err(AuthError::InvalidCredentials);
        }

        let token = generate_token()?;
        let session = Session::new(user.id, token.clone(), self.session_ttl);
        self.session_repo.create(&session).await?;

        tracing::info!(user_id = %user.id, session_id = %session.id, "User logged in");
        Ok((token, user))
    }

    /// Resolve a bearer token to its user.
    ///
    /// Read-only: neither extends nor deletes the session.
    pub async fn validate_token(&self, token: &str) -> Result<User, AuthError> {
        let session = self
            .session_repo
            .find_active_by_token(token, Utc::now())
            .await?
            .ok_or(AuthError::InvalidToken)?;

        self.user_repo
            .find_by_id(session.user_id)
            .await?
            .ok_or(AuthError::UserNotFound)
    }

    /// Delete the session for `token`. Unknown tokens are fine.
    pub async fn logout(&self, token: &str) -> Result<(), AuthError> {
        let removed = self.session_repo.delete_by_token(token).await?;
        tracing::debug!(removed, "Logout");
        Ok(())
    }

    /// Delete all expired sessions, returning how many were removed
    pub async fn cleanup_expired_sessions(&self) -> Result<u64, AuthError> {
        Ok(self.session_repo.delete_expired(Utc::now()).await?)
    }
}
