//! User management service
//!
//! Administrative operations on accounts: create with an explicit role,
//! lookup, listing, update, deletion and the startup admin bootstrap.
//! Deleting a user leaves its sessions in place; they stop resolving at
//! validation time.

use crate::db::repositories::{is_unique_violation, UserRepository};
use crate::models::{User, UserRole};
use crate::services::auth::{
    create_account, validate_email, validate_name, validate_password, AuthError,
};
use crate::services::password::hash_password_blocking;
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;

/// Input for admin-created accounts
#[derive(Debug, Clone, Deserialize)]
pub struct CreateUserInput {
    pub email: String,
    pub password: String,
    pub name: String,
    #[serde(default)]
    pub role: UserRole,
}

/// Partial update; absent fields are left unchanged
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateUserInput {
    pub email: Option<String>,
    pub password: Option<String>,
    pub name: Option<String>,
    pub role: Option<UserRole>,
}

/// User service
pub struct UserService {
    user_repo: Arc<dyn UserRepository>,
}

impl UserService {
    pub fn new(user_repo: Arc<dyn UserRepository>) -> Self {
        Self { user_repo }
    }

    /// Create an account with the requested role
    pub async fn create_user(&self, input: CreateUserInput) -> Result<User, AuthError> {
        let user = create_account(
            self.user_repo.as_ref(),
            input.email,
            input.password,
            input.name,
            input.role,
        )
        .await?;

        tracing::info!(user_id = %user.id, role = %user.role, "User created");
        Ok(user)
    }

    /// Get a user by ID
    pub async fn get_by_id(&self, id: Uuid) -> Result<User, AuthError> {
        self.user_repo
            .find_by_id(id)
            .await?
            .ok_or(AuthError::UserNotFound)
    }

    /// List all users
    pub async fn list_all(&self) -> Result<Vec<User>, AuthError> {
        Ok(self.user_repo.list_all().await?)
    }

    /// Apply a partial update.
    ///
    /// A new email must not belong to another account. A new password is
    /// re-hashed.
    pub async fn update_user(&self, id: Uuid, input: UpdateUserInput) -> Result<User, AuthError> {
        let mut user = self.get_by_id(id).await?;

        if let Some(email) = input.email {
            if email != user.email {
                if let Some(other) = self.user_repo.find_by_email(&email).await? {
                    if other.id != user.id {
                        return Err(AuthError::AlreadyExists);
                    }
                }
                user.email = email;
            }
        }
        if let Some(name) = input.name {
            user.name = name;
        }
        if let Some(role) = input.role {
            user.role = role;
        }

        validate_email(&user.email)?;
        validate_name(&user.name)?;

        if let Some(password) = input.password {
            validate_password(&password)?;
            user.password_hash = hash_password_blocking(password)
                .await
                .map_err(AuthError::Hashing)?;
        }

        match self.user_repo.update(&user).await {
            Ok(Some(updated)) => {
                tracing::info!(user_id = %updated.id, "User updated");
                Ok(updated)
            }
            Ok(None) => Err(AuthError::UserNotFound),
            Err(e) if is_unique_violation(&e) => Err(AuthError::AlreadyExists),
            Err(e) => Err(AuthError::Storage(e)),
        }
    }

    /// Delete a user. Existing sessions are not removed.
    pub async fn delete_user(&self, id: Uuid) -> Result<(), AuthError> {
        if !self.user_repo.delete(id).await? {
            return Err(AuthError::UserNotFound);
        }
        tracing::info!(user_id = %id, "User deleted");
        Ok(())
    }

    /// Create the configured admin account unless the email is already registered.
    ///
    /// Returns the new user, or `None` if nothing was created.
    pub async fn ensure_admin(
        &self,
        email: &str,
        password: &str,
        name: &str,
    ) -> Result<Option<User>, AuthError> {
        if let Some(existing) = self.user_repo.find_by_email(email).await? {
            if !existing.is_admin() {
                tracing::warn!(
                    user_id = %existing.id,
                    "Configured admin email belongs to a non-admin account"
                );
            }
            return Ok(None);
        }

        let admin = create_account(
            self.user_repo.as_ref(),
            email.to_string(),
            password.to_string(),
            name.to_string(),
            UserRole::Admin,
        )
        .await?;

        tracing::info!(user_id = %admin.id, "Admin account created");
        Ok(Some(admin))
    }
}
