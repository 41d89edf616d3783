//! User repository
//!
//! Database operations for users.
//!
//! This module provides:
//! - `UserRepository` trait defining the interface for user data access
//! - `SqlxUserRepository` implementing the trait for SQLite and MySQL
//!
//! Ids are stored as hyphenated UUID text on both backends.

use super::{backend, Backend};
use crate::db::DynDatabasePool;
use crate::models::{User, UserRole};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{MySqlPool, Row, SqlitePool};
use std::str::FromStr;
use std::sync::Arc;
use uuid::Uuid;

/// User repository trait
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Insert a new user. Fails on duplicate email.
    async fn create(&self, user: &User) -> Result<User>;

    /// Find user by exact email
    async fn find_by_email(&self, email: &str) -> Result<Option<User>>;

    /// Find user by ID
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>>;

    /// List all users, oldest first
    async fn list_all(&self) -> Result<Vec<User>>;

    /// Update email, name, role and password hash. Returns `None` if no such user.
    async fn update(&self, user: &User) -> Result<Option<User>>;

    /// Delete a user. Returns whether a row was removed.
    async fn delete(&self, id: Uuid) -> Result<bool>;
}

/// SQLx-based user repository implementation
///
/// Supports both SQLite and MySQL databases.
pub struct SqlxUserRepository {
    pool: DynDatabasePool,
}

impl SqlxUserRepository {
    /// Create a new SQLx user repository
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn UserRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl UserRepository for SqlxUserRepository {
    async fn create(&self, user: &User) -> Result<User> {
        match backend(&self.pool)? {
            Backend::Sqlite(pool) => create_user_sqlite(pool, user).await,
            Backend::Mysql(pool) => create_user_mysql(pool, user).await,
        }
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        match backend(&self.pool)? {
            Backend::Sqlite(pool) => find_user_by_email_sqlite(pool, email).await,
            Backend::Mysql(pool) => find_user_by_email_mysql(pool, email).await,
        }
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>> {
        match backend(&self.pool)? {
            Backend::Sqlite(pool) => find_user_by_id_sqlite(pool, id).await,
            Backend::Mysql(pool) => find_user_by_id_mysql(pool, id).await,
        }
    }

    async fn list_all(&self) -> Result<Vec<User>> {
        match backend(&self.pool)? {
            Backend::Sqlite(pool) => list_users_sqlite(pool).await,
            Backend::Mysql(pool) => list_users_mysql(pool).await,
        }
    }

    async fn update(&self, user: &User) -> Result<Option<User>> {
        match backend(&self.pool)? {
            Backend::Sqlite(pool) => update_user_sqlite(pool, user).await,
            Backend::Mysql(pool) => update_user_mysql(pool, user).await,
        }
    }

    async fn delete(&self, id: Uuid) -> Result<bool> {
        match backend(&self.pool)? {
            Backend::Sqlite(pool) => delete_user_sqlite(pool, id).await,
            Backend::Mysql(pool) => delete_user_mysql(pool, id).await,
        }
    }
}

const SELECT_USER: &str =
    "SELECT id, email, password_hash, name, role, created_at, updated_at FROM users";

fn parse_id(raw: &str) -> Result<Uuid> {
    Uuid::parse_str(raw).with_context(|| format!("Invalid user id in database: {}", raw))
}

fn parse_role(raw: &str) -> Result<UserRole> {
    UserRole::from_str(raw).with_context(|| format!("Invalid role in database: {}", raw))
}

// ============================================================================
// SQLite implementations
// ============================================================================

async fn create_user_sqlite(pool: &SqlitePool, user: &User) -> Result<User> {
    sqlx::query(
        r#"
        INSERT INTO users (id, email, password_hash, name, role, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(user.id.to_string())
    .bind(&user.email)
    .bind(&user.password_hash)
    .bind(&user.name)
    .bind(user.role.to_string())
    .bind(user.created_at)
    .bind(user.updated_at)
    .execute(pool)
    .await
    .context("Failed to create user")?;

    Ok(user.clone())
}

async fn find_user_by_email_sqlite(pool: &SqlitePool, email: &str) -> Result<Option<User>> {
    let row = sqlx::query(&format!("{} WHERE email = ?", SELECT_USER))
        .bind(email)
        .fetch_optional(pool)
        .await
        .context("Failed to get user by email")?;

    row.as_ref().map(row_to_user_sqlite).transpose()
}

async fn find_user_by_id_sqlite(pool: &SqlitePool, id: Uuid) -> Result<Option<User>> {
    let row = sqlx::query(&format!("{} WHERE id = ?", SELECT_USER))
        .bind(id.to_string())
        .fetch_optional(pool)
        .await
        .context("Failed to get user by ID")?;

    row.as_ref().map(row_to_user_sqlite).transpose()
}

async fn list_users_sqlite(pool: &SqlitePool) -> Result<Vec<User>> {
    let rows = sqlx::query(&format!("{} ORDER BY created_at ASC", SELECT_USER))
        .fetch_all(pool)
        .await
        .context("Failed to list users")?;

    rows.iter().map(row_to_user_sqlite).collect()
}

async fn update_user_sqlite(pool: &SqlitePool, user: &User) -> Result<Option<User>> {
    let now = Utc::now();
    let result = sqlx::query(
        r#"
        UPDATE users
        SET email = ?, password_hash = ?, name = ?, role = ?, updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(&user.email)
    .bind(&user.password_hash)
    .bind(&user.name)
    .bind(user.role.to_string())
    .bind(now)
    .bind(user.id.to_string())
    .execute(pool)
    .await
    .context("Failed to update user")?;

    if result.rows_affected() == 0 {
        return Ok(None);
    }

    Ok(Some(User {
        updated_at: now,
        ..user.clone()
    }))
}

async fn delete_user_sqlite(pool: &SqlitePool, id: Uuid) -> Result<bool> {
    let result = sqlx::query("DELETE FROM users WHERE id = ?")
        .bind(id.to_string())
        .execute(pool)
        .await
        .context("Failed to delete user")?;

    Ok(result.rows_affected() > 0)
}

fn row_to_user_sqlite(row: &sqlx::sqlite::SqliteRow) -> Result<User> {
    let id: String = row.try_get("id")?;
    let role: String = row.try_get("role")?;

    Ok(User {
        id: parse_id(&id)?,
        email: row.try_get("email")?,
        password_hash: row.try_get("password_hash")?,
        name: row.try_get("name")?,
        role: parse_role(&role)?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

// ============================================================================
// MySQL implementations
// ============================================================================

async fn create_user_mysql(pool: &MySqlPool, user: &User) -> Result<User> {
    sqlx::query(
        r#"
        INSERT INTO users (id, email, password_hash, name, role, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(user.id.to_string())
    .bind(&user.email)
    .bind(&user.password_hash)
    .bind(&user.name)
    .bind(user.role.to_string())
    .bind(user.created_at)
    .bind(user.updated_at)
    .execute(pool)
    .await
    .context("Failed to create user")?;

    Ok(user.clone())
}

async fn find_user_by_email_mysql(pool: &MySqlPool, email: &str) -> Result<Option<User>> {
    let row = sqlx::query(&format!("{} WHERE email = ?", SELECT_USER))
        .bind(email)
        .fetch_optional(pool)
        .await
        .context("Failed to get user by email")?;

    row.as_ref().map(row_to_user_mysql).transpose()
}

async fn find_user_by_id_mysql(pool: &MySqlPool, id: Uuid) -> Result<Option<User>> {
    let row = sqlx::query(&format!("{} WHERE id = ?", SELECT_USER))
        .bind(id.to_string())
        .fetch_optional(pool)
        .await
        .context("Failed to get user by ID")?;

    row.as_ref().map(row_to_user_mysql).transpose()
}

async fn list_users_mysql(pool: &MySqlPool) -> Result<Vec<User>> {
    let rows = sqlx::query(&format!("{} ORDER BY created_at ASC", SELECT_USER))
        .fetch_all(pool)
        .await
        .context("Failed to list users")?;

    rows.iter().map(row_to_user_mysql).collect()
}

async fn update_user_mysql(pool: &MySqlPool, user: &User) -> Result<Option<User>> {
    let now = Utc::now();
    let result = sqlx::query(
        r#"
        UPDATE users
        SET email = ?, password_hash = ?, name = ?, role = ?, updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(&user.email)
    .bind(&user.password_hash)
    .bind(&user.name)
    .bind(user.role.to_string())
    .bind(now)
    .bind(user.id.to_string())
    .execute(pool)
    .await
    .context("Failed to update user")?;

    // MySQL reports matched-but-unchanged rows as 0 affected, so confirm existence.
    if result.rows_affected() == 0 && find_user_by_id_mysql(pool, user.id).await?.is_none() {
        return Ok(None);
    }

    Ok(Some(User {
        updated_at: now,
        ..user.clone()
    }))
}

async fn delete_user_mysql(pool: &MySqlPool, id: Uuid) -> Result<bool> {
    let result = sqlx::query("DELETE FROM users WHERE id = ?")
        .bind(id.to_string())
        .execute(pool)
        .await
        .context("Failed to delete user")?;

    Ok(result.rows_affected() > 0)
}

fn row_to_user_mysql(row: &sqlx::mysql::MySqlRow) -> Result<User> {
    let id: String = row.try_get("id")?;
    let role: String = row.try_get("role")?;

    Ok(User {
        id: parse_id(&id)?,
        email: row.try_get("email")?,
        password_hash: row.try_get("password_hash")?,
        name: row.try_get("name")?,
        role: parse_role(&role)?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}
