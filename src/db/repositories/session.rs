//! Session repository
//!
//! Database operations for login sessions.
//!
//! This module provides:
//! - `SessionRepository` trait defining the interface for session data access
//! - `SqlxSessionRepository` implementing the trait for SQLite and MySQL
//!
//! Lookups by token only ever return sessions that have not expired.

use super::{backend, Backend};
use crate::db::DynDatabasePool;
use crate::models::Session;
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{MySqlPool, Row, SqlitePool};
use std::sync::Arc;
use uuid::Uuid;

/// Session repository trait
#[async_trait]
pub trait SessionRepository: Send + Sync {
    /// Insert a new session
    async fn create(&self, session: &Session) -> Result<Session>;

    /// Find a session by token whose expiry is strictly after `now`
    async fn find_active_by_token(&self, token: &str, now: DateTime<Utc>)
        -> Result<Option<Session>>;

    /// Delete the session holding `token`. Deleting an unknown token is not an error.
    async fn delete_by_token(&self, token: &str) -> Result<u64>;

    /// Delete every session whose expiry is at or before `now`
    async fn delete_expired(&self, now: DateTime<Utc>) -> Result<u64>;
}

/// SQLx-based session repository implementation
///
/// Supports both SQLite and MySQL databases.
pub struct SqlxSessionRepository {
    pool: DynDatabasePool,
}

impl SqlxSessionRepository {
    /// Create a new SQLx session repository
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn SessionRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl SessionRepository for SqlxSessionRepository {
    async fn create(&self, session: &Session) -> Result<Session> {
        match backend(&self.pool)? {
            Backend::Sqlite(pool) => create_session_sqlite(pool, session).await,
            Backend::Mysql(pool) => create_session_mysql(pool, session).await,
        }
    }

    async fn find_active_by_token(
        &self,
        token: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<Session>> {
        match backend(&self.pool)? {
            Backend::Sqlite(pool) => find_active_session_sqlite(pool, token, now).await,
            Backend::Mysql(pool) => find_active_session_mysql(pool, token, now).await,
        }
    }

    async fn delete_by_token(&self, token: &str) -> Result<u64> {
        match backend(&self.pool)? {
            Backend::Sqlite(pool) => delete_session_sqlite(pool, token).await,
            Backend::Mysql(pool) => delete_session_mysql(pool, token).await,
        }
    }

    async fn delete_expired(&self, now: DateTime<Utc>) -> Result<u64> {
        match backend(&self.pool)? {
            Backend::Sqlite(pool) => delete_expired_sessions_sqlite(pool, now).await,
            Backend::Mysql(pool) => delete_expired_sessions_mysql(pool, now).await,
        }
    }
}

const SELECT_SESSION: &str =
    "SELECT id, user_id, token, expires_at, created_at, updated_at FROM sessions";

fn parse_uuid(raw: &str, column: &str) -> Result<Uuid> {
    Uuid::parse_str(raw).with_context(|| format!("Invalid {} in database: {}", column, raw))
}

// ============================================================================
// SQLite implementations
// ============================================================================

async fn create_session_sqlite(pool: &SqlitePool, session: &Session) -> Result<Session> {
    sqlx::query(
        r#"
        INSERT INTO sessions (id, user_id, token, expires_at, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(session.id.to_string())
    .bind(session.user_id.to_string())
    .bind(&session.token)
    .bind(session.expires_at)
    .bind(session.created_at)
    .bind(session.updated_at)
    .execute(pool)
    .await
    .context("Failed to create session")?;

    Ok(session.clone())
}

async fn find_active_session_sqlite(
    pool: &SqlitePool,
    token: &str,
    now: DateTime<Utc>,
) -> Result<Option<Session>> {
    let row = sqlx::query(&format!("{} WHERE token = ? AND expires_at > ?", SELECT_SESSION))
        .bind(token)
        .bind(now)
        .fetch_optional(pool)
        .await
        .context("Failed to get session by token")?;

    row.as_ref().map(row_to_session_sqlite).transpose()
}

async fn delete_session_sqlite(pool: &SqlitePool, token: &str) -> Result<u64> {
    let result = sqlx::query("DELETE FROM sessions WHERE token = ?")
        .bind(token)
        .execute(pool)
        .await
        .context("Failed to delete session")?;

    Ok(result.rows_affected())
}

async fn delete_expired_sessions_sqlite(pool: &SqlitePool, now: DateTime<Utc>) -> Result<u64> {
    let result = sqlx::query("DELETE FROM sessions WHERE expires_at <= ?")
        .bind(now)
        .execute(pool)
        .await
        .context("Failed to delete expired sessions")?;

    Ok(result.rows_affected())
}

fn row_to_session_sqlite(row: &sqlx::sqlite::SqliteRow) -> Result<Session> {
    let id: String = row.try_get("id")?;
    let user_id: String = row.try_get("user_id")?;

    Ok(Session {
        id: parse_uuid(&id, "session id")?,
        user_id: parse_uuid(&user_id, "user id")?,
        token: row.try_get("token")?,
        expires_at: row.try_get("expires_at")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

// ============================================================================
// MySQL implementations
// ============================================================================

async fn create_session_mysql(pool: &MySqlPool, session: &Session) -> Result<Session> {
    sqlx::query(
        r#"
        INSERT INTO sessions (id, user_id, token, expires_at, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(session.id.to_string())
    .bind(session.user_id.to_string())
    .bind(&session.token)
    .bind(session.expires_at)
    .bind(session.created_at)
    .bind(session.updated_at)
    .execute(pool)
    .await
    .context("Failed to create session")?;

    Ok(session.clone())
}

async fn find_active_session_mysql(
    pool: &MySqlPool,
    token: &str,
    now: DateTime<Utc>,
) -> Result<Option<Session>> {
    let row = sqlx::query(&format!("{} WHERE token = ? AND expires_at > ?", SELECT_SESSION))
        .bind(token)
        .bind(now)
        .fetch_optional(pool)
        .await
        .context("Failed to get session by token")?;

    row.as_ref().map(row_to_session_mysql).transpose()
}

async fn delete_session_mysql(pool: &MySqlPool, token: &str) -> Result<u64> {
    let result = sqlx::query("DELETE FROM sessions WHERE token = ?")
        .bind(token)
        .execute(pool)
        .await
        .context("Failed to delete session")?;

    Ok(result.rows_affected())
}

async fn delete_expired_sessions_mysql(pool: &MySqlPool, now: DateTime<Utc>) -> Result<u64> {
    let result = sqlx::query("DELETE FROM sessions WHERE expires_at <= ?")
        .bind(now)
        .execute(pool)
        .await
        .context("Failed to delete expired sessions")?;

    Ok(result.rows_affected())
}

fn row_to_session_mysql(row: &sqlx::mysql::MySqlRow) -> Result<Session> {
    let id: String = row.try_get("id")?;
    let user_id: String = row.try_get("user_id")?;

    Ok(Session {
        id: parse_uuid(&id, "session id")?,
        user_id: parse_uuid(&user_id, "user id")?,
        token: row.try_get("token")?,
        expires_at: row.try_get("expires_at")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}
