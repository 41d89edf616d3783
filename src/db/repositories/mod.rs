//! Database repositories
//!
//! Repository pattern implementations for database access.
//! Each repository handles the persistence of a single entity.

pub mod session;
pub mod user;

pub use session::{SessionRepository, SqlxSessionRepository};
pub use user::{SqlxUserRepository, UserRepository};

use anyhow::{anyhow, Result};
use sqlx::{MySqlPool, SqlitePool};

use crate::db::DynDatabasePool;

/// Concrete backend behind a `DynDatabasePool`
pub(crate) enum Backend<'a> {
    Sqlite(&'a SqlitePool),
    Mysql(&'a MySqlPool),
}

pub(crate) fn backend(pool: &DynDatabasePool) -> Result<Backend<'_>> {
    if let Some(sqlite) = pool.as_sqlite() {
        return Ok(Backend::Sqlite(sqlite));
    }
    if let Some(mysql) = pool.as_mysql() {
        return Ok(Backend::Mysql(mysql));
    }
    Err(anyhow!("Database pool exposes no backend"))
}

/// Check whether a repository error was caused by a UNIQUE constraint
pub fn is_unique_violation(err: &anyhow::Error) -> bool {
    err.downcast_ref::<sqlx::Error>()
        .and_then(|e| e.as_database_error())
        .map(|db| db.is_unique_violation())
        .unwrap_or(false)
}
