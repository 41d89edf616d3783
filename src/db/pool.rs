//! Connection pools
//!
//! `Database` wraps whichever sqlx pool the configured driver needs and is
//! shared as a `DynDatabasePool`.

use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::{
    mysql::{MySqlPool, MySqlPoolOptions},
    sqlite::{SqlitePool, SqlitePoolOptions},
};
use std::path::Path;
use std::sync::Arc;

use crate::config::{DatabaseConfig, DatabaseDriver};

#[async_trait]
pub trait DatabasePool: Send + Sync {
    /// Run a statement that returns no rows, yielding the affected row count
    async fn execute(&self, query: &str) -> Result<u64>;

    async fn ping(&self) -> Result<()>;

    async fn close(&self);

    fn driver(&self) -> DatabaseDriver;

    fn as_sqlite(&self) -> Option<&SqlitePool>;

    fn as_mysql(&self) -> Option<&MySqlPool>;
}

pub type DynDatabasePool = Arc<dyn DatabasePool>;

/// A connected backend
pub enum Database {
    Sqlite(SqlitePool),
    Mysql(MySqlPool),
}

impl Database {
    pub async fn connect(config: &DatabaseConfig) -> Result<Self> {
        match config.driver {
            DatabaseDriver::Sqlite => connect_sqlite(&config.url).await.map(Self::Sqlite),
            DatabaseDriver::Mysql => connect_mysql(&config.url).await.map(Self::Mysql),
        }
    }
}

fn is_in_memory(url: &str) -> bool {
    url == ":memory:" || url.starts_with("sqlite::memory:")
}

/// Normalize a bare path or `sqlite:` URL, opening file databases read-write-create
fn sqlite_url(url: &str) -> String {
    match url.strip_prefix("sqlite:") {
        _ if url == ":memory:" => "sqlite::memory:".to_string(),
        Some(_) if url.contains('?') => url.to_string(),
        Some(_) => format!("{}?mode=rwc", url),
        None => format!("sqlite:{}?mode=rwc", url),
    }
}

fn ensure_parent_dir(url: &str) -> Result<()> {
    let path = url.trim_start_matches("sqlite:");
    let path = path.split('?').next().unwrap_or(path);

    match Path::new(path).parent() {
        Some(dir) if !dir.as_os_str().is_empty() => std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create database directory: {:?}", dir)),
        _ => Ok(()),
    }
}

async fn connect_sqlite(url: &str) -> Result<SqlitePool> {
    let in_memory = is_in_memory(url);
    if !in_memory {
        ensure_parent_dir(url)?;
    }

    // Each connection to `:memory:` is its own database, so the pool keeps a
    // single connection alive for its whole life.
    let options = if in_memory {
        SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
    } else {
        SqlitePoolOptions::new().max_connections(20)
    };

    options
        .connect(&sqlite_url(url))
        .await
        .with_context(|| format!("Failed to connect to SQLite database: {}", url))
}

async fn connect_mysql(url: &str) -> Result<MySqlPool> {
    let url = if url.starts_with("mysql://") {
        url.to_string()
    } else {
        format!("mysql://{}", url)
    };

    MySqlPoolOptions::new()
        .max_connections(30)
        .connect(&url)
        .await
        .context("Failed to connect to MySQL database")
}

#[async_trait]
impl DatabasePool for Database {
    async fn execute(&self, query: &str) -> Result<u64> {
        let affected = match self {
            Self::Sqlite(pool) => sqlx::query(query)
                .execute(pool)
                .await
                .map(|r| r.rows_affected()),
            Self::Mysql(pool) => sqlx::query(query)
                .execute(pool)
                .await
                .map(|r| r.rows_affected()),
        };
        affected.with_context(|| format!("Failed to execute query: {}", query))
    }

    async fn ping(&self) -> Result<()> {
        let result = match self {
            Self::Sqlite(pool) => sqlx::query("SELECT 1").execute(pool).await.map(|_| ()),
            Self::Mysql(pool) => sqlx::query("SELECT 1").execute(pool).await.map(|_| ()),
        };
        result.context("Database ping failed")
    }

    async fn close(&self) {
        match self {
            Self::Sqlite(pool) => pool.close().await,
            Self::Mysql(pool) => pool.close().await,
        }
    }

    fn driver(&self) -> DatabaseDriver {
        match self {
            Self::Sqlite(_) => DatabaseDriver::Sqlite,
            Self::Mysql(_) => DatabaseDriver::Mysql,
        }
    }

    fn as_sqlite(&self) -> Option<&SqlitePool> {
        match self {
            Self::Sqlite(pool) => Some(pool),
            Self::Mysql(_) => None,
        }
    }

    fn as_mysql(&self) -> Option<&MySqlPool> {
        match self {
            Self::Mysql(pool) => Some(pool),
            Self::Sqlite(_) => None,
        }
    }
}

pub async fn create_pool(config: &DatabaseConfig) -> Result<DynDatabasePool> {
    Ok(Arc::new(Database::connect(config).await?))
}

/// In-memory SQLite pool for tests
pub async fn create_test_pool() -> Result<DynDatabasePool> {
    create_pool(&DatabaseConfig {
        driver: DatabaseDriver::Sqlite,
        url: ":memory:".to_string(),
    })
    .await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sqlite_url_normalization() {
        assert_eq!(sqlite_url(":memory:"), "sqlite::memory:");
        assert_eq!(sqlite_url("data/auth.db"), "sqlite:data/auth.db?mode=rwc");
        assert_eq!(sqlite_url("sqlite:auth.db"), "sqlite:auth.db?mode=rwc");
        assert_eq!(sqlite_url("sqlite:auth.db?mode=ro"), "sqlite:auth.db?mode=ro");
        assert!(is_in_memory("sqlite::memory:"));
        assert!(!is_in_memory("auth.db"));
    }

    #[tokio::test]
    async fn test_sqlite_pool_creation() {
        let pool = create_test_pool().await.expect("Failed to create pool");

        assert_eq!(pool.driver(), DatabaseDriver::Sqlite);
        assert!(pool.as_sqlite().is_some());
        assert!(pool.as_mysql().is_none());
        pool.ping().await.expect("Ping should succeed");
    }

    #[tokio::test]
    async fn test_in_memory_pool_keeps_state_across_queries() {
        let pool = create_test_pool().await.expect("Failed to create pool");

        pool.execute("CREATE TABLE scratch (id INTEGER PRIMARY KEY, name TEXT)")
            .await
            .expect("Failed to create table");
        let affected = pool
            .execute("INSERT INTO scratch (name) VALUES ('x')")
            .await
            .expect("Failed to insert");

        assert_eq!(affected, 1);
    }

    #[tokio::test]
    async fn test_sqlite_nested_directory_creation() {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
        let db_path = temp_dir.path().join("nested").join("dir").join("auth.db");

        let pool = create_pool(&DatabaseConfig {
            driver: DatabaseDriver::Sqlite,
            url: db_path.to_string_lossy().to_string(),
        })
        .await
        .expect("Failed to create pool");
        pool.ping().await.expect("Ping should succeed");

        assert!(db_path.exists());
    }

    // Set MYSQL_TEST_URL to run against a live server.
    #[tokio::test]
    #[ignore = "Requires MySQL server"]
    async fn test_mysql_pool_ping() {
        let url = std::env::var("MYSQL_TEST_URL")
            .unwrap_or_else(|_| "mysql://root@localhost/test".to_string());

        let pool = create_pool(&DatabaseConfig {
            driver: DatabaseDriver::Mysql,
            url,
        })
        .await
        .expect("Failed to create pool");
        assert_eq!(pool.driver(), DatabaseDriver::Mysql);
        pool.ping().await.expect("Ping should succeed");
    }
}
