//! Database layer
//!
//! Persistence for users and sessions. Two backends are supported:
//! - SQLite (default, single-file deployment)
//! - MySQL
//!
//! The backend is selected from `DatabaseConfig::driver`. Everything above
//! this module talks to a `DynDatabasePool` and the repository traits, never
//! to a concrete sqlx pool.
//!
//! # Usage
//!
//! ```ignore
//! use authgate::config::DatabaseConfig;
//! use authgate::db::{create_pool, migrations};
//!
//! let pool = create_pool(&DatabaseConfig::default()).await?;
//! migrations::run_migrations(&pool).await?;
//! pool.ping().await?;
//! ```

pub mod migrations;
pub mod pool;
pub mod repositories;

pub use pool::{create_pool, create_test_pool, Database, DatabasePool, DynDatabasePool};
