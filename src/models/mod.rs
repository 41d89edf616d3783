//! Data models
//!
//! Entities persisted by the repositories:
//! - `User`: account record with role
//! - `Session`: login proof keyed by an opaque bearer token

mod session;
mod user;

pub use session::Session;
pub use user::{User, UserRole};
