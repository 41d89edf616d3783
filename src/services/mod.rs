//! Services layer - Business logic
//!
//! Services implement the account and session rules on top of the
//! repository traits. They never touch a concrete database pool.

pub mod auth;
pub mod password;
pub mod user;

pub use auth::{AuthError, AuthService, LoginInput, RegisterInput};
pub use password::{hash_password, verify_password};
pub use user::{CreateUserInput, UpdateUserInput, UserService};
