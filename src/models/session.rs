//! Session model

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Session entity proving a successful login.
///
/// The token is the bearer credential; it is skipped on serialization so a
/// session never leaks it through a log or response body by accident.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    /// Session ID
    pub id: Uuid,
    /// Owning user (non-owning reference, no cascade)
    pub user_id: Uuid,
    /// Opaque bearer token
    #[serde(skip_serializing, default)]
    pub token: String,
    /// Expiration timestamp
    pub expires_at: DateTime<Utc>,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
    /// Last update timestamp
    pub updated_at: DateTime<Utc>,
}

impl Session {
    /// Create a session for `user_id` that expires `ttl` from now
    pub fn new(user_id: Uuid, token: String, ttl: Duration) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            user_id,
            token,
            expires_at: now + ttl,
            created_at: now,
            updated_at: now,
        }
    }
}
