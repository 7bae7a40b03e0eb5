//! User model and related functionality

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// User entity
///
/// The reset token fields are either both set or both absent: a pending
/// recovery always carries its expiry. The password hash and the token are
/// skipped on serialization so neither can leak through a response body.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub phone: Option<String>,
    #[serde(skip_serializing)]
    pub password_hash: String,
    #[serde(skip_serializing)]
    pub reset_token: Option<String>,
    #[serde(skip_serializing)]
    pub reset_token_expiry: Option<DateTime<Utc>>,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Whether a recovery request is pending for this user
    pub fn has_pending_reset(&self) -> bool {
        self.reset_token.is_some() && self.reset_token_expiry.is_some()
    }
}

/// New user creation payload
///
/// `password_hash` carries the already-hashed password; callers hash with
/// [`crate::password::hash_password`] before handing the record to a store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewUser {
    pub email: String,
    pub name: String,
    pub phone: Option<String>,
    pub password_hash: String,
}
