//! Credential store contract and its two implementations
//!
//! The recovery pipeline talks to user records through one trait with two
//! backends: a durable PostgreSQL store and an in-memory fallback used when
//! the database cannot be reached at startup. Selection happens exactly once
//! in `main`; after that, callers never learn which backend answers them.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

use crate::models::{NewUser, User};

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors surfaced by credential store operations
#[derive(Debug, Error)]
pub enum StoreError {
    /// No record matches the given key
    #[error("record not found")]
    NotFound,

    /// The email is already registered to another record
    #[error("email already registered")]
    DuplicateEmail,

    /// The backing store cannot be reached or answered with a failure
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(error: sqlx::Error) -> Self {
        match error {
            sqlx::Error::RowNotFound => Self::NotFound,
            // The only unique constraint on the users table is the email index.
            sqlx::Error::Database(db_err) if db_err.is_unique_violation() => Self::DuplicateEmail,
            other => Self::Unavailable(other.to_string()),
        }
    }
}

/// Data-access contract shared by the durable and fallback stores
///
/// Writes are atomic per record: the reset token and its expiry are set or
/// cleared together, never one without the other. Both implementations must
/// report identical error semantics, so a caller cannot tell the backends
/// apart by behavior.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Find a user by email, matched case-insensitively
    async fn find_by_email(&self, email: &str) -> StoreResult<Option<User>>;

    /// Find a user by id
    async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<User>>;

    /// Find a user by normalized phone number
    async fn find_by_phone(&self, phone: &str) -> StoreResult<Option<User>>;

    /// Create a user record; fails with [`StoreError::DuplicateEmail`] if the
    /// email is already registered
    async fn create(&self, new_user: &NewUser) -> StoreResult<User>;

    /// Attach a reset token and its expiry to the user record
    async fn set_reset_token(
        &self,
        user_id: Uuid,
        token: &str,
        expires_at: DateTime<Utc>,
    ) -> StoreResult<()>;

    /// Remove any pending reset token from the user record
    async fn clear_reset_token(&self, user_id: Uuid) -> StoreResult<()>;

    /// Replace the stored password hash
    async fn update_password(&self, user_id: Uuid, new_password_hash: &str) -> StoreResult<()>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::MemoryCredentialStore;
    use chrono::Duration;

    fn sample_user(email: &str, phone: Option<&str>) -> NewUser {
        NewUser {
            email: email.to_string(),
            name: "Contract User".to_string(),
            phone: phone.map(str::to_string),
            password_hash: "hash-v1".to_string(),
        }
    }

    /// Drives a store through the full contract. Any backend that passes
    /// this sequence is observably interchangeable with the others.
    async fn exercise_contract(store: &dyn CredentialStore) {
        let created = store
            .create(&sample_user("contract@example.com", Some("15550123")))
            .await
            .expect("create should succeed");
        assert_eq!(created.email, "contract@example.com");
        assert!(created.active);
        assert!(!created.has_pending_reset());

        // Duplicate email is rejected regardless of case.
        let duplicate = store
            .create(&sample_user("CONTRACT@example.com", None))
            .await;
        assert!(matches!(duplicate, Err(StoreError::DuplicateEmail)));

        // Lookup by email is case-insensitive.
        let by_email = store
            .find_by_email("Contract@Example.COM")
            .await
            .unwrap()
            .expect("user should be found by email");
        assert_eq!(by_email.id, created.id);
        assert!(
            store
                .find_by_email("nobody@example.com")
                .await
                .unwrap()
                .is_none()
        );

        let by_id = store
            .find_by_id(created.id)
            .await
            .unwrap()
            .expect("user should be found by id");
        assert_eq!(by_id.email, created.email);
        assert!(store.find_by_id(Uuid::new_v4()).await.unwrap().is_none());

        // Phone lookup matches against the normalized form.
        let by_phone = store
            .find_by_phone("+15550123")
            .await
            .unwrap()
            .expect("user should be found by phone");
        assert_eq!(by_phone.id, created.id);
        assert!(store.find_by_phone("+19990000").await.unwrap().is_none());

        // Token fields are set and cleared together.
        let expires_at = Utc::now() + Duration::minutes(10);
        store
            .set_reset_token(created.id, "token-abc", expires_at)
            .await
            .unwrap();
        let pending = store.find_by_id(created.id).await.unwrap().unwrap();
        assert!(pending.has_pending_reset());
        assert_eq!(pending.reset_token.as_deref(), Some("token-abc"));
        assert_eq!(pending.reset_token_expiry, Some(expires_at));

        store.clear_reset_token(created.id).await.unwrap();
        let cleared = store.find_by_id(created.id).await.unwrap().unwrap();
        assert!(cleared.reset_token.is_none());
        assert!(cleared.reset_token_expiry.is_none());

        store.update_password(created.id, "hash-v2").await.unwrap();
        let updated = store.find_by_id(created.id).await.unwrap().unwrap();
        assert_eq!(updated.password_hash, "hash-v2");

        // Writes against an unknown record report NotFound.
        let missing = Uuid::new_v4();
        assert!(matches!(
            store.set_reset_token(missing, "t", expires_at).await,
            Err(StoreError::NotFound)
        ));
        assert!(matches!(
            store.clear_reset_token(missing).await,
            Err(StoreError::NotFound)
        ));
        assert!(matches!(
            store.update_password(missing, "h").await,
            Err(StoreError::NotFound)
        ));
    }

    #[tokio::test]
    async fn test_memory_store_satisfies_contract() {
        let store = MemoryCredentialStore::new();
        exercise_contract(&store).await;
    }
}
