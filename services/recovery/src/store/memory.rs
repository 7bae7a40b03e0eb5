//! In-memory fallback credential store

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use tracing::info;
use uuid::Uuid;

use crate::models::{NewUser, User};
use crate::password;
use crate::store::{CredentialStore, StoreError, StoreResult};
use crate::validation::normalize_phone;

/// In-memory credential store used when the durable store is unreachable
///
/// Records live in a process-lifetime map keyed by user id. The single
/// mutex means every write lands whole: a reader never observes a token
/// without its expiry or vice versa.
pub struct MemoryCredentialStore {
    users: Mutex<HashMap<Uuid, User>>,
}

impl MemoryCredentialStore {
    /// Create an empty in-memory store
    pub fn new() -> Self {
        Self {
            users: Mutex::new(HashMap::new()),
        }
    }

    /// Create a fallback store pre-seeded with the demo account
    ///
    /// The seed record lets the recovery flow run end-to-end with zero
    /// infrastructure: `demo@vitatrack.app`, password `Demo-Pass1`,
    /// phone `+15550100`.
    pub fn seeded() -> anyhow::Result<Self> {
        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            email: "demo@vitatrack.app".to_string(),
            name: "Demo User".to_string(),
            phone: Some("+15550100".to_string()),
            password_hash: password::hash_password("Demo-Pass1")?,
            reset_token: None,
            reset_token_expiry: None,
            active: true,
            created_at: now,
            updated_at: now,
        };

        info!("Seeded fallback store with demo account {}", user.email);

        let mut users = HashMap::new();
        users.insert(user.id, user);

        Ok(Self {
            users: Mutex::new(users),
        })
    }

    /// Flip a record's active flag, for tests that model suspended accounts
    #[cfg(test)]
    pub(crate) async fn set_active(&self, user_id: Uuid, active: bool) {
        if let Some(user) = self.users.lock().await.get_mut(&user_id) {
            user.active = active;
            user.updated_at = Utc::now();
        }
    }
}

#[async_trait]
impl CredentialStore for MemoryCredentialStore {
    async fn find_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let users = self.users.lock().await;
        Ok(users
            .values()
            .find(|user| user.email.eq_ignore_ascii_case(email))
            .cloned())
    }

    async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<User>> {
        let users = self.users.lock().await;
        Ok(users.get(&id).cloned())
    }

    async fn find_by_phone(&self, phone: &str) -> StoreResult<Option<User>> {
        let wanted = normalize_phone(phone);
        let users = self.users.lock().await;
        Ok(users
            .values()
            .find(|user| user.phone.as_deref() == Some(wanted.as_str()))
            .cloned())
    }

    async fn create(&self, new_user: &NewUser) -> StoreResult<User> {
        let mut users = self.users.lock().await;

        if users
            .values()
            .any(|user| user.email.eq_ignore_ascii_case(&new_user.email))
        {
            return Err(StoreError::DuplicateEmail);
        }

        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            email: new_user.email.clone(),
            name: new_user.name.clone(),
            phone: new_user.phone.as_deref().map(normalize_phone),
            password_hash: new_user.password_hash.clone(),
            reset_token: None,
            reset_token_expiry: None,
            active: true,
            created_at: now,
            updated_at: now,
        };

        users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn set_reset_token(
        &self,
        user_id: Uuid,
        token: &str,
        expires_at: DateTime<Utc>,
    ) -> StoreResult<()> {
        let mut users = self.users.lock().await;
        let user = users.get_mut(&user_id).ok_or(StoreError::NotFound)?;

        user.reset_token = Some(token.to_string());
        user.reset_token_expiry = Some(expires_at);
        user.updated_at = Utc::now();
        Ok(())
    }

    async fn clear_reset_token(&self, user_id: Uuid) -> StoreResult<()> {
        let mut users = self.users.lock().await;
        let user = users.get_mut(&user_id).ok_or(StoreError::NotFound)?;

        user.reset_token = None;
        user.reset_token_expiry = None;
        user.updated_at = Utc::now();
        Ok(())
    }

    async fn update_password(&self, user_id: Uuid, new_password_hash: &str) -> StoreResult<()> {
        let mut users = self.users.lock().await;
        let user = users.get_mut(&user_id).ok_or(StoreError::NotFound)?;

        user.password_hash = new_password_hash.to_string();
        user.updated_at = Utc::now();
        Ok(())
    }
}
