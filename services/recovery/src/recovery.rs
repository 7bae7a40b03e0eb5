//! Recovery orchestrator: ties the store, token service and notifier
//! into the two user-facing flows
//!
//! `request_reset` never reveals whether an identifier exists; callers get
//! the same acknowledgement either way. `redeem` runs inside a per-user
//! critical section so a token can be spent at most once even under
//! concurrent attempts.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::{RecoveryError, RecoveryResult};
use crate::notify::{Channel, Notifier};
use crate::password::hash_password;
use crate::store::CredentialStore;
use crate::token::{TokenService, TokenValidation};
use crate::validation::{validate_email, validate_password};

/// Orchestrates password recovery end to end
#[derive(Clone)]
pub struct RecoveryService {
    store: Arc<dyn CredentialStore>,
    tokens: TokenService,
    notifier: Notifier,
    redeem_locks: Arc<Mutex<HashMap<Uuid, Arc<Mutex<()>>>>>,
}

impl RecoveryService {
    pub fn new(store: Arc<dyn CredentialStore>, notifier: Notifier) -> Self {
        let tokens = TokenService::new(store.clone());
        Self {
            store,
            tokens,
            notifier,
            redeem_locks: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Start a password reset for the account behind `identifier`.
    ///
    /// Identifiers containing `@` are treated as emails, everything else
    /// as a phone number. Unknown identifiers, suspended accounts and
    /// missing phone numbers all return the same `Ok(())` acknowledgement
    /// without issuing a token or sending anything. Only a transport
    /// failure for a real account surfaces as an error.
    pub async fn request_reset(&self, identifier: &str, channel: Channel) -> RecoveryResult<()> {
        let identifier = identifier.trim();
        if identifier.is_empty() {
            return Err(RecoveryError::InvalidInput(
                "Identifier is required".to_string(),
            ));
        }

        let user = if identifier.contains('@') {
            validate_email(identifier).map_err(RecoveryError::InvalidInput)?;
            self.store.find_by_email(identifier).await?
        } else {
            self.store.find_by_phone(identifier).await?
        };

        let user = match user {
            Some(user) if user.active => user,
            _ => {
                info!("Reset requested for an unknown or inactive identifier");
                return Ok(());
            }
        };

        let recipient = match channel {
            Channel::Email => user.email.clone(),
            Channel::Sms => match user.phone.clone() {
                Some(phone) => phone,
                None => {
                    info!("Reset requested over sms for an account without a phone on file");
                    return Ok(());
                }
            },
        };

        let issued = self.tokens.issue(user.id).await?;
        let result = self
            .notifier
            .send_reset(channel, &recipient, &user.name, &issued.token)
            .await;

        if !result.success {
            let reason = result
                .error
                .unwrap_or_else(|| "transport reported failure without detail".to_string());
            warn!("Reset delivery over {} failed: {}", result.channel, reason);
            return Err(RecoveryError::DeliveryFailed(reason));
        }

        info!(
            "Reset message for user {} delivered over {} (reference {:?})",
            user.id, result.channel, result.provider_reference
        );
        Ok(())
    }

    /// Spend a reset token: validate it, replace the password and clear
    /// the token, as one logical transaction.
    ///
    /// The token is only cleared after the new password is in place, and
    /// success is never reported while the token could still be live; if
    /// clearing fails it is retried once before the whole call errors.
    pub async fn redeem(
        &self,
        user_id: Uuid,
        token: &str,
        new_password: &str,
    ) -> RecoveryResult<()> {
        validate_password(new_password).map_err(RecoveryError::InvalidInput)?;

        let lock = self.redemption_lock(user_id).await;
        let result = {
            let _guard = lock.lock().await;
            self.redeem_locked(user_id, token, new_password).await
        };
        drop(lock);
        self.discard_redemption_lock(user_id).await;

        result
    }

    /// Redemption body; the caller holds the user's redemption lock
    async fn redeem_locked(
        &self,
        user_id: Uuid,
        token: &str,
        new_password: &str,
    ) -> RecoveryResult<()> {
        match self.tokens.validate(user_id, token).await? {
            TokenValidation::Valid => {}
            TokenValidation::Expired => return Err(RecoveryError::Expired),
            TokenValidation::Mismatch => return Err(RecoveryError::Mismatch),
        }

        let password_hash =
            hash_password(new_password).map_err(|err| RecoveryError::Internal(err.to_string()))?;

        self.store.update_password(user_id, &password_hash).await?;
        self.invalidate_with_retry(user_id).await?;

        info!("Password reset completed for user {}", user_id);
        Ok(())
    }

    /// One redemption at a time per user
    async fn redemption_lock(&self, user_id: Uuid) -> Arc<Mutex<()>> {
        let mut locks = self.redeem_locks.lock().await;
        locks
            .entry(user_id)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Drop the user's lock entry once no other task holds it.
    ///
    /// Without this the map would keep an entry for every user id ever
    /// submitted for redemption. A strong count of one means only the
    /// map itself still references the lock; any waiter holds a clone,
    /// and clones are only taken under the map mutex held here.
    async fn discard_redemption_lock(&self, user_id: Uuid) {
        let mut locks = self.redeem_locks.lock().await;
        if let Some(entry) = locks.get(&user_id) {
            if Arc::strong_count(entry) == 1 {
                locks.remove(&user_id);
            }
        }
    }

    async fn invalidate_with_retry(&self, user_id: Uuid) -> RecoveryResult<()> {
        if let Err(first) = self.tokens.invalidate(user_id).await {
            warn!(
                "Clearing redeemed token for user {} failed, retrying: {}",
                user_id, first
            );
            self.tokens.invalidate(user_id).await?;
        }
        Ok(())
    }
}
