//! Reset token lifecycle: issuance, validation and single-use invalidation

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use rand::rngs::OsRng;
use rand::RngCore;
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;
use tracing::debug;
use uuid::Uuid;

use crate::store::{CredentialStore, StoreResult};

/// Token lifetime. Tokens are short-lived by design and there is no
/// way to extend one; a fresh request replaces it instead.
const TOKEN_TTL_MINUTES: i64 = 10;

/// Raw token length in bytes before hex encoding. 32 bytes of OS
/// randomness is well past the 128-bit floor for guessing resistance.
const TOKEN_BYTES: usize = 32;

/// Outcome of checking a supplied token against the stored one
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenValidation {
    /// Token matches and is still within its validity window
    Valid,
    /// A token was pending but its expiry has passed
    Expired,
    /// No pending token, or the supplied value does not match
    Mismatch,
}

/// A freshly issued token along with its expiry instant
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

/// Issues and checks password reset tokens against the credential store
#[derive(Clone)]
pub struct TokenService {
    store: Arc<dyn CredentialStore>,
}

impl TokenService {
    pub fn new(store: Arc<dyn CredentialStore>) -> Self {
        Self { store }
    }

    /// Generate a fresh token for the user and persist it with its expiry.
    ///
    /// Any previously pending token for the user is overwritten, which
    /// is also how stale expired tokens get cleaned up.
    pub async fn issue(&self, user_id: Uuid) -> StoreResult<IssuedToken> {
        let token = generate_token();
        let expires_at = Utc::now() + Duration::minutes(TOKEN_TTL_MINUTES);

        self.store
            .set_reset_token(user_id, &token, expires_at)
            .await?;

        let issued = IssuedToken { token, expires_at };
        debug!(
            "Issued reset token for user {} valid until {}",
            user_id, issued.expires_at
        );
        Ok(issued)
    }

    /// Check a supplied token against the user's pending one.
    ///
    /// Expiry is checked before the token value, so an outdated token
    /// reports `Expired` even when its value would no longer match.
    /// The value comparison itself runs in constant time.
    pub async fn validate(&self, user_id: Uuid, supplied: &str) -> StoreResult<TokenValidation> {
        let user = match self.store.find_by_id(user_id).await? {
            Some(user) => user,
            None => return Ok(TokenValidation::Mismatch),
        };

        if !user.active {
            return Ok(TokenValidation::Mismatch);
        }

        let (stored, expiry) = match (user.reset_token.as_deref(), user.reset_token_expiry) {
            (Some(stored), Some(expiry)) => (stored, expiry),
            _ => return Ok(TokenValidation::Mismatch),
        };

        if expiry < Utc::now() {
            return Ok(TokenValidation::Expired);
        }

        if constant_time_eq(stored, supplied) {
            Ok(TokenValidation::Valid)
        } else {
            Ok(TokenValidation::Mismatch)
        }
    }

    /// Clear the user's pending token so it can never be redeemed again
    pub async fn invalidate(&self, user_id: Uuid) -> StoreResult<()> {
        self.store.clear_reset_token(user_id).await
    }
}

/// Hex-encoded token from OS randomness
fn generate_token() -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// Compare two token strings without leaking where they diverge.
///
/// Both sides are digested first so the comparison also does not leak
/// the stored token's length.
fn constant_time_eq(a: &str, b: &str) -> bool {
    let a_digest = Sha256::digest(a.as_bytes());
    let b_digest = Sha256::digest(b.as_bytes());
    a_digest.ct_eq(&b_digest).into()
}
