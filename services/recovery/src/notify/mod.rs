//! Notification dispatch for password reset messages
//!
//! A `ResetSender` is one delivery transport (SMTP, SMS gateway, or the
//! mock used when no credentials are configured). The `Notifier` owns one
//! sender per channel, builds the reset link and routes each message to
//! the right transport.

pub mod email;
pub mod sms;

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::info;
use uuid::Uuid;

use crate::validation::normalize_phone;

/// Delivery channel requested by the user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    Email,
    Sms,
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Channel::Email => write!(f, "email"),
            Channel::Sms => write!(f, "sms"),
        }
    }
}

/// Outcome of one delivery attempt
#[derive(Debug, Clone)]
pub struct DeliveryResult {
    pub success: bool,
    pub channel: Channel,
    /// Provider-side message id when the transport reports one
    pub provider_reference: Option<String>,
    pub error: Option<String>,
}

impl DeliveryResult {
    pub fn delivered(channel: Channel, reference: impl Into<String>) -> Self {
        Self {
            success: true,
            channel,
            provider_reference: Some(reference.into()),
            error: None,
        }
    }

    pub fn failed(channel: Channel, error: impl Into<String>) -> Self {
        Self {
            success: false,
            channel,
            provider_reference: None,
            error: Some(error.into()),
        }
    }
}

/// One transport capable of delivering a password reset message.
///
/// Transports never return `Err`; provider failures are absorbed into
/// a `DeliveryResult` with `success == false` so every attempt yields
/// a reportable outcome.
#[async_trait]
pub trait ResetSender: Send + Sync {
    async fn send_password_reset(
        &self,
        recipient: &str,
        name: &str,
        reset_link: &str,
    ) -> DeliveryResult;
}

/// A message captured by the mock transport
#[derive(Debug, Clone)]
pub struct MockDelivery {
    pub recipient: String,
    pub name: String,
    pub reset_link: String,
}

/// Transport used when no real credentials are configured.
///
/// Logs the full message and records it in an in-memory outbox so local
/// runs and tests can inspect what would have been sent. Always reports
/// success with a synthesized reference.
pub struct MockSender {
    channel: Channel,
    outbox: Arc<Mutex<Vec<MockDelivery>>>,
}

impl MockSender {
    pub fn new(channel: Channel) -> Self {
        Self {
            channel,
            outbox: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Snapshot of everything this transport has recorded
    pub async fn sent(&self) -> Vec<MockDelivery> {
        self.outbox.lock().await.clone()
    }
}

#[async_trait]
impl ResetSender for MockSender {
    async fn send_password_reset(
        &self,
        recipient: &str,
        name: &str,
        reset_link: &str,
    ) -> DeliveryResult {
        info!(
            "[mock {}] password reset for {} <{}>: {}",
            self.channel, name, recipient, reset_link
        );

        self.outbox.lock().await.push(MockDelivery {
            recipient: recipient.to_string(),
            name: name.to_string(),
            reset_link: reset_link.to_string(),
        });

        DeliveryResult::delivered(self.channel, format!("mock-{}", Uuid::new_v4()))
    }
}

/// Routes reset messages to the per-channel transports
#[derive(Clone)]
pub struct Notifier {
    base_url: String,
    email: Arc<dyn ResetSender>,
    sms: Arc<dyn ResetSender>,
}

impl Notifier {
    pub fn new(base_url: String, email: Arc<dyn ResetSender>, sms: Arc<dyn ResetSender>) -> Self {
        Self {
            base_url,
            email,
            sms,
        }
    }

    /// Reset link the recipient will follow, with the raw token as a
    /// query parameter
    pub fn reset_link(&self, token: &str) -> String {
        format!(
            "{}/reset-password?token={}",
            self.base_url.trim_end_matches('/'),
            token
        )
    }

    /// Deliver a reset message over the requested channel.
    ///
    /// SMS recipients are normalized before the transport sees them so
    /// gateway calls always carry the `+`-prefixed form.
    pub async fn send_reset(
        &self,
        channel: Channel,
        recipient: &str,
        name: &str,
        token: &str,
    ) -> DeliveryResult {
        let reset_link = self.reset_link(token);
        match channel {
            Channel::Email => {
                self.email
                    .send_password_reset(recipient, name, &reset_link)
                    .await
            }
            Channel::Sms => {
                let recipient = normalize_phone(recipient);
                self.sms
                    .send_password_reset(&recipient, name, &reset_link)
                    .await
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mock_notifier(base_url: &str) -> (Notifier, Arc<MockSender>, Arc<MockSender>) {
        let email = Arc::new(MockSender::new(Channel::Email));
        let sms = Arc::new(MockSender::new(Channel::Sms));
        let notifier = Notifier::new(
            base_url.to_string(),
            email.clone() as Arc<dyn ResetSender>,
            sms.clone() as Arc<dyn ResetSender>,
        );
        (notifier, email, sms)
    }

    #[test]
    fn test_reset_link_joins_base_and_token() {
        let (notifier, _, _) = mock_notifier("https://app.vitatrack.test");
        assert_eq!(
            notifier.reset_link("abc123"),
            "https://app.vitatrack.test/reset-password?token=abc123"
        );
    }

    #[test]
    fn test_reset_link_tolerates_trailing_slash() {
        let (notifier, _, _) = mock_notifier("https://app.vitatrack.test/");
        assert_eq!(
            notifier.reset_link("abc123"),
            "https://app.vitatrack.test/reset-password?token=abc123"
        );
    }

    #[tokio::test]
    async fn test_mock_sender_records_and_succeeds() {
        let sender = MockSender::new(Channel::Email);
        let result = sender
            .send_password_reset("taylor@example.com", "Taylor", "https://x/reset")
            .await;

        assert!(result.success);
        assert_eq!(result.channel, Channel::Email);
        assert!(result.provider_reference.as_deref().is_some_and(|r| !r.is_empty()));
        assert!(result.error.is_none());

        let sent = sender.sent().await;
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].recipient, "taylor@example.com");
    }

    #[tokio::test]
    async fn test_sms_recipients_are_normalized_before_the_transport() {
        let (notifier, _, sms) = mock_notifier("https://app.vitatrack.test");

        notifier
            .send_reset(Channel::Sms, "49 170 555 0100", "Taylor", "tok")
            .await;
        notifier
            .send_reset(Channel::Sms, "+491705550100", "Taylor", "tok")
            .await;

        let sent = sms.sent().await;
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[0].recipient, "+491705550100");
        assert_eq!(sent[1].recipient, "+491705550100");
    }

    #[tokio::test]
    async fn test_email_channel_routes_to_the_email_sender() {
        let (notifier, email, sms) = mock_notifier("https://app.vitatrack.test");

        let result = notifier
            .send_reset(Channel::Email, "taylor@example.com", "Taylor", "tok")
            .await;

        assert!(result.success);
        assert_eq!(email.sent().await.len(), 1);
        assert!(sms.sent().await.is_empty());
    }
}
