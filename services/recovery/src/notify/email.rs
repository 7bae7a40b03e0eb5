//! Real email delivery over SMTP

use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use tracing::{error, info};

use crate::config::MailerConfig;
use crate::notify::{Channel, DeliveryResult, ResetSender};

/// Email transport backed by an authenticated STARTTLS relay
pub struct SmtpResetSender {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpResetSender {
    /// Build the transport from SMTP settings.
    ///
    /// Fails when the relay host is unusable or the configured sender
    /// address does not parse as a mailbox.
    pub fn new(config: &MailerConfig) -> anyhow::Result<Self> {
        let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)?
            .port(config.port)
            .credentials(Credentials::new(
                config.username.clone(),
                config.password.clone(),
            ))
            .build();
        let from = config.from.parse::<Mailbox>()?;

        Ok(Self { transport, from })
    }

    fn build_message(
        &self,
        recipient: &str,
        name: &str,
        reset_link: &str,
    ) -> anyhow::Result<Message> {
        let body = format!(
            "Hi {name},\n\n\
             We received a request to reset your VitaTrack password.\n\
             Open the link below within 10 minutes to choose a new one:\n\n\
             {reset_link}\n\n\
             If you did not request this, you can ignore this message."
        );

        let message = Message::builder()
            .from(self.from.clone())
            .to(recipient.parse::<Mailbox>()?)
            .subject("Reset your VitaTrack password")
            .header(ContentType::TEXT_PLAIN)
            .body(body)?;

        Ok(message)
    }
}

#[async_trait]
impl ResetSender for SmtpResetSender {
    async fn send_password_reset(
        &self,
        recipient: &str,
        name: &str,
        reset_link: &str,
    ) -> DeliveryResult {
        let message = match self.build_message(recipient, name, reset_link) {
            Ok(message) => message,
            Err(err) => {
                error!("Could not build reset email for {}: {}", recipient, err);
                return DeliveryResult::failed(Channel::Email, err.to_string());
            }
        };

        match self.transport.send(message).await {
            Ok(response) => {
                info!("Reset email accepted by relay for {}", recipient);
                DeliveryResult::delivered(Channel::Email, format!("smtp-{}", response.code()))
            }
            Err(err) => {
                error!("SMTP delivery to {} failed: {}", recipient, err);
                DeliveryResult::failed(Channel::Email, err.to_string())
            }
        }
    }
}
