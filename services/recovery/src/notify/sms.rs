//! SMS delivery through an HTTP gateway

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{error, info};
use uuid::Uuid;

use crate::config::SmsConfig;
use crate::notify::{Channel, DeliveryResult, ResetSender};

#[derive(Serialize)]
struct SmsRequest<'a> {
    to: &'a str,
    from: &'a str,
    body: String,
}

#[derive(Deserialize)]
struct SmsResponse {
    id: Option<String>,
}

/// SMS transport that posts messages to a bearer-authenticated gateway
pub struct SmsGatewaySender {
    http: reqwest::Client,
    api_url: String,
    api_key: String,
    from_number: String,
}

impl SmsGatewaySender {
    pub fn new(config: &SmsConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_url: config.api_url.clone(),
            api_key: config.api_key.clone(),
            from_number: config.from_number.clone(),
        }
    }
}

#[async_trait]
impl ResetSender for SmsGatewaySender {
    async fn send_password_reset(
        &self,
        recipient: &str,
        name: &str,
        reset_link: &str,
    ) -> DeliveryResult {
        let payload = SmsRequest {
            to: recipient,
            from: &self.from_number,
            body: format!(
                "Hi {name}, reset your VitaTrack password within 10 minutes: {reset_link}"
            ),
        };

        let response = match self
            .http
            .post(&self.api_url)
            .bearer_auth(&self.api_key)
            .json(&payload)
            .send()
            .await
        {
            Ok(response) => response,
            Err(err) => {
                error!("SMS gateway unreachable for {}: {}", recipient, err);
                return DeliveryResult::failed(Channel::Sms, err.to_string());
            }
        };

        let status = response.status();
        if !status.is_success() {
            error!("SMS gateway rejected message to {}: {}", recipient, status);
            return DeliveryResult::failed(
                Channel::Sms,
                format!("gateway returned {status}"),
            );
        }

        // Gateways differ in response shape; fall back to a local
        // reference when no message id comes back.
        let reference = match response.json::<SmsResponse>().await {
            Ok(body) => body.id.unwrap_or_else(|| format!("sms-{}", Uuid::new_v4())),
            Err(_) => format!("sms-{}", Uuid::new_v4()),
        };

        info!("Reset SMS accepted by gateway for {}", recipient);
        DeliveryResult::delivered(Channel::Sms, reference)
    }
}
