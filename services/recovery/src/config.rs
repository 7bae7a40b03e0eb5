//! Environment-derived configuration for the recovery service

use anyhow::Result;

/// Top-level configuration for the recovery service
#[derive(Debug, Clone)]
pub struct RecoveryConfig {
    /// Base URL reset links are built from
    pub reset_base_url: String,
    /// Address the HTTP server binds to
    pub bind_address: String,
    /// SMTP settings, present only when fully configured
    pub mailer: Option<MailerConfig>,
    /// SMS gateway settings, present only when fully configured
    pub sms: Option<SmsConfig>,
}

impl RecoveryConfig {
    /// Create a new RecoveryConfig from environment variables
    ///
    /// # Environment Variables
    /// - `RESET_BASE_URL`: base URL for reset links (required; startup fails without it)
    /// - `BIND_ADDRESS`: HTTP bind address (default: 0.0.0.0:3002)
    ///
    /// Transport settings come from [`MailerConfig::from_env`] and
    /// [`SmsConfig::from_env`]; a channel whose settings are incomplete
    /// falls back to the mock transport.
    pub fn from_env() -> Result<Self> {
        let reset_base_url = std::env::var("RESET_BASE_URL")
            .map_err(|_| anyhow::anyhow!("RESET_BASE_URL environment variable not set"))?;

        let bind_address =
            std::env::var("BIND_ADDRESS").unwrap_or_else(|_| "0.0.0.0:3002".to_string());

        Ok(RecoveryConfig {
            reset_base_url,
            bind_address,
            mailer: MailerConfig::from_env(),
            sms: SmsConfig::from_env(),
        })
    }
}

/// SMTP relay settings
#[derive(Debug, Clone)]
pub struct MailerConfig {
    /// Relay hostname
    pub host: String,
    /// Relay port
    pub port: u16,
    /// Relay login
    pub username: String,
    /// Relay password
    pub password: String,
    /// Sender address for outgoing mail
    pub from: String,
}

impl MailerConfig {
    /// Read SMTP settings, returning `None` unless every required
    /// variable is present
    ///
    /// # Environment Variables
    /// - `SMTP_HOST`: relay hostname
    /// - `SMTP_PORT`: relay port (default: 587)
    /// - `SMTP_USERNAME`: relay login
    /// - `SMTP_PASSWORD`: relay password
    /// - `SMTP_FROM`: sender address, e.g. `VitaTrack <no-reply@vitatrack.app>`
    pub fn from_env() -> Option<Self> {
        let host = std::env::var("SMTP_HOST").ok()?;
        let username = std::env::var("SMTP_USERNAME").ok()?;
        let password = std::env::var("SMTP_PASSWORD").ok()?;
        let from = std::env::var("SMTP_FROM").ok()?;

        let port = std::env::var("SMTP_PORT")
            .unwrap_or_else(|_| "587".to_string())
            .parse()
            .unwrap_or(587);

        Some(MailerConfig {
            host,
            port,
            username,
            password,
            from,
        })
    }
}

/// SMS gateway settings
#[derive(Debug, Clone)]
pub struct SmsConfig {
    /// Gateway message endpoint
    pub api_url: String,
    /// Bearer token for the gateway
    pub api_key: String,
    /// Sender number for outgoing messages
    pub from_number: String,
}

impl SmsConfig {
    /// Read SMS gateway settings, returning `None` unless every required
    /// variable is present
    ///
    /// # Environment Variables
    /// - `SMS_GATEWAY_URL`: gateway message endpoint
    /// - `SMS_API_KEY`: bearer token for the gateway
    /// - `SMS_FROM_NUMBER`: sender number for outgoing messages
    pub fn from_env() -> Option<Self> {
        let api_url = std::env::var("SMS_GATEWAY_URL").ok()?;
        let api_key = std::env::var("SMS_API_KEY").ok()?;
        let from_number = std::env::var("SMS_FROM_NUMBER").ok()?;

        Some(SmsConfig {
            api_url,
            api_key,
            from_number,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    const ALL_VARS: [&str; 10] = [
        "RESET_BASE_URL",
        "BIND_ADDRESS",
        "SMTP_HOST",
        "SMTP_PORT",
        "SMTP_USERNAME",
        "SMTP_PASSWORD",
        "SMTP_FROM",
        "SMS_GATEWAY_URL",
        "SMS_API_KEY",
        "SMS_FROM_NUMBER",
    ];

    fn clear_env() {
        for key in ALL_VARS {
            unsafe {
                std::env::remove_var(key);
            }
        }
    }

    #[test]
    #[serial]
    fn test_config_requires_base_url() {
        clear_env();

        assert!(RecoveryConfig::from_env().is_err());
    }

    #[test]
    #[serial]
    fn test_transports_default_to_unconfigured() {
        clear_env();
        unsafe {
            std::env::set_var("RESET_BASE_URL", "https://app.vitatrack.test");
        }

        let config = RecoveryConfig::from_env().unwrap();
        assert_eq!(config.reset_base_url, "https://app.vitatrack.test");
        assert_eq!(config.bind_address, "0.0.0.0:3002");
        assert!(config.mailer.is_none());
        assert!(config.sms.is_none());

        // Clean up
        clear_env();
    }

    #[test]
    #[serial]
    fn test_config_with_full_transport_settings() {
        clear_env();
        unsafe {
            std::env::set_var("RESET_BASE_URL", "https://app.vitatrack.test");
            std::env::set_var("BIND_ADDRESS", "127.0.0.1:4000");
            std::env::set_var("SMTP_HOST", "smtp.example.com");
            std::env::set_var("SMTP_PORT", "2525");
            std::env::set_var("SMTP_USERNAME", "mailer");
            std::env::set_var("SMTP_PASSWORD", "secret");
            std::env::set_var("SMTP_FROM", "VitaTrack <no-reply@vitatrack.app>");
            std::env::set_var("SMS_GATEWAY_URL", "https://sms.example.com/v1/messages");
            std::env::set_var("SMS_API_KEY", "gateway-key");
            std::env::set_var("SMS_FROM_NUMBER", "+15550100");
        }

        let config = RecoveryConfig::from_env().unwrap();
        assert_eq!(config.bind_address, "127.0.0.1:4000");

        let mailer = config.mailer.unwrap();
        assert_eq!(mailer.host, "smtp.example.com");
        assert_eq!(mailer.port, 2525);
        assert_eq!(mailer.from, "VitaTrack <no-reply@vitatrack.app>");

        let sms = config.sms.unwrap();
        assert_eq!(sms.api_url, "https://sms.example.com/v1/messages");
        assert_eq!(sms.from_number, "+15550100");

        // Clean up
        clear_env();
    }

    #[test]
    #[serial]
    fn test_partial_smtp_settings_are_ignored() {
        clear_env();
        unsafe {
            std::env::set_var("RESET_BASE_URL", "https://app.vitatrack.test");
            std::env::set_var("SMTP_HOST", "smtp.example.com");
        }

        let config = RecoveryConfig::from_env().unwrap();
        assert!(config.mailer.is_none());

        // Clean up
        clear_env();
    }
}
