use anyhow::Result;
use tracing::{Level, info, warn};
use tracing_subscriber::FmtSubscriber;

mod config;
mod error;
mod models;
mod notify;
mod password;
mod recovery;
mod routes;
mod store;
mod token;
mod validation;

use std::sync::Arc;

use common::database::{self, DatabaseConfig};

use crate::config::RecoveryConfig;
use crate::notify::email::SmtpResetSender;
use crate::notify::sms::SmsGatewaySender;
use crate::notify::{Channel, MockSender, Notifier, ResetSender};
use crate::recovery::RecoveryService;
use crate::store::CredentialStore;
use crate::store::memory::MemoryCredentialStore;
use crate::store::postgres::PgCredentialStore;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub recovery: RecoveryService,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .finish();

    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    info!("Starting recovery service");

    let config = RecoveryConfig::from_env()?;

    // Pick the credential store once; the choice holds for the whole
    // process lifetime, there is no mid-session failover.
    let store = select_store().await?;

    let notifier = build_notifier(&config)?;
    let recovery = RecoveryService::new(store, notifier);

    let app_state = AppState { recovery };

    // Start the web server
    let app = routes::create_router(app_state);

    let listener = tokio::net::TcpListener::bind(&config.bind_address).await?;
    info!("Recovery service listening on {}", config.bind_address);

    axum::serve(listener, app).await?;

    Ok(())
}

/// Connect to PostgreSQL when it is reachable, otherwise fall back to
/// the seeded in-memory store
async fn select_store() -> Result<Arc<dyn CredentialStore>> {
    let db_config = DatabaseConfig::from_env()?;

    match database::init_pool(&db_config).await {
        Ok(pool) => match database::health_check(&pool).await {
            Ok(()) => {
                let store = PgCredentialStore::new(pool);
                store.ensure_schema().await?;
                info!("Credential store: postgres (durable)");
                return Ok(Arc::new(store));
            }
            Err(err) => {
                warn!(
                    "Database pool unhealthy at startup ({}), using the in-memory fallback store",
                    err
                );
            }
        },
        Err(err) => {
            warn!(
                "Database unavailable at startup ({}), using the in-memory fallback store",
                err
            );
        }
    }

    info!("Credential store: in-memory (fallback)");
    Ok(Arc::new(MemoryCredentialStore::seeded()?))
}

/// Wire one sender per channel: real transports when their credentials
/// are configured, mock transports otherwise
fn build_notifier(config: &RecoveryConfig) -> Result<Notifier> {
    let email: Arc<dyn ResetSender> = match &config.mailer {
        Some(mailer) => {
            info!("Email transport: smtp relay {}", mailer.host);
            Arc::new(SmtpResetSender::new(mailer)?)
        }
        None => {
            warn!("SMTP not configured, using the mock email transport");
            Arc::new(MockSender::new(Channel::Email))
        }
    };

    let sms: Arc<dyn ResetSender> = match &config.sms {
        Some(sms) => {
            info!("SMS transport: gateway {}", sms.api_url);
            Arc::new(SmsGatewaySender::new(sms))
        }
        None => {
            warn!("SMS gateway not configured, using the mock sms transport");
            Arc::new(MockSender::new(Channel::Sms))
        }
    };

    Ok(Notifier::new(config.reset_base_url.clone(), email, sms))
}
