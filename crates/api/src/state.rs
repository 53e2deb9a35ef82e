//! Application state shared across handlers.

use std::sync::Arc;

use sqlx::PgPool;

use crate::config::ApiConfig;
use crate::services::auth::TokenService;
use crate::services::email::EmailService;
use crate::services::invoice::InvoiceHeader;
use crate::services::whatsapp::WhatsAppClient;

/// Error building the application state.
#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("invalid SMTP relay: {0}")]
    Smtp(#[from] lettre::transport::smtp::Error),
}

/// Application state shared across all handlers.
///
/// Cheaply cloneable via `Arc`. Background notification tasks hold their
/// own clone, so they outlive the request that spawned them.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: ApiConfig,
    pool: PgPool,
    email: EmailService,
    whatsapp: Option<WhatsAppClient>,
    tokens: TokenService,
    invoice_header: InvoiceHeader,
}

impl AppState {
    /// Create a new application state.
    ///
    /// # Errors
    ///
    /// Returns an error if the SMTP relay settings are invalid.
    pub fn new(config: ApiConfig, pool: PgPool) -> Result<Self, StateError> {
        let email = EmailService::new(&config.email)?;
        let whatsapp = config.whatsapp.as_ref().map(WhatsAppClient::new);
        let tokens = TokenService::new(&config.jwt);
        let invoice_header = InvoiceHeader::from_config(&config.email);

        if whatsapp.is_none() {
            tracing::info!("WhatsApp notifications disabled (Twilio not configured)");
        }

        Ok(Self {
            inner: Arc::new(AppStateInner {
                config,
                pool,
                email,
                whatsapp,
                tokens,
                invoice_header,
            }),
        })
    }

    #[must_use]
    pub fn config(&self) -> &ApiConfig {
        &self.inner.config
    }

    /// Get a reference to the database connection pool.
    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.inner.pool
    }

    #[must_use]
    pub fn email(&self) -> &EmailService {
        &self.inner.email
    }

    /// The Twilio client, if WhatsApp notices are configured.
    #[must_use]
    pub fn whatsapp(&self) -> Option<&WhatsAppClient> {
        self.inner.whatsapp.as_ref()
    }

    #[must_use]
    pub fn tokens(&self) -> &TokenService {
        &self.inner.tokens
    }

    #[must_use]
    pub fn invoice_header(&self) -> &InvoiceHeader {
        &self.inner.invoice_header
    }
}
