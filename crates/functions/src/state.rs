//! Application state shared across handlers.

use std::sync::Arc;

use secrecy::SecretString;
use sqlx::PgPool;

use crate::config::FunctionsConfig;
use crate::db::{
    OrderStore, PgOrderStore, PgSubscriberStore, PgWebhookEventStore, SubscriberStore,
    WebhookEventStore,
};
use crate::services::email::{EmailError, Mailer, ResendMailer};
use crate::services::{CheckoutService, NewsletterService, OrderNotifier};
use crate::stripe::{LineItemSource, StripeClient, StripeError};

/// Error building the application state.
#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("stripe client: {0}")]
    Stripe(#[from] StripeError),
    #[error("email client: {0}")]
    Email(#[from] EmailError),
}

/// Stores and clients the services are built from.
///
/// Production wires the Postgres stores and HTTP clients; tests swap in
/// in-memory implementations.
#[derive(Clone)]
pub struct Dependencies {
    pub orders: Arc<dyn OrderStore>,
    pub events: Arc<dyn WebhookEventStore>,
    pub subscribers: Arc<dyn SubscriberStore>,
    pub mailer: Arc<dyn Mailer>,
    pub line_items: Arc<dyn LineItemSource>,
}

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to
/// the services and the webhook signing secret.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    pool: Option<PgPool>,
    webhook_secret: SecretString,
    checkout: CheckoutService,
    notifier: OrderNotifier,
    newsletter: NewsletterService,
}

impl AppState {
    /// Create the production state backed by `PostgreSQL`, Stripe and Resend.
    ///
    /// # Errors
    ///
    /// Returns an error if an HTTP client cannot be built from the configured keys.
    pub fn new(config: &FunctionsConfig, pool: PgPool) -> Result<Self, StateError> {
        let dependencies = Dependencies {
            orders: Arc::new(PgOrderStore::new(pool.clone())),
            events: Arc::new(PgWebhookEventStore::new(pool.clone())),
            subscribers: Arc::new(PgSubscriberStore::new(pool.clone())),
            mailer: Arc::new(ResendMailer::new(&config.email.resend_api_key)?),
            line_items: Arc::new(StripeClient::new(&config.stripe.secret_key)?),
        };

        Ok(Self::with_dependencies(config, dependencies, Some(pool)))
    }

    /// Create state from explicit dependencies.
    ///
    /// Without a pool the readiness probe reports the service as not ready.
    #[must_use]
    pub fn with_dependencies(
        config: &FunctionsConfig,
        dependencies: Dependencies,
        pool: Option<PgPool>,
    ) -> Self {
        let from_address = config.email.from_address.as_str().to_string();
        let support_address = config.email.support_address.as_str().to_string();

        let notifier = OrderNotifier::new(
            Arc::clone(&dependencies.orders),
            Arc::clone(&dependencies.mailer),
            from_address.clone(),
            support_address,
        );

        let checkout = CheckoutService::new(
            dependencies.orders,
            dependencies.events,
            dependencies.line_items,
            notifier.clone(),
        );

        let newsletter = NewsletterService::new(
            dependencies.subscribers,
            dependencies.mailer,
            from_address,
            config.app_url.clone(),
        );

        Self {
            inner: Arc::new(AppStateInner {
                pool,
                webhook_secret: config.stripe.webhook_secret.clone(),
                checkout,
                notifier,
                newsletter,
            }),
        }
    }

    /// Database pool, when running against `PostgreSQL`.
    #[must_use]
    pub fn pool(&self) -> Option<&PgPool> {
        self.inner.pool.as_ref()
    }

    /// Secret used to verify Stripe webhook signatures.
    #[must_use]
    pub fn webhook_secret(&self) -> &SecretString {
        &self.inner.webhook_secret
    }

    #[must_use]
    pub fn checkout(&self) -> &CheckoutService {
        &self.inner.checkout
    }

    #[must_use]
    pub fn notifier(&self) -> &OrderNotifier {
        &self.inner.notifier
    }

    #[must_use]
    pub fn newsletter(&self) -> &NewsletterService {
        &self.inner.newsletter
    }
}
