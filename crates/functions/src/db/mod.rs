//! Database operations for the shop `PostgreSQL` schema.
//!
//! # Schema: `shop`
//!
//! ## Tables
//!
//! - `products`, `product_variants`, `product_images` - Catalog mirrored from Printful
//! - `orders`, `order_items` - Orders recorded from Stripe checkout
//! - `newsletter_subscribers` - Signups with their welcome discount codes
//! - `webhook_events` - Processed webhook ids for idempotency
//!
//! # Access
//!
//! HTTP handlers never touch a pool directly. They go through the store
//! traits below, which have Postgres implementations here and in-memory
//! implementations in the integration tests. The CLI uses the concrete
//! [`CatalogRepository`].
//!
//! # Migrations
//!
//! Migrations are stored in `crates/functions/migrations/` and run via:
//! ```bash
//! cargo run -p reform-shop-cli -- migrate
//! ```
//!
//! Queries are built at runtime with `sqlx::query_as` so the crate builds
//! without a live database or offline query metadata.

pub mod catalog;
pub mod newsletter;
pub mod orders;
pub mod webhook_events;

use std::time::Duration;

use async_trait::async_trait;
use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;
use uuid::Uuid;

use reform_shop_core::{Email, OrderId, SubscriberId};

use crate::models::{NewOrder, NewOrderItem, NewSubscriber, Order, OrderItem, Subscriber};

pub use catalog::CatalogRepository;
pub use newsletter::PgSubscriberStore;
pub use orders::PgOrderStore;
pub use webhook_events::PgWebhookEventStore;

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation (e.g., unique email).
    #[error("constraint violation: {0}")]
    Conflict(String),
}

impl RepositoryError {
    /// Map a unique-constraint violation to `Conflict`, anything else to `Database`.
    pub(crate) fn from_insert(e: sqlx::Error, what: &str) -> Self {
        if let sqlx::Error::Database(ref db_err) = e
            && db_err.is_unique_violation()
        {
            return Self::Conflict(format!("{what} already exists"));
        }
        Self::Database(e)
    }
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}

/// Order persistence.
#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Insert an order and all of its items atomically.
    ///
    /// Returns `Conflict` if an order for the same Stripe session exists.
    async fn create_order(
        &self,
        order: NewOrder,
        items: Vec<NewOrderItem>,
    ) -> Result<(Order, Vec<OrderItem>), RepositoryError>;

    async fn get_order(&self, id: OrderId) -> Result<Option<Order>, RepositoryError>;

    async fn order_items(&self, id: OrderId) -> Result<Vec<OrderItem>, RepositoryError>;

    async fn find_by_session(&self, session_id: &str) -> Result<Option<Order>, RepositoryError>;
}

/// Result of claiming a webhook event id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventClaim {
    /// First delivery of this event.
    New,
    /// Seen before but never completed; process it again.
    Retry,
    /// Already handled successfully.
    AlreadyProcessed,
}

/// Webhook idempotency ledger.
#[async_trait]
pub trait WebhookEventStore: Send + Sync {
    async fn claim(
        &self,
        event_id: &str,
        source: &str,
        event_type: &str,
    ) -> Result<EventClaim, RepositoryError>;

    async fn mark_processed(&self, event_id: &str) -> Result<(), RepositoryError>;

    async fn mark_failed(&self, event_id: &str, error: &str) -> Result<(), RepositoryError>;
}

/// Newsletter subscriber persistence.
#[async_trait]
pub trait SubscriberStore: Send + Sync {
    async fn find_by_email(&self, email: &Email) -> Result<Option<Subscriber>, RepositoryError>;

    /// Returns `Conflict` if the email is already present.
    async fn insert(&self, subscriber: NewSubscriber) -> Result<Subscriber, RepositoryError>;

    async fn reactivate(&self, id: SubscriberId) -> Result<Subscriber, RepositoryError>;

    async fn mark_welcome_sent(&self, id: SubscriberId) -> Result<(), RepositoryError>;

    async fn find_by_token(&self, token: Uuid) -> Result<Option<Subscriber>, RepositoryError>;

    async fn deactivate(&self, id: SubscriberId) -> Result<Subscriber, RepositoryError>;
}
