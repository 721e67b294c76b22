//! HTTP route handlers for the functions service.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                              - Liveness check
//! GET  /health/ready                        - Readiness check (database)
//!
//! # Webhooks
//! POST /webhooks/stripe                     - Stripe events (signature verified)
//!
//! # Functions
//! POST /functions/send-order-email          - Send receipt + internal notification
//! POST /functions/newsletter-signup         - Subscribe, returns discount code
//! GET  /functions/newsletter-unsubscribe    - Unsubscribe link (?token=)
//! POST /functions/newsletter-unsubscribe    - Unsubscribe (query or JSON body)
//! ```

pub mod health;
pub mod newsletter;
pub mod order_email;
pub mod stripe_webhook;

use axum::{
    Router,
    routing::{get, post},
};

use crate::state::AppState;

/// Create the health routes router.
pub fn health_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(health::health))
        .route("/ready", get(health::readiness))
}

/// Create the webhook routes router.
pub fn webhook_routes() -> Router<AppState> {
    Router::new().route("/stripe", post(stripe_webhook::receive))
}

/// Create the function routes router.
pub fn function_routes() -> Router<AppState> {
    Router::new()
        .route("/send-order-email", post(order_email::send))
        .route("/newsletter-signup", post(newsletter::signup))
        .route(
            "/newsletter-unsubscribe",
            get(newsletter::unsubscribe_link).post(newsletter::unsubscribe_post),
        )
}

/// Build all routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .nest("/health", health_routes())
        .nest("/webhooks", webhook_routes())
        .nest("/functions", function_routes())
}
