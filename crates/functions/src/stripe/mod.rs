//! Stripe integration: webhook verification, event payloads and the
//! line-item API.

pub mod client;
pub mod signature;
pub mod types;

use thiserror::Error;

pub use client::{LineItemSource, StripeClient};
pub use signature::{
    SIGNATURE_HEADER, SignatureError, TOLERANCE_SECS, signature_header, verify_signature,
};
pub use types::{CHECKOUT_SESSION_COMPLETED, CheckoutSession, CustomerDetails, Event, LineItem};

/// Errors that can occur when calling the Stripe API.
#[derive(Debug, Error)]
pub enum StripeError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// API returned an error response.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// Failed to parse response.
    #[error("Parse error: {0}")]
    Parse(String),
}
