//! Printful fulfillment API client.
//!
//! Read-only access to the store's sync products and the Printful catalog.
//! Every request is followed by a fixed pause to stay under Printful's
//! 120 requests/minute limit.

pub mod client;
pub mod types;

use thiserror::Error;

pub use client::{PrintfulClient, REQUEST_DELAY};
pub use types::{CatalogVariant, SyncProduct, SyncProductDetail, SyncVariant, SyncVariantFile};

/// Errors that can occur when interacting with the Printful API.
#[derive(Debug, Error)]
pub enum PrintfulError {
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

impl PrintfulError {
    /// Whether Printful reported the resource as missing.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::Api { status: 404, .. })
    }
}
