//! Stripe REST client.
//!
//! Webhook payloads do not embed line items, so the checkout handler fetches
//! them here using the secret key.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue};
use secrecy::{ExposeSecret, SecretString};

use super::StripeError;
use super::types::{LineItem, List};

/// Stripe API base URL.
const BASE_URL: &str = "https://api.stripe.com";

/// Page size for list requests (Stripe's maximum).
const PAGE_SIZE: u32 = 100;

/// Source of a checkout session's line items.
#[async_trait]
pub trait LineItemSource: Send + Sync {
    async fn line_items(&self, session_id: &str) -> Result<Vec<LineItem>, StripeError>;
}

/// Stripe API client.
#[derive(Clone)]
pub struct StripeClient {
    client: reqwest::Client,
    base_url: String,
}

impl StripeClient {
    /// Create a new Stripe API client.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client fails to build.
    pub fn new(secret_key: &SecretString) -> Result<Self, StripeError> {
        Self::with_base_url(secret_key, BASE_URL)
    }

    /// Create a client against a different host (stripe-mock, tests).
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client fails to build.
    pub fn with_base_url(secret_key: &SecretString, base_url: &str) -> Result<Self, StripeError> {
        let mut headers = HeaderMap::new();

        let auth_value = format!("Bearer {}", secret_key.expose_secret());
        headers.insert(
            "Authorization",
            HeaderValue::from_str(&auth_value)
                .map_err(|e| StripeError::Parse(format!("Invalid API key format: {e}")))?,
        );

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    async fn line_items_page(
        &self,
        session_id: &str,
        starting_after: Option<&str>,
    ) -> Result<List<LineItem>, StripeError> {
        let url = format!(
            "{}/v1/checkout/sessions/{session_id}/line_items",
            self.base_url
        );
        let limit = PAGE_SIZE.to_string();
        let mut query = vec![("limit", limit.as_str())];
        if let Some(cursor) = starting_after {
            query.push(("starting_after", cursor));
        }

        let response = self.client.get(&url).query(&query).send().await?;
        let status = response.status();

        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(StripeError::Api {
                status: status.as_u16(),
                message,
            });
        }

        response
            .json()
            .await
            .map_err(|e| StripeError::Parse(e.to_string()))
    }
}

#[async_trait]
impl LineItemSource for StripeClient {
    #[tracing::instrument(skip(self))]
    async fn line_items(&self, session_id: &str) -> Result<Vec<LineItem>, StripeError> {
        let mut items = Vec::new();
        let mut cursor: Option<String> = None;

        loop {
            let page = self.line_items_page(session_id, cursor.as_deref()).await?;
            let next = page.data.last().and_then(|item| item.id.clone());
            items.extend(page.data);

            match next {
                Some(id) if page.has_more => cursor = Some(id),
                _ => break,
            }
        }

        tracing::debug!(count = items.len(), "Fetched checkout line items");
        Ok(items)
    }
}
