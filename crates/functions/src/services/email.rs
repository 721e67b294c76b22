//! Transactional email over the Resend HTTP API.
//!
//! Messages are rendered from Askama HTML templates and handed to a
//! [`Mailer`]. Production uses [`ResendMailer`]; tests substitute a
//! recording implementation.

use askama::Template;
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Resend API base URL.
const BASE_URL: &str = "https://api.resend.com";

/// Errors that can occur when sending email.
#[derive(Debug, Error)]
pub enum EmailError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Resend rejected the message.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// Template rendering error.
    #[error("Template error: {0}")]
    Template(#[from] askama::Error),

    /// Failed to build the client or parse a response.
    #[error("Parse error: {0}")]
    Parse(String),
}

/// A rendered message ready to send.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutgoingEmail {
    pub to: String,
    pub from: String,
    pub subject: String,
    pub html: String,
}

/// Provider receipt for a sent message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SentEmail {
    pub id: String,
}

/// Anything that can deliver an [`OutgoingEmail`].
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, email: &OutgoingEmail) -> Result<SentEmail, EmailError>;
}

/// [`Mailer`] backed by Resend.
#[derive(Clone)]
pub struct ResendMailer {
    client: reqwest::Client,
    base_url: String,
}

impl ResendMailer {
    /// Create a new Resend mailer.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client fails to build.
    pub fn new(api_key: &SecretString) -> Result<Self, EmailError> {
        Self::with_base_url(api_key, BASE_URL)
    }

    /// Create a mailer against another host (tests).
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client fails to build.
    pub fn with_base_url(api_key: &SecretString, base_url: &str) -> Result<Self, EmailError> {
        let mut headers = HeaderMap::new();

        let auth_value = format!("Bearer {}", api_key.expose_secret());
        headers.insert(
            "Authorization",
            HeaderValue::from_str(&auth_value)
                .map_err(|e| EmailError::Parse(format!("Invalid API key format: {e}")))?,
        );

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl Mailer for ResendMailer {
    async fn send(&self, email: &OutgoingEmail) -> Result<SentEmail, EmailError> {
        let url = format!("{}/emails", self.base_url);
        let response = self.client.post(&url).json(email).send().await?;
        let status = response.status();

        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            tracing::warn!(
                to = %email.to,
                status = status.as_u16(),
                "Resend rejected email"
            );
            return Err(EmailError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let sent: SentEmail = response
            .json()
            .await
            .map_err(|e| EmailError::Parse(e.to_string()))?;

        tracing::info!(to = %email.to, subject = %email.subject, id = %sent.id, "Email sent successfully");
        Ok(sent)
    }
}

// =============================================================================
// Templates
// =============================================================================

/// One row of an order's item table, pre-formatted.
#[derive(Debug, Clone)]
pub struct ItemLine {
    pub name: String,
    pub quantity: i32,
    pub unit_price: String,
    pub line_total: String,
}

/// Customer receipt.
#[derive(Template)]
#[template(path = "email/order_confirmation.html")]
pub struct OrderConfirmationEmail<'a> {
    pub readable_order_id: &'a str,
    pub greeting_name: &'a str,
    pub items: &'a [ItemLine],
    pub subtotal: &'a str,
    pub shipping: &'a str,
    pub total: &'a str,
    pub shipping_lines: &'a [String],
    pub support_email: &'a str,
}

/// Internal new-order notification.
#[derive(Template)]
#[template(path = "email/order_notification.html")]
pub struct OrderNotificationEmail<'a> {
    pub readable_order_id: &'a str,
    pub order_id: &'a str,
    pub customer_email: &'a str,
    pub customer_name: Option<&'a str>,
    pub placed_at: &'a str,
    pub items: &'a [ItemLine],
    pub total: &'a str,
    pub shipping_lines: &'a [String],
}

/// Newsletter welcome with the discount code.
#[derive(Template)]
#[template(path = "email/newsletter_welcome.html")]
pub struct NewsletterWelcomeEmail<'a> {
    pub email: &'a str,
    pub discount_code: &'a str,
    pub discount_percent: i32,
    pub shop_url: &'a str,
    pub unsubscribe_url: &'a str,
}

/// Confirmation after unsubscribing.
#[derive(Template)]
#[template(path = "email/unsubscribe_confirmation.html")]
pub struct UnsubscribeConfirmationEmail<'a> {
    pub email: &'a str,
    pub shop_url: &'a str,
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    fn lines() -> Vec<ItemLine> {
        vec![ItemLine {
            name: "Reform Hoodie <Navy>".to_string(),
            quantity: 2,
            unit_price: "£39.99".to_string(),
            line_total: "£79.98".to_string(),
        }]
    }

    #[test]
    fn order_confirmation_renders_items_and_escapes_names() {
        let items = lines();
        let shipping = vec!["A Voter".to_string(), "1 High Street".to_string()];
        let html = OrderConfirmationEmail {
            readable_order_id: "RUK-123456ABCD",
            greeting_name: "Nigel",
            items: &items,
            subtotal: "£79.98",
            shipping: "£4.99",
            total: "£84.97",
            shipping_lines: &shipping,
            support_email: "support@backreform.co.uk",
        }
        .render()
        .unwrap();

        assert!(html.contains("RUK-123456ABCD"));
        assert!(html.contains("Hi Nigel"));
        assert!(html.contains("Reform Hoodie &#60;Navy&#62;") || html.contains("Reform Hoodie &lt;Navy&gt;"));
        assert!(html.contains("£84.97"));
        assert!(html.contains("1 High Street"));
    }

    #[test]
    fn order_notification_renders_without_shipping() {
        let items = lines();
        let html = OrderNotificationEmail {
            readable_order_id: "RUK-123456ABCD",
            order_id: "3f0e7a8e-0000-4000-8000-000000000000",
            customer_email: "voter@example.org",
            customer_name: None,
            placed_at: "19 Oct 2026 10:00 UTC",
            items: &items,
            total: "£84.97",
            shipping_lines: &[],
        }
        .render()
        .unwrap();

        assert!(html.contains("New Order Received"));
        assert!(html.contains("voter@example.org"));
        assert!(!html.contains("Shipping Details"));
    }

    #[test]
    fn welcome_email_contains_code_and_unsubscribe_link() {
        let html = NewsletterWelcomeEmail {
            email: "voter@example.org",
            discount_code: "WELCOME10-AB12-XYZ789",
            discount_percent: 10,
            shop_url: "https://shop.example.org",
            unsubscribe_url: "https://shop.example.org/unsubscribe?token=abc",
        }
        .render()
        .unwrap();

        assert!(html.contains("WELCOME10-AB12-XYZ789"));
        assert!(html.contains("unsubscribe?token=abc"));
        assert!(html.contains("10%"));
    }

    #[test]
    fn outgoing_email_serializes_as_resend_body() {
        let email = OutgoingEmail {
            to: "voter@example.org".to_string(),
            from: "support@backreform.co.uk".to_string(),
            subject: "Hello".to_string(),
            html: "<p>Hi</p>".to_string(),
        };
        let body = serde_json::to_value(&email).unwrap();
        assert_eq!(
            body,
            serde_json::json!({
                "to": "voter@example.org",
                "from": "support@backreform.co.uk",
                "subject": "Hello",
                "html": "<p>Hi</p>"
            })
        );
    }

    async fn resend_stub(status: axum::http::StatusCode) -> (ResendMailer, Received) {
        use axum::extract::State;
        use axum::http::HeaderMap;
        use axum::routing::post;
        use axum::{Json, Router};

        let received = Received::default();
        let app = Router::new()
            .route(
                "/emails",
                post(
                    move |State(received): State<Received>,
                          headers: HeaderMap,
                          Json(body): Json<serde_json::Value>| async move {
                        let auth = headers
                            .get("authorization")
                            .and_then(|v| v.to_str().ok())
                            .unwrap_or_default()
                            .to_string();
                        received.lock().await.push((auth, body));
                        if status.is_success() {
                            (status, Json(serde_json::json!({ "id": "re_123" })))
                        } else {
                            (status, Json(serde_json::json!({ "message": "invalid from" })))
                        }
                    },
                ),
            )
            .with_state(received.clone());
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });

        let mailer =
            ResendMailer::with_base_url(&SecretString::from("re_test_key"), &format!("http://{addr}"))
                .unwrap();
        (mailer, received)
    }

    type Received = std::sync::Arc<tokio::sync::Mutex<Vec<(String, serde_json::Value)>>>;

    fn message() -> OutgoingEmail {
        OutgoingEmail {
            to: "supporter@example.com".to_string(),
            from: "orders@reformuk.shop".to_string(),
            subject: "Your order".to_string(),
            html: "<p>Thanks</p>".to_string(),
        }
    }

    #[tokio::test]
    async fn resend_posts_message_with_bearer_key() {
        let (mailer, received) = resend_stub(axum::http::StatusCode::OK).await;

        let sent = mailer.send(&message()).await.unwrap();

        assert_eq!(sent.id, "re_123");
        let received = received.lock().await;
        assert_eq!(received.len(), 1);
        let (auth, body) = &received[0];
        assert_eq!(auth, "Bearer re_test_key");
        assert_eq!(
            *body,
            serde_json::json!({
                "to": "supporter@example.com",
                "from": "orders@reformuk.shop",
                "subject": "Your order",
                "html": "<p>Thanks</p>"
            })
        );
    }

    #[tokio::test]
    async fn resend_rejection_is_an_api_error() {
        let (mailer, _) = resend_stub(axum::http::StatusCode::UNPROCESSABLE_ENTITY).await;

        let err = mailer.send(&message()).await.unwrap_err();

        assert!(matches!(err, EmailError::Api { status: 422, message: ref body } if body.contains("invalid from")));
    }
}
