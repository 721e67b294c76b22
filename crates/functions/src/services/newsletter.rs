//! Newsletter signup and unsubscribe.
//!
//! New subscribers get a one-off welcome discount code by email. Addresses
//! are stored normalized (trimmed, lower-cased), so the same mailbox cannot
//! subscribe twice with different capitalisation.

use std::sync::Arc;

use askama::Template;
use chrono::Utc;
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use reform_shop_core::{Email, EmailAddressError};

use super::codes;
use super::email::{Mailer, NewsletterWelcomeEmail, OutgoingEmail, UnsubscribeConfirmationEmail};
use crate::db::{RepositoryError, SubscriberStore};
use crate::models::{NewSubscriber, Subscriber};

/// Discount granted to new subscribers.
pub const WELCOME_DISCOUNT_PERCENT: i32 = 10;

/// Errors from newsletter operations.
#[derive(Debug, Error)]
pub enum NewsletterError {
    #[error("invalid email: {0}")]
    InvalidEmail(#[from] EmailAddressError),

    #[error("This email is already subscribed to our newsletter")]
    AlreadySubscribed,

    #[error("Invalid unsubscribe token")]
    InvalidToken,

    #[error("This email is already unsubscribed")]
    AlreadyUnsubscribed,

    #[error(transparent)]
    Database(#[from] RepositoryError),
}

/// Result of a signup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscribeOutcome {
    pub discount_code: String,
    /// Whether the welcome email went out. Always false on reactivation.
    pub email_sent: bool,
    /// True when a previously unsubscribed address was switched back on.
    pub reactivated: bool,
}

/// Newsletter operations.
#[derive(Clone)]
pub struct NewsletterService {
    subscribers: Arc<dyn SubscriberStore>,
    mailer: Arc<dyn Mailer>,
    from_address: String,
    app_url: String,
}

impl NewsletterService {
    #[must_use]
    pub fn new(
        subscribers: Arc<dyn SubscriberStore>,
        mailer: Arc<dyn Mailer>,
        from_address: String,
        app_url: String,
    ) -> Self {
        Self {
            subscribers,
            mailer,
            from_address,
            app_url,
        }
    }

    /// Subscribe an address and send the welcome discount code.
    ///
    /// # Errors
    ///
    /// Returns `InvalidEmail` for a malformed address, `AlreadySubscribed` if
    /// the address is active, or a database error.
    #[tracing::instrument(skip(self, raw_email))]
    pub async fn subscribe(&self, raw_email: &str) -> Result<SubscribeOutcome, NewsletterError> {
        let email = Email::normalized(raw_email)?;

        if let Some(existing) = self.subscribers.find_by_email(&email).await? {
            if existing.is_active {
                return Err(NewsletterError::AlreadySubscribed);
            }

            let subscriber = self.subscribers.reactivate(existing.id).await?;
            tracing::info!(subscriber_id = %subscriber.id, "Newsletter subscriber reactivated");
            return Ok(SubscribeOutcome {
                discount_code: subscriber.discount_code,
                email_sent: false,
                reactivated: true,
            });
        }

        let new = NewSubscriber {
            email,
            discount_code: codes::discount_code(Utc::now().timestamp_millis()),
            discount_percent: WELCOME_DISCOUNT_PERCENT,
            unsubscribe_token: Uuid::new_v4(),
        };

        let subscriber = match self.subscribers.insert(new).await {
            Ok(subscriber) => subscriber,
            // Concurrent signup of the same address.
            Err(RepositoryError::Conflict(_)) => return Err(NewsletterError::AlreadySubscribed),
            Err(e) => return Err(e.into()),
        };

        tracing::info!(subscriber_id = %subscriber.id, "Newsletter subscriber added");

        let email_sent = self.send_welcome(&subscriber).await;
        if email_sent && let Err(e) = self.subscribers.mark_welcome_sent(subscriber.id).await {
            tracing::warn!(subscriber_id = %subscriber.id, error = %e, "Failed to record welcome email");
        }

        Ok(SubscribeOutcome {
            discount_code: subscriber.discount_code,
            email_sent,
            reactivated: false,
        })
    }

    /// Deactivate the subscriber holding `token`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidToken` for an unknown token, `AlreadyUnsubscribed` if
    /// the subscriber is inactive, or a database error.
    #[tracing::instrument(skip(self, token))]
    pub async fn unsubscribe(&self, token: &str) -> Result<Subscriber, NewsletterError> {
        let token = Uuid::parse_str(token.trim()).map_err(|_| NewsletterError::InvalidToken)?;

        let subscriber = self
            .subscribers
            .find_by_token(token)
            .await?
            .ok_or(NewsletterError::InvalidToken)?;

        if !subscriber.is_active {
            return Err(NewsletterError::AlreadyUnsubscribed);
        }

        let subscriber = self.subscribers.deactivate(subscriber.id).await?;
        tracing::info!(subscriber_id = %subscriber.id, "Newsletter subscriber unsubscribed");

        self.send_unsubscribe_confirmation(&subscriber).await;

        Ok(subscriber)
    }

    /// Link that unsubscribes the holder of `token`.
    #[must_use]
    pub fn unsubscribe_url(&self, token: Uuid) -> String {
        format!("{}/unsubscribe?token={token}", self.app_url)
    }

    async fn send_welcome(&self, subscriber: &Subscriber) -> bool {
        let unsubscribe_url = self.unsubscribe_url(subscriber.unsubscribe_token);
        let html = NewsletterWelcomeEmail {
            email: subscriber.email.as_str(),
            discount_code: &subscriber.discount_code,
            discount_percent: subscriber.discount_percent,
            shop_url: &self.app_url,
            unsubscribe_url: &unsubscribe_url,
        }
        .render();

        self.deliver(
            subscriber,
            "Welcome to Reform UK - Your 10% Discount Code Inside!",
            html,
        )
        .await
    }

    async fn send_unsubscribe_confirmation(&self, subscriber: &Subscriber) -> bool {
        let html = UnsubscribeConfirmationEmail {
            email: subscriber.email.as_str(),
            shop_url: &self.app_url,
        }
        .render();

        self.deliver(subscriber, "Unsubscribed from Reform UK Newsletter", html)
            .await
    }

    async fn deliver(
        &self,
        subscriber: &Subscriber,
        subject: &str,
        html: Result<String, askama::Error>,
    ) -> bool {
        let html = match html {
            Ok(html) => html,
            Err(e) => {
                tracing::error!(subscriber_id = %subscriber.id, error = %e, "Failed to render email");
                return false;
            }
        };

        let email = OutgoingEmail {
            to: subscriber.email.as_str().to_string(),
            from: self.from_address.clone(),
            subject: subject.to_string(),
            html,
        };

        match self.mailer.send(&email).await {
            Ok(sent) => {
                tracing::debug!(subscriber_id = %subscriber.id, message_id = %sent.id, "Email sent");
                true
            }
            Err(e) => {
                tracing::warn!(subscriber_id = %subscriber.id, error = %e, "Failed to send email");
                false
            }
        }
    }
}
