//! Recording orders from Stripe checkout webhooks.
//!
//! # Flow
//!
//! 1. Claim the event id in the webhook ledger. A completed event is
//!    acknowledged without doing anything.
//! 2. For `checkout.session.completed`, build the order and its items from
//!    the session and insert them in one transaction.
//! 3. Send the order emails and return their outcome with the order.
//! 4. Mark the event processed, or failed with the error text.
//!
//! A second delivery of the same session, even under a different event id,
//! finds the existing order and does not insert or email again.

use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use thiserror::Error;

use reform_shop_core::{CurrencyCode, OrderId, OrderStatus};

use super::codes;
use super::notifications::{NotificationReport, OrderNotifier};
use crate::db::{EventClaim, OrderStore, RepositoryError, WebhookEventStore};
use crate::models::{NewOrder, NewOrderItem};
use crate::stripe::{
    CHECKOUT_SESSION_COMPLETED, CheckoutSession, Event, LineItem, LineItemSource, StripeError,
};

/// Email recorded when Stripe did not collect one.
pub const UNKNOWN_EMAIL: &str = "unknown@example.com";

/// Item name recorded when a line item has no description.
pub const UNKNOWN_PRODUCT: &str = "Unknown Product";

const EVENT_SOURCE: &str = "stripe";

/// Errors that fail a webhook delivery.
#[derive(Debug, Error)]
pub enum CheckoutError {
    #[error(transparent)]
    Database(#[from] RepositoryError),

    #[error(transparent)]
    Stripe(#[from] StripeError),

    #[error("invalid payload: {0}")]
    InvalidPayload(String),
}

/// What a webhook delivery did.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum WebhookOutcome {
    OrderRecorded {
        order_id: OrderId,
        readable_order_id: String,
        items: usize,
        notification: NotificationReport,
    },
    DuplicateOrder {
        order_id: OrderId,
    },
    AlreadyProcessed {
        event_id: String,
    },
    Ignored {
        event_type: String,
    },
}

/// Handles verified Stripe events.
#[derive(Clone)]
pub struct CheckoutService {
    orders: Arc<dyn OrderStore>,
    events: Arc<dyn WebhookEventStore>,
    line_items: Arc<dyn LineItemSource>,
    notifier: OrderNotifier,
}

impl CheckoutService {
    #[must_use]
    pub fn new(
        orders: Arc<dyn OrderStore>,
        events: Arc<dyn WebhookEventStore>,
        line_items: Arc<dyn LineItemSource>,
        notifier: OrderNotifier,
    ) -> Self {
        Self {
            orders,
            events,
            line_items,
            notifier,
        }
    }

    /// Handle one verified event.
    ///
    /// # Errors
    ///
    /// Returns `CheckoutError` if the order cannot be recorded. The event is
    /// left marked as failed so a redelivery retries it.
    #[tracing::instrument(skip(self, event), fields(event_id = %event.id, event_type = %event.event_type))]
    pub async fn handle_event(&self, event: Event) -> Result<WebhookOutcome, CheckoutError> {
        let claim = self
            .events
            .claim(&event.id, EVENT_SOURCE, &event.event_type)
            .await?;

        match claim {
            EventClaim::AlreadyProcessed => {
                tracing::info!("Webhook event already processed");
                return Ok(WebhookOutcome::AlreadyProcessed { event_id: event.id });
            }
            EventClaim::Retry => tracing::info!("Retrying webhook event"),
            EventClaim::New => {}
        }

        match self.process(&event).await {
            Ok(outcome) => {
                self.events.mark_processed(&event.id).await?;
                Ok(outcome)
            }
            Err(e) => {
                if let Err(mark_err) = self.events.mark_failed(&event.id, &e.to_string()).await {
                    tracing::warn!(error = %mark_err, "Failed to mark webhook event as failed");
                }
                Err(e)
            }
        }
    }

    async fn process(&self, event: &Event) -> Result<WebhookOutcome, CheckoutError> {
        if event.event_type != CHECKOUT_SESSION_COMPLETED {
            tracing::debug!("Ignoring webhook event");
            return Ok(WebhookOutcome::Ignored {
                event_type: event.event_type.clone(),
            });
        }

        let session: CheckoutSession = serde_json::from_value(event.data.object.clone())
            .map_err(|e| CheckoutError::InvalidPayload(format!("invalid checkout session: {e}")))?;

        self.record_order(session).await
    }

    async fn record_order(&self, mut session: CheckoutSession) -> Result<WebhookOutcome, CheckoutError> {
        if let Some(existing) = self.orders.find_by_session(&session.id).await? {
            tracing::info!(order_id = %existing.id, session_id = %session.id, "Order already recorded");
            return Ok(WebhookOutcome::DuplicateOrder {
                order_id: existing.id,
            });
        }

        let line_items = match session.line_items.take() {
            Some(list) if !list.has_more => list.data,
            _ => self.line_items.line_items(&session.id).await?,
        };

        let (new_order, new_items) =
            build_order(&session, &line_items, Utc::now().timestamp_millis())?;

        let (order, items) = match self.orders.create_order(new_order, new_items).await {
            Ok(stored) => stored,
            Err(RepositoryError::Conflict(_)) => {
                // Lost a race with a concurrent delivery of the same session.
                let existing = self
                    .orders
                    .find_by_session(&session.id)
                    .await?
                    .ok_or(RepositoryError::NotFound)?;
                return Ok(WebhookOutcome::DuplicateOrder {
                    order_id: existing.id,
                });
            }
            Err(e) => return Err(e.into()),
        };

        tracing::info!(
            order_id = %order.id,
            readable_order_id = %order.readable_order_id,
            total = %order.total.display(),
            "Order recorded"
        );

        let notification = self.notifier.notify(&order, &items).await;

        Ok(WebhookOutcome::OrderRecorded {
            order_id: order.id,
            readable_order_id: order.readable_order_id,
            items: items.len(),
            notification,
        })
    }
}

/// Build the order rows for a completed session.
///
/// # Errors
///
/// Returns `CheckoutError::InvalidPayload` for an unsupported currency or a
/// quantity that does not fit the items table.
pub fn build_order(
    session: &CheckoutSession,
    line_items: &[LineItem],
    now_millis: i64,
) -> Result<(NewOrder, Vec<NewOrderItem>), CheckoutError> {
    let currency = match session.currency.as_deref() {
        Some(code) => CurrencyCode::parse(code)
            .ok_or_else(|| CheckoutError::InvalidPayload(format!("unsupported currency: {code}")))?,
        None => CurrencyCode::GBP,
    };

    let items = line_items
        .iter()
        .map(build_item)
        .collect::<Result<Vec<_>, _>>()?;

    let items_total: i64 = items.iter().map(|i| i.line_total_pence).sum();
    let subtotal = session.amount_subtotal.unwrap_or(items_total);
    let shipping = session.shipping_amount();
    let total = session.amount_total.unwrap_or(subtotal + shipping);

    let customer_details = serde_json::to_value(session.customer_details.clone().unwrap_or_default())
        .map_err(|e| CheckoutError::InvalidPayload(format!("invalid customer details: {e}")))?;

    let order = NewOrder {
        readable_order_id: codes::readable_order_id(now_millis),
        stripe_session_id: session.id.clone(),
        customer_email: session.email().unwrap_or(UNKNOWN_EMAIL).to_string(),
        customer_name: session.customer_name().map(String::from),
        customer_details,
        shipping_details: session.shipping().cloned(),
        currency,
        subtotal_pence: subtotal,
        shipping_pence: shipping,
        total_pence: total,
        status: OrderStatus::Paid,
    };

    Ok((order, items))
}

fn build_item(item: &LineItem) -> Result<NewOrderItem, CheckoutError> {
    let quantity = item.quantity.unwrap_or(1).max(1);
    let line_total = item.amount_total.unwrap_or(0);

    Ok(NewOrderItem {
        name: item
            .description
            .as_deref()
            .map(str::trim)
            .filter(|d| !d.is_empty())
            .unwrap_or(UNKNOWN_PRODUCT)
            .to_string(),
        quantity: i32::try_from(quantity)
            .map_err(|_| CheckoutError::InvalidPayload(format!("quantity out of range: {quantity}")))?,
        unit_price_pence: line_total / quantity,
        line_total_pence: line_total,
    })
}
