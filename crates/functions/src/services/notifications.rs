//! Order notification emails.
//!
//! Every order produces two messages: a receipt to the customer and a
//! notification to the shop's support inbox. Both are always attempted; the
//! outcome of each is reported back rather than swallowed.

use std::sync::Arc;

use askama::Template;
use serde::Serialize;
use thiserror::Error;

use reform_shop_core::OrderId;

use super::email::{
    ItemLine, Mailer, OrderConfirmationEmail, OrderNotificationEmail, OutgoingEmail,
};
use crate::db::{OrderStore, RepositoryError};
use crate::models::{Order, OrderItem};

/// Errors that prevent notifications from being attempted.
#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("order {0} not found")]
    OrderNotFound(OrderId),

    #[error(transparent)]
    Database(#[from] RepositoryError),
}

/// Outcome of one message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DeliveryStatus {
    Sent { id: String },
    Failed { error: String },
}

impl DeliveryStatus {
    #[must_use]
    pub const fn is_sent(&self) -> bool {
        matches!(self, Self::Sent { .. })
    }
}

/// Outcome of both order messages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NotificationReport {
    pub customer: DeliveryStatus,
    pub internal: DeliveryStatus,
}

impl NotificationReport {
    #[must_use]
    pub const fn all_sent(&self) -> bool {
        self.customer.is_sent() && self.internal.is_sent()
    }
}

/// Sends order emails.
#[derive(Clone)]
pub struct OrderNotifier {
    orders: Arc<dyn OrderStore>,
    mailer: Arc<dyn Mailer>,
    from_address: String,
    support_address: String,
}

impl OrderNotifier {
    #[must_use]
    pub fn new(
        orders: Arc<dyn OrderStore>,
        mailer: Arc<dyn Mailer>,
        from_address: String,
        support_address: String,
    ) -> Self {
        Self {
            orders,
            mailer,
            from_address,
            support_address,
        }
    }

    /// Load an order and send both emails.
    ///
    /// # Errors
    ///
    /// Returns `NotifyError::OrderNotFound` for an unknown id, or a database
    /// error if the order cannot be loaded. Delivery failures are reported in
    /// the returned [`NotificationReport`].
    #[tracing::instrument(skip(self), fields(order_id = %order_id))]
    pub async fn send(&self, order_id: OrderId) -> Result<NotificationReport, NotifyError> {
        let order = self
            .orders
            .get_order(order_id)
            .await?
            .ok_or(NotifyError::OrderNotFound(order_id))?;
        let items = self.orders.order_items(order_id).await?;

        Ok(self.notify(&order, &items).await)
    }

    /// Send both emails for an order already in hand.
    ///
    /// A message whose template fails to render is still sent, with a
    /// minimal body naming the order and its total.
    pub async fn notify(&self, order: &Order, items: &[OrderItem]) -> NotificationReport {
        let lines = item_lines(items);
        let shipping_lines = order
            .shipping_details
            .as_ref()
            .map(address_lines)
            .unwrap_or_default();
        let fallback = fallback_body(order);

        let customer = self
            .deliver(
                &order.customer_email,
                format!("Order Confirmation - {}", order.readable_order_id),
                OrderConfirmationEmail {
                    readable_order_id: &order.readable_order_id,
                    greeting_name: order.greeting_name(),
                    items: &lines,
                    subtotal: &order.subtotal.display(),
                    shipping: &order.shipping.display(),
                    total: &order.total.display(),
                    shipping_lines: &shipping_lines,
                    support_email: &self.support_address,
                }
                .render(),
                &fallback,
            )
            .await;

        let internal = self
            .deliver(
                &self.support_address,
                format!(
                    "New Order: {} - {}",
                    order.readable_order_id,
                    order.total.display()
                ),
                OrderNotificationEmail {
                    readable_order_id: &order.readable_order_id,
                    order_id: &order.id.to_string(),
                    customer_email: &order.customer_email,
                    customer_name: order.customer_name.as_deref(),
                    placed_at: &order.created_at.format("%d %b %Y %H:%M UTC").to_string(),
                    items: &lines,
                    total: &order.total.display(),
                    shipping_lines: &shipping_lines,
                }
                .render(),
                &fallback,
            )
            .await;

        let report = NotificationReport { customer, internal };
        if report.all_sent() {
            tracing::info!(order_id = %order.id, "Order emails sent");
        } else {
            tracing::warn!(order_id = %order.id, report = ?report, "Order emails incomplete");
        }
        report
    }

    async fn deliver(
        &self,
        to: &str,
        subject: String,
        html: Result<String, askama::Error>,
        fallback: &str,
    ) -> DeliveryStatus {
        let html = html.unwrap_or_else(|e| {
            tracing::error!(to = %to, error = %e, "Failed to render email, sending fallback body");
            fallback.to_string()
        });

        let email = OutgoingEmail {
            to: to.to_string(),
            from: self.from_address.clone(),
            subject,
            html,
        };

        match self.mailer.send(&email).await {
            Ok(sent) => DeliveryStatus::Sent { id: sent.id },
            Err(e) => {
                tracing::warn!(to = %to, error = %e, "Failed to send email");
                DeliveryStatus::Failed {
                    error: e.to_string(),
                }
            }
        }
    }
}

/// Body used when a template fails to render. Only generated values appear.
fn fallback_body(order: &Order) -> String {
    format!(
        "<p>Order {}</p><p>Total: {}</p>",
        order.readable_order_id,
        order.total.display()
    )
}

fn item_lines(items: &[OrderItem]) -> Vec<ItemLine> {
    items
        .iter()
        .map(|item| ItemLine {
            name: item.name.clone(),
            quantity: item.quantity,
            unit_price: item.unit_price.display(),
            line_total: item.line_total.display(),
        })
        .collect()
}

/// Flatten a Stripe shipping object (`{name, address: {...}}`) into lines.
fn address_lines(shipping: &serde_json::Value) -> Vec<String> {
    let text = |v: &serde_json::Value, key: &str| {
        v.get(key)
            .and_then(serde_json::Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from)
    };

    let mut lines: Vec<String> = text(shipping, "name").into_iter().collect();

    if let Some(address) = shipping.get("address") {
        lines.extend(text(address, "line1"));
        lines.extend(text(address, "line2"));

        let locality: Vec<String> = [text(address, "city"), text(address, "state")]
            .into_iter()
            .flatten()
            .collect();
        if !locality.is_empty() {
            lines.push(locality.join(", "));
        }

        lines.extend(text(address, "postal_code"));
        lines.extend(text(address, "country"));
    }

    lines
}
