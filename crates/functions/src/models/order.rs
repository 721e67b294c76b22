//! Order domain types.

use chrono::{DateTime, Utc};
use serde::Serialize;

use reform_shop_core::{CurrencyCode, OrderId, OrderItemId, OrderStatus, Price};

/// A paid order recorded from a Stripe checkout session.
#[derive(Debug, Clone, Serialize)]
pub struct Order {
    pub id: OrderId,
    /// Customer-facing reference, e.g. `RUK-482913K7QZ`.
    pub readable_order_id: String,
    pub stripe_session_id: String,
    pub customer_email: String,
    pub customer_name: Option<String>,
    /// Raw `customer_details` object from Stripe.
    pub customer_details: serde_json::Value,
    /// Raw shipping details from Stripe, if the session collected them.
    pub shipping_details: Option<serde_json::Value>,
    pub subtotal: Price,
    pub shipping: Price,
    pub total: Price,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
}

impl Order {
    #[must_use]
    pub const fn currency(&self) -> CurrencyCode {
        self.total.currency_code
    }

    /// Name to greet the customer with, falling back to their email.
    #[must_use]
    pub fn greeting_name(&self) -> &str {
        self.customer_name
            .as_deref()
            .filter(|n| !n.trim().is_empty())
            .unwrap_or(&self.customer_email)
    }
}

/// One purchased line of an order.
#[derive(Debug, Clone, Serialize)]
pub struct OrderItem {
    pub id: OrderItemId,
    pub order_id: OrderId,
    pub name: String,
    pub quantity: i32,
    pub unit_price: Price,
    pub line_total: Price,
}

/// Order data to insert.
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub readable_order_id: String,
    pub stripe_session_id: String,
    pub customer_email: String,
    pub customer_name: Option<String>,
    pub customer_details: serde_json::Value,
    pub shipping_details: Option<serde_json::Value>,
    pub currency: CurrencyCode,
    pub subtotal_pence: i64,
    pub shipping_pence: i64,
    pub total_pence: i64,
    pub status: OrderStatus,
}

/// Order item data to insert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewOrderItem {
    pub name: String,
    pub quantity: i32,
    pub unit_price_pence: i64,
    pub line_total_pence: i64,
}
