//! Stripe payload types.
//!
//! Only the fields the shop reads are modelled; everything else in the
//! payload is ignored.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// The event type that records an order.
pub const CHECKOUT_SESSION_COMPLETED: &str = "checkout.session.completed";

/// A webhook event envelope.
#[derive(Debug, Clone, Deserialize)]
pub struct Event {
    pub id: String,
    #[serde(rename = "type")]
    pub event_type: String,
    pub data: EventData,
    #[serde(default)]
    pub livemode: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EventData {
    /// The resource the event is about, left untyped until the event type is known.
    pub object: serde_json::Value,
}

/// A completed Checkout Session.
#[derive(Debug, Clone, Deserialize)]
pub struct CheckoutSession {
    pub id: String,
    #[serde(default)]
    pub customer_details: Option<CustomerDetails>,
    #[serde(default)]
    pub customer_email: Option<String>,
    #[serde(default)]
    pub amount_subtotal: Option<i64>,
    #[serde(default)]
    pub amount_total: Option<i64>,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
    #[serde(default)]
    pub shipping_cost: Option<ShippingCost>,
    /// Present on older API versions.
    #[serde(default)]
    pub shipping_details: Option<serde_json::Value>,
    #[serde(default)]
    pub collected_information: Option<CollectedInformation>,
    /// Only present when the session was fetched with `expand[]=line_items`.
    #[serde(default)]
    pub line_items: Option<List<LineItem>>,
}

impl CheckoutSession {
    /// Customer email, preferring what the customer typed at checkout.
    #[must_use]
    pub fn email(&self) -> Option<&str> {
        self.customer_details
            .as_ref()
            .and_then(|d| d.email.as_deref())
            .or(self.customer_email.as_deref())
            .map(str::trim)
            .filter(|e| !e.is_empty())
    }

    #[must_use]
    pub fn customer_name(&self) -> Option<&str> {
        self.customer_details
            .as_ref()
            .and_then(|d| d.name.as_deref())
            .filter(|n| !n.trim().is_empty())
    }

    /// Shipping name and address, wherever this API version puts them.
    #[must_use]
    pub fn shipping(&self) -> Option<&serde_json::Value> {
        self.shipping_details
            .as_ref()
            .filter(|v| !v.is_null())
            .or_else(|| {
                self.collected_information
                    .as_ref()
                    .and_then(|c| c.shipping_details.as_ref())
                    .filter(|v| !v.is_null())
            })
    }

    #[must_use]
    pub fn shipping_amount(&self) -> i64 {
        self.shipping_cost
            .as_ref()
            .and_then(|s| s.amount_total)
            .unwrap_or(0)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CustomerDetails {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub address: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ShippingCost {
    #[serde(default)]
    pub amount_total: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CollectedInformation {
    #[serde(default)]
    pub shipping_details: Option<serde_json::Value>,
}

/// A page of a Stripe list endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct List<T> {
    pub data: Vec<T>,
    #[serde(default)]
    pub has_more: bool,
}

/// One purchased line of a Checkout Session.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LineItem {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub quantity: Option<i64>,
    /// Total for the line after discounts, in minor units.
    #[serde(default)]
    pub amount_total: Option<i64>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn email_prefers_customer_details() {
        let session: CheckoutSession = serde_json::from_value(serde_json::json!({
            "id": "cs_test_1",
            "customer_details": { "email": "typed@example.org", "name": "Nigel" },
            "customer_email": "prefilled@example.org"
        }))
        .unwrap();
        assert_eq!(session.email(), Some("typed@example.org"));
        assert_eq!(session.customer_name(), Some("Nigel"));
    }

    #[test]
    fn email_falls_back_to_customer_email() {
        let session: CheckoutSession = serde_json::from_value(serde_json::json!({
            "id": "cs_test_2",
            "customer_details": { "email": null },
            "customer_email": "prefilled@example.org"
        }))
        .unwrap();
        assert_eq!(session.email(), Some("prefilled@example.org"));
    }

    #[test]
    fn shipping_reads_collected_information() {
        let session: CheckoutSession = serde_json::from_value(serde_json::json!({
            "id": "cs_test_3",
            "shipping_cost": { "amount_total": 399 },
            "collected_information": {
                "shipping_details": { "name": "A Voter", "address": { "city": "Boston" } }
            }
        }))
        .unwrap();
        assert_eq!(session.shipping_amount(), 399);
        assert_eq!(
            session.shipping().unwrap()["address"]["city"],
            serde_json::json!("Boston")
        );
    }

    #[test]
    fn event_keeps_object_untyped() {
        let event: Event = serde_json::from_str(
            r#"{"id":"evt_1","type":"invoice.paid","data":{"object":{"id":"in_1"}}}"#,
        )
        .unwrap();
        assert_eq!(event.event_type, "invoice.paid");
        assert_eq!(event.data.object["id"], serde_json::json!("in_1"));
    }
}
