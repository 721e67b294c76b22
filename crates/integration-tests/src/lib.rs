//! In-process integration tests for the Reform shop functions.
//!
//! The router is driven with `tower::ServiceExt::oneshot`, so no server or
//! database is needed. Stores and the mailer are in-memory fakes that record
//! what the handlers did.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p reform-shop-integration-tests
//! ```

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use axum::Router;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode, header};
use chrono::Utc;
use http_body_util::BodyExt;
use reform_shop_core::{Email, OrderId, OrderItemId, Price, SubscriberId};
use reform_shop_functions::config::{EmailConfig, FunctionsConfig, SentryConfig, StripeConfig};
use reform_shop_functions::db::{
    EventClaim, OrderStore, RepositoryError, SubscriberStore, WebhookEventStore,
};
use reform_shop_functions::models::{
    NewOrder, NewOrderItem, NewSubscriber, Order, OrderItem, Subscriber,
};
use reform_shop_functions::services::email::{EmailError, Mailer, OutgoingEmail, SentEmail};
use reform_shop_functions::state::{AppState, Dependencies};
use reform_shop_functions::stripe::{LineItem, LineItemSource, StripeError, signature_header};
use secrecy::SecretString;
use serde_json::Value;
use tokio::sync::Mutex;
use tower::ServiceExt;
use uuid::Uuid;

/// Webhook signing secret used by [`TestContext`].
pub const WEBHOOK_SECRET: &str = "whsec_test_secret";

/// Sender address used by [`TestContext`].
pub const FROM_ADDRESS: &str = "orders@reformuk.shop";

/// Internal notification address used by [`TestContext`].
pub const SUPPORT_ADDRESS: &str = "support@reformuk.shop";

// ============================================================================
// Orders
// ============================================================================

/// Orders kept in memory, unique per Stripe session.
#[derive(Default)]
pub struct MemoryOrders {
    orders: Mutex<Vec<(Order, Vec<OrderItem>)>>,
    fail_inserts: AtomicBool,
}

impl MemoryOrders {
    /// Make every later `create_order` fail as if the database were down.
    pub fn fail_inserts(&self) {
        self.fail_inserts.store(true, Ordering::SeqCst);
    }

    pub async fn count(&self) -> usize {
        self.orders.lock().await.len()
    }

    pub async fn all(&self) -> Vec<(Order, Vec<OrderItem>)> {
        self.orders.lock().await.clone()
    }
}

#[async_trait]
impl OrderStore for MemoryOrders {
    async fn create_order(
        &self,
        order: NewOrder,
        items: Vec<NewOrderItem>,
    ) -> Result<(Order, Vec<OrderItem>), RepositoryError> {
        if self.fail_inserts.load(Ordering::SeqCst) {
            return Err(RepositoryError::DataCorruption(
                "order insert unavailable".to_string(),
            ));
        }
        let mut orders = self.orders.lock().await;
        if orders
            .iter()
            .any(|(o, _)| o.stripe_session_id == order.stripe_session_id)
        {
            return Err(RepositoryError::Conflict(format!(
                "order for session {} already exists",
                order.stripe_session_id
            )));
        }

        let currency = order.currency;
        let created = Order {
            id: OrderId::new_v4(),
            readable_order_id: order.readable_order_id,
            stripe_session_id: order.stripe_session_id,
            customer_email: order.customer_email,
            customer_name: order.customer_name,
            customer_details: order.customer_details,
            shipping_details: order.shipping_details,
            subtotal: Price::from_minor_units(order.subtotal_pence, currency),
            shipping: Price::from_minor_units(order.shipping_pence, currency),
            total: Price::from_minor_units(order.total_pence, currency),
            status: order.status,
            created_at: Utc::now(),
        };
        let created_items: Vec<OrderItem> = items
            .into_iter()
            .map(|item| OrderItem {
                id: OrderItemId::new_v4(),
                order_id: created.id,
                name: item.name,
                quantity: item.quantity,
                unit_price: Price::from_minor_units(item.unit_price_pence, currency),
                line_total: Price::from_minor_units(item.line_total_pence, currency),
            })
            .collect();

        orders.push((created.clone(), created_items.clone()));
        Ok((created, created_items))
    }

    async fn get_order(&self, id: OrderId) -> Result<Option<Order>, RepositoryError> {
        let orders = self.orders.lock().await;
        Ok(orders.iter().find(|(o, _)| o.id == id).map(|(o, _)| o.clone()))
    }

    async fn order_items(&self, id: OrderId) -> Result<Vec<OrderItem>, RepositoryError> {
        let orders = self.orders.lock().await;
        Ok(orders
            .iter()
            .find(|(o, _)| o.id == id)
            .map(|(_, items)| items.clone())
            .unwrap_or_default())
    }

    async fn find_by_session(&self, session_id: &str) -> Result<Option<Order>, RepositoryError> {
        let orders = self.orders.lock().await;
        Ok(orders
            .iter()
            .find(|(o, _)| o.stripe_session_id == session_id)
            .map(|(o, _)| o.clone()))
    }
}

// ============================================================================
// Webhook events
// ============================================================================

/// Recorded state of one webhook event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventRecord {
    pub event_type: String,
    pub processed: bool,
    pub error: Option<String>,
}

/// Idempotency ledger kept in memory.
#[derive(Default)]
pub struct MemoryEvents {
    events: Mutex<HashMap<String, EventRecord>>,
}

impl MemoryEvents {
    pub async fn get(&self, event_id: &str) -> Option<EventRecord> {
        self.events.lock().await.get(event_id).cloned()
    }
}

#[async_trait]
impl WebhookEventStore for MemoryEvents {
    async fn claim(
        &self,
        event_id: &str,
        _source: &str,
        event_type: &str,
    ) -> Result<EventClaim, RepositoryError> {
        let mut events = self.events.lock().await;
        match events.get(event_id).map(|r| r.processed) {
            None => {
                events.insert(
                    event_id.to_string(),
                    EventRecord {
                        event_type: event_type.to_string(),
                        processed: false,
                        error: None,
                    },
                );
                Ok(EventClaim::New)
            }
            Some(true) => Ok(EventClaim::AlreadyProcessed),
            Some(false) => Ok(EventClaim::Retry),
        }
    }

    async fn mark_processed(&self, event_id: &str) -> Result<(), RepositoryError> {
        let mut events = self.events.lock().await;
        let record = events.get_mut(event_id).ok_or(RepositoryError::NotFound)?;
        record.processed = true;
        record.error = None;
        Ok(())
    }

    async fn mark_failed(&self, event_id: &str, error: &str) -> Result<(), RepositoryError> {
        let mut events = self.events.lock().await;
        let record = events.get_mut(event_id).ok_or(RepositoryError::NotFound)?;
        record.processed = false;
        record.error = Some(error.to_string());
        Ok(())
    }
}

// ============================================================================
// Subscribers
// ============================================================================

/// Newsletter subscribers kept in memory, unique per email.
#[derive(Default)]
pub struct MemorySubscribers {
    subscribers: Mutex<Vec<Subscriber>>,
}

impl MemorySubscribers {
    pub async fn find(&self, email: &str) -> Option<Subscriber> {
        self.subscribers
            .lock()
            .await
            .iter()
            .find(|s| s.email.as_str() == email)
            .cloned()
    }

    async fn update(
        &self,
        id: SubscriberId,
        f: impl FnOnce(&mut Subscriber),
    ) -> Result<Subscriber, RepositoryError> {
        let mut subscribers = self.subscribers.lock().await;
        let subscriber = subscribers
            .iter_mut()
            .find(|s| s.id == id)
            .ok_or(RepositoryError::NotFound)?;
        f(subscriber);
        Ok(subscriber.clone())
    }
}

#[async_trait]
impl SubscriberStore for MemorySubscribers {
    async fn find_by_email(&self, email: &Email) -> Result<Option<Subscriber>, RepositoryError> {
        Ok(self.find(email.as_str()).await)
    }

    async fn insert(&self, subscriber: NewSubscriber) -> Result<Subscriber, RepositoryError> {
        let mut subscribers = self.subscribers.lock().await;
        if subscribers.iter().any(|s| s.email == subscriber.email) {
            return Err(RepositoryError::Conflict(format!(
                "{} is already subscribed",
                subscriber.email
            )));
        }
        let created = Subscriber {
            id: SubscriberId::new_v4(),
            email: subscriber.email,
            discount_code: subscriber.discount_code,
            discount_percent: subscriber.discount_percent,
            unsubscribe_token: subscriber.unsubscribe_token,
            is_active: true,
            subscribed_at: Utc::now(),
            unsubscribed_at: None,
            welcome_email_sent: false,
            welcome_email_sent_at: None,
        };
        subscribers.push(created.clone());
        Ok(created)
    }

    async fn reactivate(&self, id: SubscriberId) -> Result<Subscriber, RepositoryError> {
        self.update(id, |s| {
            s.is_active = true;
            s.unsubscribed_at = None;
            s.subscribed_at = Utc::now();
        })
        .await
    }

    async fn mark_welcome_sent(&self, id: SubscriberId) -> Result<(), RepositoryError> {
        self.update(id, |s| {
            s.welcome_email_sent = true;
            s.welcome_email_sent_at = Some(Utc::now());
        })
        .await
        .map(|_| ())
    }

    async fn find_by_token(&self, token: Uuid) -> Result<Option<Subscriber>, RepositoryError> {
        let subscribers = self.subscribers.lock().await;
        Ok(subscribers
            .iter()
            .find(|s| s.unsubscribe_token == token)
            .cloned())
    }

    async fn deactivate(&self, id: SubscriberId) -> Result<Subscriber, RepositoryError> {
        self.update(id, |s| {
            s.is_active = false;
            s.unsubscribed_at = Some(Utc::now());
        })
        .await
    }
}

// ============================================================================
// Mailer
// ============================================================================

/// Records every send attempt; recipients in `failing` get an API error.
#[derive(Default)]
pub struct RecordingMailer {
    attempts: Mutex<Vec<OutgoingEmail>>,
    failing: Mutex<Vec<String>>,
}

impl RecordingMailer {
    /// Make every send to `address` fail.
    pub async fn fail_for(&self, address: &str) {
        self.failing.lock().await.push(address.to_string());
    }

    /// Every message handed to the mailer, in order, including failed ones.
    pub async fn attempts(&self) -> Vec<OutgoingEmail> {
        self.attempts.lock().await.clone()
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, email: &OutgoingEmail) -> Result<SentEmail, EmailError> {
        let mut attempts = self.attempts.lock().await;
        attempts.push(email.clone());
        let n = attempts.len();
        drop(attempts);

        if self.failing.lock().await.contains(&email.to) {
            return Err(EmailError::Api {
                status: 422,
                message: format!("cannot deliver to {}", email.to),
            });
        }
        Ok(SentEmail {
            id: format!("email_{n}"),
        })
    }
}

// ============================================================================
// Stripe line items
// ============================================================================

/// Line items served per session id, standing in for the Stripe API.
#[derive(Default)]
pub struct StaticLineItems {
    items: Mutex<HashMap<String, Vec<LineItem>>>,
    calls: Mutex<usize>,
}

impl StaticLineItems {
    pub async fn insert(&self, session_id: &str, items: Vec<LineItem>) {
        self.items.lock().await.insert(session_id.to_string(), items);
    }

    pub async fn calls(&self) -> usize {
        *self.calls.lock().await
    }
}

#[async_trait]
impl LineItemSource for StaticLineItems {
    async fn line_items(&self, session_id: &str) -> Result<Vec<LineItem>, StripeError> {
        *self.calls.lock().await += 1;
        Ok(self
            .items
            .lock()
            .await
            .get(session_id)
            .cloned()
            .unwrap_or_default())
    }
}

// ============================================================================
// Context
// ============================================================================

/// A router wired to in-memory fakes.
pub struct TestContext {
    pub app: Router,
    pub orders: Arc<MemoryOrders>,
    pub events: Arc<MemoryEvents>,
    pub subscribers: Arc<MemorySubscribers>,
    pub mailer: Arc<RecordingMailer>,
    pub line_items: Arc<StaticLineItems>,
}

/// Configuration with placeholder secrets.
///
/// # Panics
///
/// Panics if the built-in test addresses fail to parse.
#[must_use]
pub fn test_config() -> FunctionsConfig {
    FunctionsConfig {
        database_url: SecretString::from("postgres://localhost/reform_test"),
        host: std::net::IpAddr::from([127, 0, 0, 1]),
        port: 0,
        app_url: "https://shop.example".to_string(),
        stripe: StripeConfig {
            secret_key: SecretString::from("sk_test_placeholder"),
            webhook_secret: SecretString::from(WEBHOOK_SECRET),
        },
        email: EmailConfig {
            resend_api_key: SecretString::from("re_test_placeholder"),
            from_address: Email::parse(FROM_ADDRESS).expect("valid from address"),
            support_address: Email::parse(SUPPORT_ADDRESS).expect("valid support address"),
        },
        sentry: SentryConfig::default(),
    }
}

impl TestContext {
    #[must_use]
    pub fn new() -> Self {
        let orders = Arc::new(MemoryOrders::default());
        let events = Arc::new(MemoryEvents::default());
        let subscribers = Arc::new(MemorySubscribers::default());
        let mailer = Arc::new(RecordingMailer::default());
        let line_items = Arc::new(StaticLineItems::default());

        let deps = Dependencies {
            orders: orders.clone(),
            events: events.clone(),
            subscribers: subscribers.clone(),
            mailer: mailer.clone(),
            line_items: line_items.clone(),
        };
        let state = AppState::with_dependencies(&test_config(), deps, None);

        Self {
            app: reform_shop_functions::app(state),
            orders,
            events,
            subscribers,
            mailer,
            line_items,
        }
    }

    /// Send a request and return the status and JSON body (`Null` if the
    /// body is not JSON).
    ///
    /// # Panics
    ///
    /// Panics if the body cannot be read.
    pub async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self
            .app
            .clone()
            .oneshot(request)
            .await
            .expect("router is infallible");
        let status = response.status();
        let bytes = response
            .into_body()
            .collect()
            .await
            .expect("read body")
            .to_bytes();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, body)
    }

    /// POST a JSON body.
    ///
    /// # Panics
    ///
    /// Panics if the request cannot be built.
    pub async fn post_json(&self, uri: &str, body: &Value) -> (StatusCode, Value) {
        let request = Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .expect("valid request");
        self.send(request).await
    }

    /// GET a URI.
    ///
    /// # Panics
    ///
    /// Panics if the request cannot be built.
    pub async fn get(&self, uri: &str) -> (StatusCode, Value) {
        let request = Request::builder()
            .uri(uri)
            .body(Body::empty())
            .expect("valid request");
        self.send(request).await
    }

    /// POST a Stripe event signed with [`WEBHOOK_SECRET`].
    ///
    /// # Panics
    ///
    /// Panics if the request cannot be built.
    pub async fn post_webhook(&self, event: &Value) -> (StatusCode, Value) {
        let payload = event.to_string();
        let signature = signature_header(payload.as_bytes(), Utc::now().timestamp(), WEBHOOK_SECRET);
        self.post_webhook_raw(payload, &signature).await
    }

    /// POST a webhook body with an explicit signature header.
    ///
    /// # Panics
    ///
    /// Panics if the request cannot be built.
    pub async fn post_webhook_raw(&self, payload: String, signature: &str) -> (StatusCode, Value) {
        let request = Request::builder()
            .method(Method::POST)
            .uri("/webhooks/stripe")
            .header(header::CONTENT_TYPE, "application/json")
            .header("stripe-signature", signature)
            .body(Body::from(payload))
            .expect("valid request");
        self.send(request).await
    }
}

impl Default for TestContext {
    fn default() -> Self {
        Self::new()
    }
}

/// A `checkout.session.completed` event with two embedded line items.
#[must_use]
pub fn checkout_completed_event(event_id: &str, session_id: &str) -> Value {
    serde_json::json!({
        "id": event_id,
        "type": "checkout.session.completed",
        "livemode": false,
        "data": {
            "object": {
                "id": session_id,
                "customer_details": {
                    "email": "jane@example.com",
                    "name": "Jane Smith",
                    "address": {
                        "line1": "1 High Street",
                        "city": "London",
                        "postal_code": "SW1A 1AA",
                        "country": "GB"
                    }
                },
                "amount_subtotal": 6498,
                "amount_total": 6997,
                "currency": "gbp",
                "shipping_cost": { "amount_total": 499 },
                "line_items": {
                    "data": [
                        { "id": "li_1", "description": "Reform Hoodie - Black / L", "quantity": 1, "amount_total": 4499 },
                        { "id": "li_2", "description": "Reform Cap - Navy", "quantity": 1, "amount_total": 1999 }
                    ],
                    "has_more": false
                }
            }
        }
    })
}
