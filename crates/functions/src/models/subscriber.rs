//! Newsletter subscriber domain types.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use reform_shop_core::{Email, SubscriberId};

/// A newsletter subscriber.
#[derive(Debug, Clone)]
pub struct Subscriber {
    pub id: SubscriberId,
    pub email: Email,
    pub discount_code: String,
    pub discount_percent: i32,
    /// Secret token embedded in unsubscribe links.
    pub unsubscribe_token: Uuid,
    pub is_active: bool,
    pub subscribed_at: DateTime<Utc>,
    pub unsubscribed_at: Option<DateTime<Utc>>,
    pub welcome_email_sent: bool,
    pub welcome_email_sent_at: Option<DateTime<Utc>>,
}

/// Subscriber data to insert.
#[derive(Debug, Clone)]
pub struct NewSubscriber {
    pub email: Email,
    pub discount_code: String,
    pub discount_percent: i32,
    pub unsubscribe_token: Uuid,
}
