//! Newsletter subscriber repository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use reform_shop_core::{Email, SubscriberId};

use super::{RepositoryError, SubscriberStore};
use crate::models::{NewSubscriber, Subscriber};

const SUBSCRIBER_COLUMNS: &str = r"
    id, email, discount_code, discount_percent, unsubscribe_token, is_active,
    subscribed_at, unsubscribed_at, welcome_email_sent, welcome_email_sent_at
";

#[derive(sqlx::FromRow)]
struct SubscriberRow {
    id: Uuid,
    email: String,
    discount_code: String,
    discount_percent: i32,
    unsubscribe_token: Uuid,
    is_active: bool,
    subscribed_at: DateTime<Utc>,
    unsubscribed_at: Option<DateTime<Utc>>,
    welcome_email_sent: bool,
    welcome_email_sent_at: Option<DateTime<Utc>>,
}

impl TryFrom<SubscriberRow> for Subscriber {
    type Error = RepositoryError;

    fn try_from(row: SubscriberRow) -> Result<Self, Self::Error> {
        let email = Email::parse(&row.email).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid email in database: {e}"))
        })?;

        Ok(Self {
            id: SubscriberId::from(row.id),
            email,
            discount_code: row.discount_code,
            discount_percent: row.discount_percent,
            unsubscribe_token: row.unsubscribe_token,
            is_active: row.is_active,
            subscribed_at: row.subscribed_at,
            unsubscribed_at: row.unsubscribed_at,
            welcome_email_sent: row.welcome_email_sent,
            welcome_email_sent_at: row.welcome_email_sent_at,
        })
    }
}

/// Postgres-backed [`SubscriberStore`].
#[derive(Clone)]
pub struct PgSubscriberStore {
    pool: PgPool,
}

impl PgSubscriberStore {
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SubscriberStore for PgSubscriberStore {
    async fn find_by_email(&self, email: &Email) -> Result<Option<Subscriber>, RepositoryError> {
        let row = sqlx::query_as::<_, SubscriberRow>(&format!(
            "SELECT {SUBSCRIBER_COLUMNS} FROM shop.newsletter_subscribers WHERE email = $1"
        ))
        .bind(email.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.map(Subscriber::try_from).transpose()
    }

    async fn insert(&self, subscriber: NewSubscriber) -> Result<Subscriber, RepositoryError> {
        let row = sqlx::query_as::<_, SubscriberRow>(&format!(
            r"
            INSERT INTO shop.newsletter_subscribers (email, discount_code, discount_percent, unsubscribe_token)
            VALUES ($1, $2, $3, $4)
            RETURNING {SUBSCRIBER_COLUMNS}
            "
        ))
        .bind(subscriber.email.as_str())
        .bind(&subscriber.discount_code)
        .bind(subscriber.discount_percent)
        .bind(subscriber.unsubscribe_token)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| RepositoryError::from_insert(e, "subscriber"))?;

        Subscriber::try_from(row)
    }

    async fn reactivate(&self, id: SubscriberId) -> Result<Subscriber, RepositoryError> {
        let row = sqlx::query_as::<_, SubscriberRow>(&format!(
            r"
            UPDATE shop.newsletter_subscribers
            SET is_active = TRUE, unsubscribed_at = NULL, subscribed_at = NOW(), updated_at = NOW()
            WHERE id = $1
            RETURNING {SUBSCRIBER_COLUMNS}
            "
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)?;

        Subscriber::try_from(row)
    }

    async fn mark_welcome_sent(&self, id: SubscriberId) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            r"
            UPDATE shop.newsletter_subscribers
            SET welcome_email_sent = TRUE, welcome_email_sent_at = NOW(), updated_at = NOW()
            WHERE id = $1
            ",
        )
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    async fn find_by_token(&self, token: Uuid) -> Result<Option<Subscriber>, RepositoryError> {
        let row = sqlx::query_as::<_, SubscriberRow>(&format!(
            "SELECT {SUBSCRIBER_COLUMNS} FROM shop.newsletter_subscribers WHERE unsubscribe_token = $1"
        ))
        .bind(token)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Subscriber::try_from).transpose()
    }

    async fn deactivate(&self, id: SubscriberId) -> Result<Subscriber, RepositoryError> {
        let row = sqlx::query_as::<_, SubscriberRow>(&format!(
            r"
            UPDATE shop.newsletter_subscribers
            SET is_active = FALSE, unsubscribed_at = NOW(), updated_at = NOW()
            WHERE id = $1
            RETURNING {SUBSCRIBER_COLUMNS}
            "
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)?;

        Subscriber::try_from(row)
    }
}
