//! Webhook event ledger.
//!
//! Every delivery is claimed by event id before processing. The row records
//! whether processing finished, so redeliveries of a completed event are
//! acknowledged without repeating side effects.

use async_trait::async_trait;
use sqlx::PgPool;

use super::{EventClaim, RepositoryError, WebhookEventStore};

/// Postgres-backed [`WebhookEventStore`].
#[derive(Clone)]
pub struct PgWebhookEventStore {
    pool: PgPool,
}

impl PgWebhookEventStore {
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl WebhookEventStore for PgWebhookEventStore {
    async fn claim(
        &self,
        event_id: &str,
        source: &str,
        event_type: &str,
    ) -> Result<EventClaim, RepositoryError> {
        let inserted: Option<String> = sqlx::query_scalar(
            r"
            INSERT INTO shop.webhook_events (event_id, source, event_type)
            VALUES ($1, $2, $3)
            ON CONFLICT (event_id) DO NOTHING
            RETURNING event_id
            ",
        )
        .bind(event_id)
        .bind(source)
        .bind(event_type)
        .fetch_optional(&self.pool)
        .await?;

        if inserted.is_some() {
            return Ok(EventClaim::New);
        }

        let processed: bool = sqlx::query_scalar(
            r"SELECT processed FROM shop.webhook_events WHERE event_id = $1",
        )
        .bind(event_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(if processed {
            EventClaim::AlreadyProcessed
        } else {
            EventClaim::Retry
        })
    }

    async fn mark_processed(&self, event_id: &str) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            r"
            UPDATE shop.webhook_events
            SET processed = TRUE, error = NULL, processed_at = NOW(), updated_at = NOW()
            WHERE event_id = $1
            ",
        )
        .bind(event_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    async fn mark_failed(&self, event_id: &str, error: &str) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            r"
            UPDATE shop.webhook_events
            SET processed = FALSE, error = $2, updated_at = NOW()
            WHERE event_id = $1
            ",
        )
        .bind(event_id)
        .bind(error)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}
