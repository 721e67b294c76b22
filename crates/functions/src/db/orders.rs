//! Order repository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use reform_shop_core::{CurrencyCode, OrderId, OrderItemId, OrderStatus, Price};

use super::{OrderStore, RepositoryError};
use crate::models::{NewOrder, NewOrderItem, Order, OrderItem};

const ORDER_COLUMNS: &str = r"
    id, readable_order_id, stripe_session_id, customer_email, customer_name,
    customer_details, shipping_details, currency,
    amount_subtotal_pence, amount_shipping_pence, amount_total_pence,
    status, created_at
";

#[derive(sqlx::FromRow)]
struct OrderRow {
    id: Uuid,
    readable_order_id: String,
    stripe_session_id: String,
    customer_email: String,
    customer_name: Option<String>,
    customer_details: serde_json::Value,
    shipping_details: Option<serde_json::Value>,
    currency: String,
    amount_subtotal_pence: i64,
    amount_shipping_pence: i64,
    amount_total_pence: i64,
    status: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<OrderRow> for Order {
    type Error = RepositoryError;

    fn try_from(row: OrderRow) -> Result<Self, Self::Error> {
        let currency = CurrencyCode::parse(&row.currency).ok_or_else(|| {
            RepositoryError::DataCorruption(format!("unknown currency: {}", row.currency))
        })?;
        let status = row.status.parse::<OrderStatus>().map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid order status: {e}"))
        })?;

        Ok(Self {
            id: OrderId::from(row.id),
            readable_order_id: row.readable_order_id,
            stripe_session_id: row.stripe_session_id,
            customer_email: row.customer_email,
            customer_name: row.customer_name,
            customer_details: row.customer_details,
            shipping_details: row.shipping_details,
            subtotal: Price::from_minor_units(row.amount_subtotal_pence, currency),
            shipping: Price::from_minor_units(row.amount_shipping_pence, currency),
            total: Price::from_minor_units(row.amount_total_pence, currency),
            status,
            created_at: row.created_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct OrderItemRow {
    id: Uuid,
    order_id: Uuid,
    name: String,
    quantity: i32,
    unit_price_pence: i64,
    line_total_pence: i64,
}

impl OrderItemRow {
    fn into_item(self, currency: CurrencyCode) -> OrderItem {
        OrderItem {
            id: OrderItemId::from(self.id),
            order_id: OrderId::from(self.order_id),
            name: self.name,
            quantity: self.quantity,
            unit_price: Price::from_minor_units(self.unit_price_pence, currency),
            line_total: Price::from_minor_units(self.line_total_pence, currency),
        }
    }
}

/// Postgres-backed [`OrderStore`].
#[derive(Clone)]
pub struct PgOrderStore {
    pool: PgPool,
}

impl PgOrderStore {
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn currency_of(&self, id: OrderId) -> Result<Option<CurrencyCode>, RepositoryError> {
        let currency: Option<String> =
            sqlx::query_scalar(r"SELECT currency FROM shop.orders WHERE id = $1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;

        currency
            .map(|c| {
                CurrencyCode::parse(&c).ok_or_else(|| {
                    RepositoryError::DataCorruption(format!("unknown currency: {c}"))
                })
            })
            .transpose()
    }
}

#[async_trait]
impl OrderStore for PgOrderStore {
    async fn create_order(
        &self,
        order: NewOrder,
        items: Vec<NewOrderItem>,
    ) -> Result<(Order, Vec<OrderItem>), RepositoryError> {
        let currency = order.currency;
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query_as::<_, OrderRow>(&format!(
            r"
            INSERT INTO shop.orders (
                readable_order_id, stripe_session_id, customer_email, customer_name,
                customer_details, shipping_details, currency,
                amount_subtotal_pence, amount_shipping_pence, amount_total_pence, status
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            RETURNING {ORDER_COLUMNS}
            "
        ))
        .bind(&order.readable_order_id)
        .bind(&order.stripe_session_id)
        .bind(&order.customer_email)
        .bind(&order.customer_name)
        .bind(&order.customer_details)
        .bind(&order.shipping_details)
        .bind(currency.as_str())
        .bind(order.subtotal_pence)
        .bind(order.shipping_pence)
        .bind(order.total_pence)
        .bind(order.status.as_str())
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| RepositoryError::from_insert(e, "order for this checkout session"))?;

        let order = Order::try_from(row)?;

        let mut stored = Vec::with_capacity(items.len());
        for item in items {
            let row = sqlx::query_as::<_, OrderItemRow>(
                r"
                INSERT INTO shop.order_items (order_id, name, quantity, unit_price_pence, line_total_pence)
                VALUES ($1, $2, $3, $4, $5)
                RETURNING id, order_id, name, quantity, unit_price_pence, line_total_pence
                ",
            )
            .bind(order.id)
            .bind(&item.name)
            .bind(item.quantity)
            .bind(item.unit_price_pence)
            .bind(item.line_total_pence)
            .fetch_one(&mut *tx)
            .await?;
            stored.push(row.into_item(currency));
        }

        tx.commit().await?;

        tracing::info!(
            order_id = %order.id,
            readable_order_id = %order.readable_order_id,
            items = stored.len(),
            "Order stored"
        );

        Ok((order, stored))
    }

    async fn get_order(&self, id: OrderId) -> Result<Option<Order>, RepositoryError> {
        let row = sqlx::query_as::<_, OrderRow>(&format!(
            "SELECT {ORDER_COLUMNS} FROM shop.orders WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Order::try_from).transpose()
    }

    async fn order_items(&self, id: OrderId) -> Result<Vec<OrderItem>, RepositoryError> {
        let Some(currency) = self.currency_of(id).await? else {
            return Err(RepositoryError::NotFound);
        };

        let rows = sqlx::query_as::<_, OrderItemRow>(
            r"
            SELECT id, order_id, name, quantity, unit_price_pence, line_total_pence
            FROM shop.order_items
            WHERE order_id = $1
            ORDER BY created_at, id
            ",
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(|r| r.into_item(currency)).collect())
    }

    async fn find_by_session(&self, session_id: &str) -> Result<Option<Order>, RepositoryError> {
        let row = sqlx::query_as::<_, OrderRow>(&format!(
            "SELECT {ORDER_COLUMNS} FROM shop.orders WHERE stripe_session_id = $1"
        ))
        .bind(session_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Order::try_from).transpose()
    }
}
