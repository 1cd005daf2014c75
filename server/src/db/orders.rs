// harvesthub/server/src/db/orders.rs

use super::rows::{classify, OrderRow, ORDER_COLUMNS};
use super::PgStore;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use harvesthub_core::model::{Money, Order, OrderStatus, PaymentResult};
use harvesthub_core::{OrderLedger, StoreResult};
use sqlx::types::Json;
use tracing::instrument;
use uuid::Uuid;

fn into_orders(rows: Vec<OrderRow>) -> StoreResult<Vec<Order>> {
  rows.into_iter().map(Order::try_from).collect()
}

impl PgStore {
  async fn fetch_order(&self, sql: &str, id: Uuid) -> StoreResult<Option<Order>> {
    let row: Option<OrderRow> = sqlx::query_as(sql)
      .bind(id)
      .fetch_optional(&self.pool)
      .await
      .map_err(classify)?;
    row.map(Order::try_from).transpose()
  }
}

#[async_trait]
impl OrderLedger for PgStore {
  #[instrument(name = "pg::insert_order", skip(self, order), fields(order_id = %order.id))]
  async fn insert_order(&self, order: &Order) -> StoreResult<()> {
    sqlx::query(
      "INSERT INTO orders (id, account_id, lines, shipping_address, payment_method, payment_result, items_price, \
       tax_price, shipping_price, total_price, is_paid, paid_at, is_delivered, delivered_at, status, \
       gateway_order_id, idempotency_key, created_at, updated_at) \
       VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18, $19)",
    )
    .bind(order.id)
    .bind(order.account_id)
    .bind(Json(&order.lines))
    .bind(Json(&order.shipping_address))
    .bind(order.payment_method.as_str())
    .bind(order.payment_result.as_ref().map(Json))
    .bind(order.pricing.items_price.minor())
    .bind(order.pricing.tax_price.minor())
    .bind(order.pricing.shipping_price.minor())
    .bind(order.pricing.total_price.minor())
    .bind(order.is_paid)
    .bind(order.paid_at)
    .bind(order.is_delivered)
    .bind(order.delivered_at)
    .bind(order.status.as_str())
    .bind(&order.gateway_order_id)
    .bind(&order.idempotency_key)
    .bind(order.created_at)
    .bind(order.updated_at)
    .execute(&self.pool)
    .await
    .map_err(classify)?;
    Ok(())
  }

  async fn find_order(&self, id: Uuid) -> StoreResult<Option<Order>> {
    self
      .fetch_order(&format!("SELECT {} FROM orders WHERE id = $1", ORDER_COLUMNS), id)
      .await
  }

  async fn find_by_idempotency_key(&self, account_id: Uuid, key: &str) -> StoreResult<Option<Order>> {
    let row: Option<OrderRow> = sqlx::query_as(&format!(
      "SELECT {} FROM orders WHERE account_id = $1 AND idempotency_key = $2",
      ORDER_COLUMNS
    ))
    .bind(account_id)
    .bind(key)
    .fetch_optional(&self.pool)
    .await
    .map_err(classify)?;
    row.map(Order::try_from).transpose()
  }

  async fn orders_for_account(&self, account_id: Uuid) -> StoreResult<Vec<Order>> {
    let rows: Vec<OrderRow> = sqlx::query_as(&format!(
      "SELECT {} FROM orders WHERE account_id = $1 ORDER BY created_at DESC",
      ORDER_COLUMNS
    ))
    .bind(account_id)
    .fetch_all(&self.pool)
    .await
    .map_err(classify)?;
    into_orders(rows)
  }

  async fn all_orders(&self) -> StoreResult<Vec<Order>> {
    let rows: Vec<OrderRow> = sqlx::query_as(&format!("SELECT {} FROM orders ORDER BY created_at DESC", ORDER_COLUMNS))
      .fetch_all(&self.pool)
      .await
      .map_err(classify)?;
    into_orders(rows)
  }

  #[instrument(name = "pg::transition_status", skip(self))]
  async fn transition_status(&self, id: Uuid, from: OrderStatus, to: OrderStatus) -> StoreResult<Option<Order>> {
    let row: Option<OrderRow> = sqlx::query_as(&format!(
      "UPDATE orders SET status = $3, updated_at = NOW() WHERE id = $1 AND status = $2 RETURNING {}",
      ORDER_COLUMNS
    ))
    .bind(id)
    .bind(from.as_str())
    .bind(to.as_str())
    .fetch_optional(&self.pool)
    .await
    .map_err(classify)?;
    row.map(Order::try_from).transpose()
  }

  #[instrument(name = "pg::record_payment", skip(self, result))]
  async fn record_payment(&self, id: Uuid, result: &PaymentResult, paid_at: DateTime<Utc>) -> StoreResult<Option<Order>> {
    let row: Option<OrderRow> = sqlx::query_as(&format!(
      "UPDATE orders SET is_paid = TRUE, paid_at = $2, payment_result = $3, updated_at = $2 \
       WHERE id = $1 AND is_paid = FALSE AND status = 'Processing' RETURNING {}",
      ORDER_COLUMNS
    ))
    .bind(id)
    .bind(paid_at)
    .bind(Json(result))
    .fetch_optional(&self.pool)
    .await
    .map_err(classify)?;
    row.map(Order::try_from).transpose()
  }

  #[instrument(name = "pg::mark_delivered", skip(self))]
  async fn mark_delivered(&self, id: Uuid, delivered_at: DateTime<Utc>) -> StoreResult<Option<Order>> {
    let row: Option<OrderRow> = sqlx::query_as(&format!(
      "UPDATE orders SET is_delivered = TRUE, delivered_at = $2, status = 'Delivered', updated_at = $2 \
       WHERE id = $1 AND status IN ('Processing', 'Shipped') RETURNING {}",
      ORDER_COLUMNS
    ))
    .bind(id)
    .bind(delivered_at)
    .fetch_optional(&self.pool)
    .await
    .map_err(classify)?;
    row.map(Order::try_from).transpose()
  }

  async fn revenue_summary(&self) -> StoreResult<(Money, i64)> {
    let (revenue, count): (i64, i64) = sqlx::query_as(
      "SELECT COALESCE(SUM(total_price) FILTER (WHERE status <> 'Cancelled'), 0)::BIGINT, COUNT(*) FROM orders",
    )
    .fetch_one(&self.pool)
    .await
    .map_err(classify)?;
    Ok((Money::from_minor(revenue), count))
  }
}
