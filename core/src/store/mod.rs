// harvesthub/core/src/store/mod.rs

//! Persistence seams. Every mutation of shared state (stock, order status,
//! payment flag) is a single conditional operation so concurrent requests
//! cannot interleave a read and a write.

mod memory;

pub use memory::InMemoryStore;

use crate::catalog::ProductQuery;
use crate::error::StoreError;
use crate::model::{Account, Money, Order, OrderStatus, PaymentResult, Product, SavedAddress};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

pub type StoreResult<T> = Result<T, StoreError>;

/// Outcome of a conditional stock decrement.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StockTake {
  Taken { remaining: f64 },
  Insufficient { available: f64 },
  Missing,
}

#[async_trait]
pub trait CatalogStore: Send + Sync {
  async fn search_products(&self, query: &ProductQuery) -> StoreResult<Vec<Product>>;

  async fn find_product(&self, id: Uuid) -> StoreResult<Option<Product>>;

  async fn insert_product(&self, product: &Product) -> StoreResult<()>;

  /// Overwrites the stored record. Stock is only written when
  /// `overwrite_stock` is set, so edits to other fields never clobber a
  /// concurrent reservation.
  async fn replace_product(&self, product: &Product, overwrite_stock: bool) -> StoreResult<bool>;

  async fn delete_product(&self, id: Uuid) -> StoreResult<bool>;

  /// Decrements stock by `amount` only if at least `amount` is available.
  async fn take_stock(&self, id: Uuid, amount: f64) -> StoreResult<StockTake>;

  /// Increments stock by `amount`. `None` when the product no longer exists.
  async fn return_stock(&self, id: Uuid, amount: f64) -> StoreResult<Option<f64>>;

  async fn count_products(&self) -> StoreResult<i64>;
}

#[async_trait]
pub trait AccountStore: Send + Sync {
  async fn find_account(&self, id: Uuid) -> StoreResult<Option<Account>>;

  async fn find_account_by_email(&self, email: &str) -> StoreResult<Option<Account>>;

  async fn find_account_by_external_id(&self, external_id: &str) -> StoreResult<Option<Account>>;

  /// Fails with [`StoreError::Conflict`] on a duplicate email or external id.
  async fn insert_account(&self, account: &Account) -> StoreResult<()>;

  async fn link_external_identity(&self, id: Uuid, external_id: &str, profile_pic: Option<&str>) -> StoreResult<bool>;

  async fn set_refresh_token(&self, id: Uuid, token: Option<&str>) -> StoreResult<bool>;

  async fn save_contact_details(&self, id: Uuid, address: &SavedAddress, phone: Option<&str>) -> StoreResult<bool>;

  /// Accounts with the `user` role.
  async fn count_customers(&self) -> StoreResult<i64>;
}

#[async_trait]
pub trait OrderLedger: Send + Sync {
  /// Fails with [`StoreError::Conflict`] when the account already has an
  /// order under the same idempotency key.
  async fn insert_order(&self, order: &Order) -> StoreResult<()>;

  async fn find_order(&self, id: Uuid) -> StoreResult<Option<Order>>;

  async fn find_by_idempotency_key(&self, account_id: Uuid, key: &str) -> StoreResult<Option<Order>>;

  /// Newest first.
  async fn orders_for_account(&self, account_id: Uuid) -> StoreResult<Vec<Order>>;

  /// Newest first.
  async fn all_orders(&self) -> StoreResult<Vec<Order>>;

  /// Moves the order from `from` to `to` only if it is currently in `from`.
  /// Returns the updated order when the transition happened.
  async fn transition_status(&self, id: Uuid, from: OrderStatus, to: OrderStatus) -> StoreResult<Option<Order>>;

  /// Marks an unpaid Processing order as paid. Returns the updated order
  /// when this call flipped the flag.
  async fn record_payment(&self, id: Uuid, result: &PaymentResult, paid_at: DateTime<Utc>) -> StoreResult<Option<Order>>;

  /// Marks a Processing or Shipped order as delivered.
  async fn mark_delivered(&self, id: Uuid, delivered_at: DateTime<Utc>) -> StoreResult<Option<Order>>;

  /// Revenue over orders that are not cancelled, and the count of all orders.
  async fn revenue_summary(&self) -> StoreResult<(Money, i64)>;
}
