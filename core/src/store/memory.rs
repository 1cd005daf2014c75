// harvesthub/core/src/store/memory.rs

use super::{AccountStore, CatalogStore, OrderLedger, StockTake, StoreResult};
use crate::catalog::ProductQuery;
use crate::error::StoreError;
use crate::model::{settle, Account, Money, Order, OrderStatus, PaymentResult, Product, Role, SavedAddress};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::collections::HashMap;
use uuid::Uuid;

/// Process-local implementation of all three stores. Each operation holds a
/// single lock for its whole check-and-write, which gives the same atomicity
/// the SQL stores get from conditional `UPDATE` statements.
#[derive(Debug, Default)]
pub struct InMemoryStore {
  products: Mutex<HashMap<Uuid, Product>>,
  accounts: Mutex<HashMap<Uuid, Account>>,
  orders: Mutex<HashMap<Uuid, Order>>,
}

impl InMemoryStore {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn with_products(products: impl IntoIterator<Item = Product>) -> Self {
    let store = Self::new();
    store.products.lock().extend(products.into_iter().map(|p| (p.id, p)));
    store
  }

  /// Current stock of a product, for assertions and diagnostics.
  pub fn stock_of(&self, id: Uuid) -> Option<f64> {
    self.products.lock().get(&id).map(|p| p.stock)
  }
}

fn newest_first(mut orders: Vec<Order>) -> Vec<Order> {
  orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
  orders
}

#[async_trait]
impl CatalogStore for InMemoryStore {
  async fn search_products(&self, query: &ProductQuery) -> StoreResult<Vec<Product>> {
    let snapshot: Vec<Product> = self.products.lock().values().cloned().collect();
    Ok(query.apply(snapshot))
  }

  async fn find_product(&self, id: Uuid) -> StoreResult<Option<Product>> {
    Ok(self.products.lock().get(&id).cloned())
  }

  async fn insert_product(&self, product: &Product) -> StoreResult<()> {
    let mut products = self.products.lock();
    if products.contains_key(&product.id) {
      return Err(StoreError::Conflict(format!("product id {}", product.id)));
    }
    products.insert(product.id, product.clone());
    Ok(())
  }

  async fn replace_product(&self, product: &Product, overwrite_stock: bool) -> StoreResult<bool> {
    let mut products = self.products.lock();
    let Some(current) = products.get_mut(&product.id) else {
      return Ok(false);
    };
    let stock = if overwrite_stock { product.stock } else { current.stock };
    *current = Product {
      stock,
      ..product.clone()
    };
    Ok(true)
  }

  async fn delete_product(&self, id: Uuid) -> StoreResult<bool> {
    Ok(self.products.lock().remove(&id).is_some())
  }

  async fn take_stock(&self, id: Uuid, amount: f64) -> StoreResult<StockTake> {
    let mut products = self.products.lock();
    let Some(product) = products.get_mut(&id) else {
      return Ok(StockTake::Missing);
    };
    if product.stock < amount {
      return Ok(StockTake::Insufficient {
        available: product.stock,
      });
    }
    product.stock = settle(product.stock - amount);
    product.updated_at = Utc::now();
    Ok(StockTake::Taken {
      remaining: product.stock,
    })
  }

  async fn return_stock(&self, id: Uuid, amount: f64) -> StoreResult<Option<f64>> {
    let mut products = self.products.lock();
    Ok(products.get_mut(&id).map(|product| {
      product.stock = settle(product.stock + amount);
      product.updated_at = Utc::now();
      product.stock
    }))
  }

  async fn count_products(&self) -> StoreResult<i64> {
    Ok(self.products.lock().len() as i64)
  }
}

#[async_trait]
impl AccountStore for InMemoryStore {
  async fn find_account(&self, id: Uuid) -> StoreResult<Option<Account>> {
    Ok(self.accounts.lock().get(&id).cloned())
  }

  async fn find_account_by_email(&self, email: &str) -> StoreResult<Option<Account>> {
    Ok(self.accounts.lock().values().find(|a| a.email == email).cloned())
  }

  async fn find_account_by_external_id(&self, external_id: &str) -> StoreResult<Option<Account>> {
    Ok(
      self
        .accounts
        .lock()
        .values()
        .find(|a| a.external_id.as_deref() == Some(external_id))
        .cloned(),
    )
  }

  async fn insert_account(&self, account: &Account) -> StoreResult<()> {
    let mut accounts = self.accounts.lock();
    if accounts.values().any(|a| a.email == account.email) {
      return Err(StoreError::Conflict("email".to_string()));
    }
    if account.external_id.is_some() && accounts.values().any(|a| a.external_id == account.external_id) {
      return Err(StoreError::Conflict("external id".to_string()));
    }
    accounts.insert(account.id, account.clone());
    Ok(())
  }

  async fn link_external_identity(&self, id: Uuid, external_id: &str, profile_pic: Option<&str>) -> StoreResult<bool> {
    let mut accounts = self.accounts.lock();
    if accounts
      .values()
      .any(|a| a.id != id && a.external_id.as_deref() == Some(external_id))
    {
      return Err(StoreError::Conflict("external id".to_string()));
    }
    let Some(account) = accounts.get_mut(&id) else {
      return Ok(false);
    };
    account.external_id = Some(external_id.to_string());
    if let Some(pic) = profile_pic {
      account.profile_pic = pic.to_string();
    }
    account.updated_at = Utc::now();
    Ok(true)
  }

  async fn set_refresh_token(&self, id: Uuid, token: Option<&str>) -> StoreResult<bool> {
    let mut accounts = self.accounts.lock();
    Ok(match accounts.get_mut(&id) {
      Some(account) => {
        account.refresh_token = token.map(str::to_string);
        account.updated_at = Utc::now();
        true
      }
      None => false,
    })
  }

  async fn save_contact_details(&self, id: Uuid, address: &SavedAddress, phone: Option<&str>) -> StoreResult<bool> {
    let mut accounts = self.accounts.lock();
    Ok(match accounts.get_mut(&id) {
      Some(account) => {
        account.address = Some(address.clone());
        if let Some(phone) = phone {
          account.phone = Some(phone.to_string());
        }
        account.updated_at = Utc::now();
        true
      }
      None => false,
    })
  }

  async fn count_customers(&self) -> StoreResult<i64> {
    Ok(self.accounts.lock().values().filter(|a| a.role == Role::User).count() as i64)
  }
}

#[async_trait]
impl OrderLedger for InMemoryStore {
  async fn insert_order(&self, order: &Order) -> StoreResult<()> {
    let mut orders = self.orders.lock();
    if let Some(key) = &order.idempotency_key {
      let taken = orders
        .values()
        .any(|o| o.account_id == order.account_id && o.idempotency_key.as_ref() == Some(key));
      if taken {
        return Err(StoreError::Conflict("idempotency key".to_string()));
      }
    }
    orders.insert(order.id, order.clone());
    Ok(())
  }

  async fn find_order(&self, id: Uuid) -> StoreResult<Option<Order>> {
    Ok(self.orders.lock().get(&id).cloned())
  }

  async fn find_by_idempotency_key(&self, account_id: Uuid, key: &str) -> StoreResult<Option<Order>> {
    Ok(
      self
        .orders
        .lock()
        .values()
        .find(|o| o.account_id == account_id && o.idempotency_key.as_deref() == Some(key))
        .cloned(),
    )
  }

  async fn orders_for_account(&self, account_id: Uuid) -> StoreResult<Vec<Order>> {
    let mine = self
      .orders
      .lock()
      .values()
      .filter(|o| o.account_id == account_id)
      .cloned()
      .collect();
    Ok(newest_first(mine))
  }

  async fn all_orders(&self) -> StoreResult<Vec<Order>> {
    let all = self.orders.lock().values().cloned().collect();
    Ok(newest_first(all))
  }

  async fn transition_status(&self, id: Uuid, from: OrderStatus, to: OrderStatus) -> StoreResult<Option<Order>> {
    let mut orders = self.orders.lock();
    Ok(match orders.get_mut(&id) {
      Some(order) if order.status == from => {
        order.status = to;
        order.updated_at = Utc::now();
        Some(order.clone())
      }
      _ => None,
    })
  }

  async fn record_payment(&self, id: Uuid, result: &PaymentResult, paid_at: DateTime<Utc>) -> StoreResult<Option<Order>> {
    let mut orders = self.orders.lock();
    Ok(match orders.get_mut(&id) {
      Some(order) if !order.is_paid && order.status == OrderStatus::Processing => {
        order.is_paid = true;
        order.paid_at = Some(paid_at);
        order.payment_result = Some(result.clone());
        order.updated_at = paid_at;
        Some(order.clone())
      }
      _ => None,
    })
  }

  async fn mark_delivered(&self, id: Uuid, delivered_at: DateTime<Utc>) -> StoreResult<Option<Order>> {
    let mut orders = self.orders.lock();
    Ok(match orders.get_mut(&id) {
      Some(order) if matches!(order.status, OrderStatus::Processing | OrderStatus::Shipped) => {
        order.is_delivered = true;
        order.delivered_at = Some(delivered_at);
        order.status = OrderStatus::Delivered;
        order.updated_at = delivered_at;
        Some(order.clone())
      }
      _ => None,
    })
  }

  async fn revenue_summary(&self) -> StoreResult<(Money, i64)> {
    let orders = self.orders.lock();
    let revenue = orders
      .values()
      .filter(|o| o.status != OrderStatus::Cancelled)
      .map(|o| o.pricing.total_price)
      .sum();
    Ok((revenue, orders.len() as i64))
  }
}
