// harvesthub/server/src/db/rows.rs

//! Row shapes as stored in Postgres and their conversion to domain types.

use chrono::{DateTime, Utc};
use harvesthub_core::model::{
  Account, Category, Money, Order, OrderLine, OrderStatus, PaymentMethod, PaymentResult, Pricing, Product, Role,
  SavedAddress, ShippingAddress, StockUnit,
};
use harvesthub_core::StoreError;
use sqlx::types::Json;
use sqlx::FromRow;
use uuid::Uuid;

fn corrupt(what: &str, detail: impl std::fmt::Display) -> StoreError {
  StoreError::Backend(anyhow::anyhow!("Corrupt {} in database: {}", what, detail))
}

pub const PRODUCT_COLUMNS: &str = "id, name, description, short_description, price_minor, category, images, stock, \
   pack_size, unit, rating, num_reviews, is_organic, created_at, updated_at";

#[derive(Debug, FromRow)]
pub struct ProductRow {
  pub id: Uuid,
  pub name: String,
  pub description: String,
  pub short_description: Option<String>,
  pub price_minor: i64,
  pub category: String,
  pub images: Json<Vec<String>>,
  pub stock: f64,
  pub pack_size: f64,
  pub unit: String,
  pub rating: f64,
  pub num_reviews: i32,
  pub is_organic: bool,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

impl TryFrom<ProductRow> for Product {
  type Error = StoreError;

  fn try_from(row: ProductRow) -> Result<Self, Self::Error> {
    let category = row
      .category
      .parse::<Category>()
      .map_err(|e| corrupt("product category", e))?;
    let unit = row.unit.parse::<StockUnit>().map_err(|e| corrupt("product unit", e))?;
    Ok(Product {
      id: row.id,
      name: row.name,
      description: row.description,
      short_description: row.short_description,
      price: Money::from_minor(row.price_minor),
      category,
      images: row.images.0,
      stock: row.stock,
      pack_size: row.pack_size,
      unit,
      rating: row.rating,
      num_reviews: row.num_reviews,
      is_organic: row.is_organic,
      created_at: row.created_at,
      updated_at: row.updated_at,
    })
  }
}

pub const ACCOUNT_COLUMNS: &str =
  "id, name, email, password_hash, google_id, profile_pic, role, phone, address, refresh_token, created_at, updated_at";

#[derive(Debug, FromRow)]
pub struct AccountRow {
  pub id: Uuid,
  pub name: String,
  pub email: String,
  pub password_hash: Option<String>,
  pub google_id: Option<String>,
  pub profile_pic: String,
  pub role: String,
  pub phone: Option<String>,
  pub address: Option<Json<SavedAddress>>,
  pub refresh_token: Option<String>,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

impl TryFrom<AccountRow> for Account {
  type Error = StoreError;

  fn try_from(row: AccountRow) -> Result<Self, Self::Error> {
    let role = Role::parse(&row.role).ok_or_else(|| corrupt("account role", &row.role))?;
    Ok(Account {
      id: row.id,
      name: row.name,
      email: row.email,
      password_hash: row.password_hash,
      external_id: row.google_id,
      profile_pic: row.profile_pic,
      role,
      phone: row.phone,
      address: row.address.map(|a| a.0),
      refresh_token: row.refresh_token,
      created_at: row.created_at,
      updated_at: row.updated_at,
    })
  }
}

pub const ORDER_COLUMNS: &str = "id, account_id, lines, shipping_address, payment_method, payment_result, \
   items_price, tax_price, shipping_price, total_price, is_paid, paid_at, is_delivered, delivered_at, status, \
   gateway_order_id, idempotency_key, created_at, updated_at";

#[derive(Debug, FromRow)]
pub struct OrderRow {
  pub id: Uuid,
  pub account_id: Uuid,
  pub lines: Json<Vec<OrderLine>>,
  pub shipping_address: Json<ShippingAddress>,
  pub payment_method: String,
  pub payment_result: Option<Json<PaymentResult>>,
  pub items_price: i64,
  pub tax_price: i64,
  pub shipping_price: i64,
  pub total_price: i64,
  pub is_paid: bool,
  pub paid_at: Option<DateTime<Utc>>,
  pub is_delivered: bool,
  pub delivered_at: Option<DateTime<Utc>>,
  pub status: String,
  pub gateway_order_id: Option<String>,
  pub idempotency_key: Option<String>,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

impl TryFrom<OrderRow> for Order {
  type Error = StoreError;

  fn try_from(row: OrderRow) -> Result<Self, Self::Error> {
    let status = row.status.parse::<OrderStatus>().map_err(|e| corrupt("order status", e))?;
    Ok(Order {
      id: row.id,
      account_id: row.account_id,
      lines: row.lines.0,
      shipping_address: row.shipping_address.0,
      payment_method: PaymentMethod::from(row.payment_method),
      payment_result: row.payment_result.map(|r| r.0),
      pricing: Pricing {
        items_price: Money::from_minor(row.items_price),
        tax_price: Money::from_minor(row.tax_price),
        shipping_price: Money::from_minor(row.shipping_price),
        total_price: Money::from_minor(row.total_price),
      },
      is_paid: row.is_paid,
      paid_at: row.paid_at,
      is_delivered: row.is_delivered,
      delivered_at: row.delivered_at,
      status,
      gateway_order_id: row.gateway_order_id,
      idempotency_key: row.idempotency_key,
      created_at: row.created_at,
      updated_at: row.updated_at,
    })
  }
}

/// Maps a unique-constraint violation to `Conflict`, anything else to `Backend`.
pub fn classify(err: sqlx::Error) -> StoreError {
  if let sqlx::Error::Database(db_err) = &err {
    if db_err.is_unique_violation() {
      let field = match db_err.constraint() {
        Some("accounts_email_key") => "email",
        Some("accounts_google_id_key") => "external id",
        Some("orders_idempotency_key") => "idempotency key",
        Some(other) => other,
        None => "unique field",
      };
      return StoreError::Conflict(field.to_string());
    }
  }
  StoreError::backend(err)
}
