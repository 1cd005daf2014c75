// harvesthub/core/src/model/order.rs

use super::money::Money;
use super::unit::StockUnit;
use crate::error::{CommerceError, CommerceResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::str::FromStr;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OrderStatus {
  Processing,
  Shipped,
  Delivered,
  Cancelled,
}

impl OrderStatus {
  pub fn as_str(self) -> &'static str {
    match self {
      OrderStatus::Processing => "Processing",
      OrderStatus::Shipped => "Shipped",
      OrderStatus::Delivered => "Delivered",
      OrderStatus::Cancelled => "Cancelled",
    }
  }

  /// Why an order in this status cannot be cancelled, if it cannot.
  pub fn cancel_blocker(self) -> Option<&'static str> {
    match self {
      OrderStatus::Processing => None,
      OrderStatus::Shipped | OrderStatus::Delivered => {
        Some("Cannot cancel order that is already shipped or delivered")
      }
      OrderStatus::Cancelled => Some("Order is already cancelled"),
    }
  }
}

impl std::fmt::Display for OrderStatus {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for OrderStatus {
  type Err = String;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s {
      "Processing" => Ok(OrderStatus::Processing),
      "Shipped" => Ok(OrderStatus::Shipped),
      "Delivered" => Ok(OrderStatus::Delivered),
      "Cancelled" => Ok(OrderStatus::Cancelled),
      other => Err(format!("Unknown order status '{}'", other)),
    }
  }
}

/// Payment method chosen at checkout. Unrecognised values are kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PaymentMethod {
  Razorpay,
  Cod,
  Other(String),
}

impl PaymentMethod {
  pub fn as_str(&self) -> &str {
    match self {
      PaymentMethod::Razorpay => "Razorpay",
      PaymentMethod::Cod => "COD",
      PaymentMethod::Other(raw) => raw,
    }
  }
}

impl From<String> for PaymentMethod {
  fn from(raw: String) -> Self {
    match raw.as_str() {
      "Razorpay" => PaymentMethod::Razorpay,
      "COD" => PaymentMethod::Cod,
      _ => PaymentMethod::Other(raw),
    }
  }
}

impl std::fmt::Display for PaymentMethod {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.write_str(self.as_str())
  }
}

impl Serialize for PaymentMethod {
  fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(self.as_str())
  }
}

impl<'de> Deserialize<'de> for PaymentMethod {
  fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
    String::deserialize(deserializer).map(PaymentMethod::from)
  }
}

pub const PAYMENT_STATUS_PENDING_COD: &str = "Pending COD";
pub const PAYMENT_STATUS_SUCCESS: &str = "success";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentResult {
  pub id: Option<String>,
  pub status: String,
  pub update_time: Option<DateTime<Utc>>,
  pub email_address: Option<String>,
}

fn default_country() -> String {
  "India".to_string()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShippingAddress {
  pub address: String,
  pub city: String,
  pub postal_code: String,
  #[serde(default = "default_country")]
  pub country: String,
  pub phone: Option<String>,
}

/// One purchased product, frozen at the moment the order was placed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderLine {
  pub product_id: Uuid,
  pub name: String,
  pub quantity: u32,
  pub price: Money,
  pub image: String,
  pub unit: StockUnit,
  pub pack_size: f64,
}

impl OrderLine {
  /// `None` when price times quantity does not fit.
  pub fn line_total(&self) -> Option<Money> {
    self.price.checked_mul(self.quantity)
  }

  /// Stock this line took from the catalog, using the frozen unit and pack size.
  pub fn stock_amount(&self) -> f64 {
    self.unit.to_stock_units(self.quantity, self.pack_size)
  }
}

/// Shipping and tax rules applied to an order's subtotal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PricingPolicy {
  pub shipping_fee: Money,
  /// Subtotals strictly above this ship free.
  pub free_shipping_above: Money,
  pub tax_rate_bps: u32,
}

impl Default for PricingPolicy {
  fn default() -> Self {
    Self {
      shipping_fee: Money::from_minor(5_000),
      free_shipping_above: Money::from_minor(50_000),
      tax_rate_bps: 0,
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pricing {
  pub items_price: Money,
  pub tax_price: Money,
  pub shipping_price: Money,
  pub total_price: Money,
}

impl Pricing {
  /// Prices `lines` under `policy`. Fails when any figure overflows.
  pub fn compute(lines: &[OrderLine], policy: &PricingPolicy) -> CommerceResult<Self> {
    let too_large = || CommerceError::Validation("Order total is too large".to_string());
    let mut items_price = Money::ZERO;
    for line in lines {
      let line_total = line.line_total().ok_or_else(too_large)?;
      items_price = items_price.checked_add(line_total).ok_or_else(too_large)?;
    }
    let shipping_price = if items_price > policy.free_shipping_above {
      Money::ZERO
    } else {
      policy.shipping_fee
    };
    let tax_price = items_price.basis_points(policy.tax_rate_bps).ok_or_else(too_large)?;
    let total_price = items_price
      .checked_add(shipping_price)
      .and_then(|subtotal| subtotal.checked_add(tax_price))
      .ok_or_else(too_large)?;
    Ok(Self {
      items_price,
      tax_price,
      shipping_price,
      total_price,
    })
  }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
  pub id: Uuid,
  #[serde(rename = "user")]
  pub account_id: Uuid,
  #[serde(rename = "orderItems")]
  pub lines: Vec<OrderLine>,
  pub shipping_address: ShippingAddress,
  pub payment_method: PaymentMethod,
  pub payment_result: Option<PaymentResult>,
  #[serde(flatten)]
  pub pricing: Pricing,
  pub is_paid: bool,
  pub paid_at: Option<DateTime<Utc>>,
  pub is_delivered: bool,
  pub delivered_at: Option<DateTime<Utc>>,
  pub status: OrderStatus,
  #[serde(rename = "razorpayOrderId")]
  pub gateway_order_id: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub idempotency_key: Option<String>,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

impl Order {
  pub fn is_owned_by(&self, account_id: Uuid) -> bool {
    self.account_id == account_id
  }
}

/// Dashboard figures for administrators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderStats {
  /// Sum of totals over orders that are not cancelled.
  pub total_revenue: Money,
  pub total_orders: i64,
  pub total_products: i64,
  pub total_users: i64,
}
