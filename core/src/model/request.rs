// harvesthub/core/src/model/request.rs

//! Untrusted checkout input and its server-authoritative counterpart.

use super::order::{OrderLine, PaymentMethod, ShippingAddress};
use super::product::Product;
use crate::error::{CommerceError, CommerceResult};
use serde::Deserialize;
use uuid::Uuid;

/// One requested item as sent by the client. Only the product reference and
/// quantity are read; display fields the client may echo back are ignored.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientOrderItem {
  #[serde(alias = "productId")]
  pub product: Uuid,
  pub quantity: u32,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientOrderRequest {
  pub order_items: Vec<ClientOrderItem>,
  pub shipping_address: ShippingAddress,
  pub payment_method: PaymentMethod,
  #[serde(default)]
  pub idempotency_key: Option<String>,
}

impl ClientOrderRequest {
  /// Shape checks that need no catalog lookup.
  pub fn validate(&self) -> CommerceResult<()> {
    if self.order_items.is_empty() {
      return Err(CommerceError::Validation("No order items".to_string()));
    }
    if let Some(item) = self.order_items.iter().find(|i| i.quantity == 0) {
      return Err(CommerceError::Validation(format!(
        "Quantity for product {} must be at least 1",
        item.product
      )));
    }
    let addr = &self.shipping_address;
    if addr.address.trim().is_empty() || addr.city.trim().is_empty() || addr.postal_code.trim().is_empty() {
      return Err(CommerceError::Validation("Shipping address is incomplete".to_string()));
    }
    if matches!(&self.idempotency_key, Some(key) if key.trim().is_empty() || key.len() > 128) {
      return Err(CommerceError::Validation("Idempotency key must be 1 to 128 characters".to_string()));
    }
    Ok(())
  }
}

/// A requested item resolved against the catalog: every display field comes
/// from the product record, and the stock deduction is fixed here.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedOrderLine {
  pub line: OrderLine,
  /// Amount to take from `Product::stock`, already unit-converted.
  pub deduction: f64,
}

impl ValidatedOrderLine {
  pub fn from_catalog(item: &ClientOrderItem, product: &Product) -> Self {
    let deduction = product.unit.to_stock_units(item.quantity, product.pack_size);
    Self {
      line: OrderLine {
        product_id: product.id,
        name: product.name.clone(),
        quantity: item.quantity,
        price: product.price,
        image: product.primary_image().to_string(),
        unit: product.unit,
        pack_size: product.pack_size,
      },
      deduction,
    }
  }
}
