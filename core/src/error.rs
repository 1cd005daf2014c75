// harvesthub/core/src/error.rs

use crate::flow::FlowError;
use crate::model::{OrderStatus, StockUnit};
use thiserror::Error;
use uuid::Uuid;

/// Failures raised by a store implementation.
#[derive(Debug, Error)]
pub enum StoreError {
  /// A unique constraint rejected the write (duplicate email, external id, idempotency key).
  #[error("Duplicate value for {0}")]
  Conflict(String),

  #[error("Storage backend failure: {0}")]
  Backend(#[source] anyhow::Error),
}

impl StoreError {
  pub fn backend<E>(err: E) -> Self
  where
    E: std::error::Error + Send + Sync + 'static,
  {
    StoreError::Backend(anyhow::Error::new(err))
  }
}

/// Failures returned by an external payment gateway.
#[derive(Debug, Error)]
pub enum GatewayError {
  #[error("Payment gateway rejected the request: {0}")]
  Rejected(String),

  #[error("Payment gateway unreachable: {0}")]
  Transport(String),
}

/// Domain error taxonomy shared by every HarvestHub operation.
#[derive(Debug, Error)]
pub enum CommerceError {
  #[error("{entity} not found: {id}")]
  NotFound { entity: &'static str, id: String },

  #[error("Insufficient stock for {product_name}. Available: {available} {unit}, Required: {required} {unit}")]
  InsufficientStock {
    product_id: Uuid,
    product_name: String,
    available: f64,
    required: f64,
    unit: &'static str,
  },

  #[error("{reason}")]
  InvalidState { status: OrderStatus, reason: String },

  #[error("{0}")]
  Unauthorized(String),

  #[error("{0}")]
  Forbidden(String),

  #[error("Invalid Signature")]
  InvalidSignature,

  #[error("{0}")]
  Validation(String),

  #[error("{0}")]
  AlreadyExists(String),

  #[error(transparent)]
  Gateway(#[from] GatewayError),

  #[error(transparent)]
  Storage(#[from] StoreError),

  #[error("Internal flow error: {0}")]
  Flow(#[from] FlowError),

  /// A local dependency failed (password hashing and the like).
  #[error("Internal error: {0}")]
  Internal(String),
}

impl CommerceError {
  pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
    CommerceError::NotFound {
      entity,
      id: id.to_string(),
    }
  }

  pub fn insufficient_stock(product_id: Uuid, product_name: &str, available: f64, required: f64, unit: StockUnit) -> Self {
    CommerceError::InsufficientStock {
      product_id,
      product_name: product_name.to_string(),
      available,
      required,
      unit: unit.stock_label(),
    }
  }

  /// True for failures of infrastructure rather than of the request itself.
  pub fn is_infrastructure(&self) -> bool {
    matches!(
      self,
      CommerceError::Gateway(_) | CommerceError::Storage(_) | CommerceError::Flow(_) | CommerceError::Internal(_)
    )
  }
}

pub type CommerceResult<T, E = CommerceError> = std::result::Result<T, E>;
