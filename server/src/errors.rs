// harvesthub/server/src/errors.rs

use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use harvesthub_core::CommerceError;
use serde_json::json;
use std::sync::atomic::{AtomicBool, Ordering};
use thiserror::Error;

static EXPOSE_DETAILS: AtomicBool = AtomicBool::new(false);

/// Includes internal failure details in 5xx bodies. Set once at startup in
/// development.
pub fn expose_error_details(enabled: bool) {
  EXPOSE_DETAILS.store(enabled, Ordering::Relaxed);
}

#[derive(Debug, Error)]
pub enum AppError {
  #[error(transparent)]
  Commerce(#[from] CommerceError),

  #[error("Validation Error: {0}")]
  Validation(String),

  #[error("Configuration Error: {0}")]
  Config(String),

  #[error("Service Unavailable: {0}")]
  Unavailable(String),

  #[error("Internal Server Error: {0}")]
  Internal(String),
}

fn commerce_status(err: &CommerceError) -> StatusCode {
  match err {
    CommerceError::NotFound { .. } => StatusCode::NOT_FOUND,
    CommerceError::InsufficientStock { .. }
    | CommerceError::InvalidState { .. }
    | CommerceError::InvalidSignature
    | CommerceError::Validation(_) => StatusCode::BAD_REQUEST,
    CommerceError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
    CommerceError::Forbidden(_) => StatusCode::FORBIDDEN,
    CommerceError::AlreadyExists(_) => StatusCode::CONFLICT,
    CommerceError::Gateway(_) => StatusCode::BAD_GATEWAY,
    CommerceError::Storage(_) | CommerceError::Flow(_) | CommerceError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
  }
}

impl ResponseError for AppError {
  fn status_code(&self) -> StatusCode {
    match self {
      AppError::Commerce(e) => commerce_status(e),
      AppError::Validation(_) => StatusCode::BAD_REQUEST,
      AppError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
      AppError::Config(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
  }

  fn error_response(&self) -> HttpResponse {
    let status = self.status_code();
    let body = match self {
      AppError::Commerce(CommerceError::InsufficientStock {
        product_id,
        available,
        required,
        unit,
        ..
      }) => json!({
        "error": self.to_string(),
        "productId": product_id,
        "available": available,
        "required": required,
        "unit": unit,
      }),
      AppError::Commerce(e) if !e.is_infrastructure() => json!({"error": e.to_string()}),
      AppError::Validation(m) | AppError::Unavailable(m) => json!({"error": m}),
      _ => {
        tracing::error!(application_error = %self, "Responding with server error");
        let summary = match self {
          AppError::Commerce(CommerceError::Gateway(_)) => "Payment provider error",
          AppError::Commerce(CommerceError::Storage(_)) => "Database operation failed",
          AppError::Config(_) => "Configuration issue",
          _ => "An internal error occurred",
        };
        if EXPOSE_DETAILS.load(Ordering::Relaxed) {
          json!({"error": summary, "detail": self.to_string()})
        } else {
          json!({"error": summary})
        }
      }
    };
    if status.is_client_error() {
      tracing::debug!(status = status.as_u16(), error = %self, "Request rejected");
    }
    HttpResponse::build(status).json(body)
  }
}

pub type Result<T, E = AppError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
  use super::*;
  use actix_web::body::MessageBody;
  use harvesthub_core::StoreError;
  use serial_test::serial;

  fn body_json(err: &AppError) -> serde_json::Value {
    let bytes = err.error_response().into_body().try_into_bytes().unwrap_or_default();
    serde_json::from_slice(&bytes).unwrap()
  }

  #[test]
  fn business_errors_map_to_client_statuses() {
    let cases = [
      (CommerceError::not_found("Order", "x"), StatusCode::NOT_FOUND),
      (CommerceError::InvalidSignature, StatusCode::BAD_REQUEST),
      (CommerceError::Unauthorized("no".into()), StatusCode::UNAUTHORIZED),
      (CommerceError::Forbidden("no".into()), StatusCode::FORBIDDEN),
      (CommerceError::AlreadyExists("User already exists".into()), StatusCode::CONFLICT),
    ];
    for (err, status) in cases {
      assert_eq!(AppError::from(err).status_code(), status);
    }
  }

  #[test]
  #[serial]
  fn storage_failures_are_opaque_by_default() {
    expose_error_details(false);
    let err = AppError::from(CommerceError::Storage(StoreError::Backend(anyhow::anyhow!(
      "password authentication failed for user postgres"
    ))));
    assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = body_json(&err);
    assert_eq!(body["error"], "Database operation failed");
    assert!(body.get("detail").is_none());
  }

  #[test]
  #[serial]
  fn development_exposes_failure_detail() {
    expose_error_details(true);
    let err = AppError::from(CommerceError::Gateway(harvesthub_core::GatewayError::Transport(
      "connection reset".to_string(),
    )));
    assert_eq!(err.status_code(), StatusCode::BAD_GATEWAY);
    let body = body_json(&err);
    expose_error_details(false);
    assert_eq!(body["error"], "Payment provider error");
    assert!(body["detail"].as_str().unwrap_or_default().contains("connection reset"));
  }

  #[test]
  fn unavailable_is_a_503_with_its_message() {
    let err = AppError::Unavailable("Too many sign-in attempts in progress".to_string());
    assert_eq!(err.status_code(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body_json(&err)["error"], "Too many sign-in attempts in progress");
  }

  #[test]
  fn insufficient_stock_body_carries_both_figures() {
    let err = AppError::from(CommerceError::insufficient_stock(
      uuid::Uuid::nil(),
      "Potato",
      0.5,
      0.75,
      harvesthub_core::model::StockUnit::G,
    ));
    let body = body_json(&err);
    assert_eq!(body["available"], 0.5);
    assert_eq!(body["required"], 0.75);
    assert_eq!(body["unit"], "kg");
  }
}
