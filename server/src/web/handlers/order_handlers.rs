// harvesthub/server/src/web/handlers/order_handlers.rs

use actix_web::{web, HttpRequest, HttpResponse};
use harvesthub_core::model::ClientOrderRequest;
use harvesthub_core::PaymentCallback;
use serde::Deserialize;
use serde_json::json;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::errors::AppError;
use crate::state::AppState;
use crate::web::extractors::{AdminAccount, AuthenticatedAccount};

pub const IDEMPOTENCY_HEADER: &str = "Idempotency-Key";

#[derive(Debug, Deserialize)]
pub struct VerifyPaymentPayload {
  #[serde(flatten)]
  pub callback: PaymentCallback,
  pub order_id: Uuid,
}

#[instrument(name = "handler::place_order", skip_all, fields(account_id = %caller.0.id))]
pub async fn place_order_handler(
  app_state: web::Data<AppState>,
  caller: AuthenticatedAccount,
  req: HttpRequest,
  payload: web::Json<ClientOrderRequest>,
) -> Result<HttpResponse, AppError> {
  let mut request = payload.into_inner();
  if request.idempotency_key.is_none() {
    if let Some(value) = req.headers().get(IDEMPOTENCY_HEADER) {
      let key = value
        .to_str()
        .map_err(|_| AppError::Validation("Idempotency-Key must be visible ASCII".to_string()))?;
      request.idempotency_key = Some(key.to_string());
    }
  }

  let placed = app_state.desk.place_order(&caller.0, request).await?;
  let body = match &placed.payment_intent {
    Some(intent) => json!({ "order": placed.order, "razorpayOrder": intent }),
    None => json!({ "order": placed.order }),
  };
  if placed.replayed {
    info!(order_id = %placed.order.id, "Returning previously placed order.");
    Ok(HttpResponse::Ok().json(body))
  } else {
    Ok(HttpResponse::Created().json(body))
  }
}

#[instrument(name = "handler::verify_payment", skip_all, fields(account_id = %caller.0.id, order_id = %payload.order_id))]
pub async fn verify_payment_handler(
  app_state: web::Data<AppState>,
  caller: AuthenticatedAccount,
  payload: web::Json<VerifyPaymentPayload>,
) -> Result<HttpResponse, AppError> {
  let VerifyPaymentPayload { callback, order_id } = payload.into_inner();
  let order = app_state.desk.verify_payment(&caller.0, order_id, &callback).await?;
  Ok(HttpResponse::Ok().json(json!({
    "message": "Payment success",
    "orderId": order_id,
    "order": order,
  })))
}

#[instrument(name = "handler::my_orders", skip_all, fields(account_id = %caller.0.id))]
pub async fn my_orders_handler(
  app_state: web::Data<AppState>,
  caller: AuthenticatedAccount,
) -> Result<HttpResponse, AppError> {
  let orders = app_state.desk.orders_for(&caller.0).await?;
  Ok(HttpResponse::Ok().json(orders))
}

#[instrument(name = "handler::get_order", skip(app_state, caller), fields(account_id = %caller.0.id))]
pub async fn get_order_handler(
  app_state: web::Data<AppState>,
  caller: AuthenticatedAccount,
  path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
  let order = app_state.desk.order_for_viewer(&caller.0, path.into_inner()).await?;
  Ok(HttpResponse::Ok().json(order))
}

#[instrument(name = "handler::all_orders", skip_all, fields(admin_id = %admin.0.id))]
pub async fn all_orders_handler(
  app_state: web::Data<AppState>,
  admin: AdminAccount,
) -> Result<HttpResponse, AppError> {
  let orders = app_state.desk.all_orders(&admin.0).await?;
  Ok(HttpResponse::Ok().json(orders))
}

#[instrument(name = "handler::order_stats", skip_all, fields(admin_id = %admin.0.id))]
pub async fn stats_handler(app_state: web::Data<AppState>, admin: AdminAccount) -> Result<HttpResponse, AppError> {
  let stats = app_state.desk.stats(&admin.0).await?;
  Ok(HttpResponse::Ok().json(stats))
}

#[instrument(name = "handler::cancel_order", skip(app_state, caller), fields(account_id = %caller.0.id))]
pub async fn cancel_order_handler(
  app_state: web::Data<AppState>,
  caller: AuthenticatedAccount,
  path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
  let order = app_state.desk.cancel_order(&caller.0, path.into_inner()).await?;
  Ok(HttpResponse::Ok().json(json!({ "message": "Order cancelled", "order": order })))
}

#[instrument(name = "handler::deliver_order", skip(app_state, admin), fields(admin_id = %admin.0.id))]
pub async fn deliver_order_handler(
  app_state: web::Data<AppState>,
  admin: AdminAccount,
  path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
  let order = app_state.desk.mark_delivered(&admin.0, path.into_inner()).await?;
  Ok(HttpResponse::Ok().json(order))
}
