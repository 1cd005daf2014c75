// harvesthub/server/src/web/routes.rs

use actix_web::{web, HttpResponse};
use serde_json::json;
use tracing::error;

use crate::errors::AppError;
use crate::state::AppState;
use crate::web::handlers::{auth_handlers, catalog_handlers, order_handlers};

async fn health_check_handler(app_state: web::Data<AppState>) -> HttpResponse {
  if let Some(db) = &app_state.db {
    if let Err(e) = sqlx::query("SELECT 1").execute(db.pool()).await {
      error!(error = %e, "Health check could not reach the database.");
      return HttpResponse::ServiceUnavailable().json(json!({ "status": "degraded", "database": "unreachable" }));
    }
  }
  HttpResponse::Ok().json(json!({ "status": "ok" }))
}

/// Extractor failures answer with the same `{"error": ..}` body as handler
/// errors.
fn extractor_configs(cfg: &mut web::ServiceConfig) {
  cfg
    .app_data(web::JsonConfig::default().error_handler(|err, _req| AppError::Validation(err.to_string()).into()))
    .app_data(web::QueryConfig::default().error_handler(|err, _req| AppError::Validation(err.to_string()).into()))
    .app_data(
      web::PathConfig::default().error_handler(|err, _req| AppError::Validation(format!("Invalid id: {}", err)).into()),
    );
}

pub fn configure_app_routes(cfg: &mut web::ServiceConfig) {
  extractor_configs(cfg);
  cfg
    .route("/health", web::get().to(health_check_handler))
    .service(
      web::scope("/auth")
        .route("/register", web::post().to(auth_handlers::register_handler))
        .route("/login", web::post().to(auth_handlers::login_handler))
        .route("/refresh", web::post().to(auth_handlers::refresh_handler))
        .route("/me", web::get().to(auth_handlers::me_handler))
        .route("/google", web::get().to(auth_handlers::google_start_handler))
        .route("/google/callback", web::get().to(auth_handlers::google_callback_handler)),
    )
    .service(
      web::scope("/api/vegetables")
        .route("", web::get().to(catalog_handlers::list_products_handler))
        .route("", web::post().to(catalog_handlers::create_product_handler))
        .route("/seed", web::post().to(catalog_handlers::seed_products_handler))
        .route("/{id}", web::get().to(catalog_handlers::get_product_handler))
        .route("/{id}", web::put().to(catalog_handlers::update_product_handler))
        .route("/{id}", web::delete().to(catalog_handlers::delete_product_handler)),
    )
    .service(
      web::scope("/api/orders")
        .route("", web::post().to(order_handlers::place_order_handler))
        .route("", web::get().to(order_handlers::all_orders_handler))
        .route("/stats", web::get().to(order_handlers::stats_handler))
        .route("/myorders", web::get().to(order_handlers::my_orders_handler))
        .route("/verify-payment", web::post().to(order_handlers::verify_payment_handler))
        .route("/{id}", web::get().to(order_handlers::get_order_handler))
        .route("/{id}/cancel", web::put().to(order_handlers::cancel_order_handler))
        .route("/{id}/deliver", web::put().to(order_handlers::deliver_order_handler)),
    );
}
