// harvesthub/server/src/web/handlers/catalog_handlers.rs

use actix_web::{web, HttpResponse};
use harvesthub_core::model::{ProductDraft, ProductPatch};
use harvesthub_core::ProductQuery;
use serde::Deserialize;
use serde_json::json;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::errors::AppError;
use crate::state::AppState;
use crate::web::extractors::AdminAccount;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListProductsQuery {
  pub keyword: Option<String>,
  pub category: Option<String>,
  pub sort: Option<String>,
  pub price_min: Option<f64>,
  pub price_max: Option<f64>,
}

#[instrument(name = "handler::list_products", skip(app_state))]
pub async fn list_products_handler(
  app_state: web::Data<AppState>,
  query: web::Query<ListProductsQuery>,
) -> Result<HttpResponse, AppError> {
  let query = ProductQuery::from_params(
    query.keyword.as_deref(),
    query.category.as_deref(),
    query.price_min,
    query.price_max,
    query.sort.as_deref(),
  )?;
  let products = app_state.catalog.list(&query).await?;
  Ok(HttpResponse::Ok().json(products))
}

#[instrument(name = "handler::get_product", skip(app_state, path), fields(product_id = %path.as_ref()))]
pub async fn get_product_handler(
  app_state: web::Data<AppState>,
  path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
  let product = app_state.catalog.get(path.into_inner()).await?;
  Ok(HttpResponse::Ok().json(product))
}

#[instrument(name = "handler::create_product", skip_all, fields(admin_id = %admin.0.id))]
pub async fn create_product_handler(
  app_state: web::Data<AppState>,
  admin: AdminAccount,
  payload: web::Json<ProductDraft>,
) -> Result<HttpResponse, AppError> {
  let product = app_state.catalog.create(payload.into_inner()).await?;
  Ok(HttpResponse::Created().json(product))
}

#[instrument(name = "handler::update_product", skip(app_state, admin, payload), fields(admin_id = %admin.0.id))]
pub async fn update_product_handler(
  app_state: web::Data<AppState>,
  admin: AdminAccount,
  path: web::Path<Uuid>,
  payload: web::Json<ProductPatch>,
) -> Result<HttpResponse, AppError> {
  let product = app_state.catalog.update(path.into_inner(), payload.into_inner()).await?;
  Ok(HttpResponse::Ok().json(product))
}

#[instrument(name = "handler::delete_product", skip(app_state, admin), fields(admin_id = %admin.0.id))]
pub async fn delete_product_handler(
  app_state: web::Data<AppState>,
  admin: AdminAccount,
  path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
  app_state.catalog.delete(path.into_inner()).await?;
  Ok(HttpResponse::Ok().json(json!({ "message": "Vegetable removed" })))
}

#[instrument(name = "handler::seed_products", skip_all, fields(admin_id = %admin.0.id))]
pub async fn seed_products_handler(
  app_state: web::Data<AppState>,
  admin: AdminAccount,
) -> Result<HttpResponse, AppError> {
  let added = app_state.catalog.seed_samples().await?;
  info!(count = added.len(), "Catalog seeded on request.");
  Ok(HttpResponse::Ok().json(added))
}
