// harvesthub/server/src/main.rs

mod config;
mod db;
mod errors;
mod services;
mod state;
mod web;

use crate::config::{AppConfig, GatewayMode};
use crate::db::PgStore;
use crate::errors::expose_error_details;
use crate::services::auth_service::Argon2Hasher;
use crate::services::mailer::{BrevoMailer, LogMailer};
use crate::services::payment_gateway::{MockGateway, RazorpayGateway};
use crate::state::{AppState, Backends};

use actix_web::{web as actix_data, App, HttpServer};
use harvesthub_core::catalog::ProductQuery;
use harvesthub_core::{OrderNotifier, PaymentGateway, Stores};
use std::io;
use std::sync::Arc;
use tracing::Level;
use tracing_subscriber::fmt::format::FmtSpan;

fn startup_error(context: &str, err: impl std::fmt::Display) -> io::Error {
  tracing::error!(error = %err, "{}", context);
  io::Error::new(io::ErrorKind::Other, format!("{}: {}", context, err))
}

#[actix_web::main]
async fn main() -> io::Result<()> {
  tracing_subscriber::fmt()
    .with_max_level(Level::INFO)
    .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
    .with_span_events(FmtSpan::CLOSE)
    .init();

  tracing::info!("Starting HarvestHub server...");

  let app_config = Arc::new(AppConfig::from_env().map_err(|e| startup_error("Failed to load configuration", e))?);
  expose_error_details(app_config.environment.is_development());
  tracing::debug!(config = ?app_config, "Configuration in effect.");

  let pg = PgStore::connect(&app_config.database_url)
    .await
    .map_err(|e| startup_error("Failed to connect to the database", e))?;
  pg.apply_schema()
    .await
    .map_err(|e| startup_error("Failed to apply the database schema", e))?;

  let store = Arc::new(pg.clone());
  let stores = Stores {
    catalog: store.clone(),
    accounts: store.clone(),
    ledger: store,
  };

  let gateway: Arc<dyn PaymentGateway> = match app_config.gateway_mode {
    GatewayMode::Razorpay => Arc::new(
      RazorpayGateway::new(&app_config.razorpay).map_err(|e| startup_error("Failed to build the Razorpay client", e))?,
    ),
    GatewayMode::Mock => {
      tracing::warn!("PAYMENT_GATEWAY=mock, gateway orders are simulated.");
      Arc::new(MockGateway)
    }
  };

  let notifier: Arc<dyn OrderNotifier> = match &app_config.brevo_api_key {
    Some(api_key) => Arc::new(
      BrevoMailer::new(api_key.clone(), app_config.sender_email.clone())
        .map_err(|e| startup_error("Failed to build the mail client", e))?,
    ),
    None => {
      tracing::info!("BREVO_API_KEY not set, confirmation emails are only logged.");
      Arc::new(LogMailer::new(app_config.sender_email.clone()))
    }
  };

  let app_state = AppState::build(
    app_config.clone(),
    Backends {
      stores,
      gateway,
      notifier,
      hasher: Arc::new(Argon2Hasher::new()),
      db: Some(pg),
    },
  )
  .map_err(|e| startup_error("Failed to assemble application state", e))?;

  if app_config.seed_db {
    match app_state.catalog.list(&ProductQuery::default()).await {
      Ok(existing) if !existing.is_empty() => {
        tracing::info!(count = existing.len(), "Catalog already populated, skipping seed.")
      }
      Ok(_) => match app_state.catalog.seed_samples().await {
        Ok(added) => tracing::info!(count = added.len(), "Database seeded with the sample catalog."),
        Err(e) => tracing::error!(error = %e, "Failed to seed database."),
      },
      Err(e) => tracing::error!(error = %e, "Could not read the catalog before seeding."),
    }
  }

  let server_address = format!("{}:{}", app_config.server_host, app_config.server_port);
  tracing::info!("Attempting to bind server to {}...", server_address);

  HttpServer::new(move || {
    App::new()
      .app_data(actix_data::Data::new(app_state.clone()))
      .wrap(tracing_actix_web::TracingLogger::default())
      .configure(web::configure_app_routes)
  })
  .bind(&server_address)?
  .run()
  .await
}
