// harvesthub/server/src/state.rs

use crate::config::AppConfig;
use crate::db::PgStore;
use crate::errors::{AppError, Result};
use crate::services::google_oauth::GoogleOAuth;
use harvesthub_core::{
  Authenticator, CatalogService, CredentialHasher, OrderDesk, OrderNotifier, PaymentGateway, SignatureVerifier,
  Stores, TokenIssuer,
};
use std::sync::Arc;

/// Everything a request handler needs, shared across workers.
#[derive(Clone)]
pub struct AppState {
  pub config: Arc<AppConfig>,
  pub catalog: Arc<CatalogService>,
  pub desk: Arc<OrderDesk>,
  pub auth: Arc<Authenticator>,
  pub google: Option<Arc<GoogleOAuth>>,
  /// Absent when running against in-memory stores.
  pub db: Option<PgStore>,
}

/// Infrastructure the service is assembled from.
pub struct Backends {
  pub stores: Stores,
  pub gateway: Arc<dyn PaymentGateway>,
  pub notifier: Arc<dyn OrderNotifier>,
  pub hasher: Arc<dyn CredentialHasher>,
  pub db: Option<PgStore>,
}

impl AppState {
  pub fn build(config: Arc<AppConfig>, backends: Backends) -> Result<Self> {
    let issuer = TokenIssuer::new(
      config.access_token_secret.as_bytes(),
      config.refresh_token_secret.as_bytes(),
      chrono::Duration::seconds(config.access_token_ttl_secs),
      chrono::Duration::seconds(config.refresh_token_ttl_secs),
    )
    .map_err(|e| AppError::Config(format!("Token secrets rejected: {}", e)))?;
    let verifier = SignatureVerifier::new(config.razorpay.key_secret.as_bytes())
      .map_err(|e| AppError::Config(format!("RAZORPAY_KEY_SECRET rejected: {}", e)))?;

    let google = match &config.google {
      Some(google_config) => Some(Arc::new(
        GoogleOAuth::new(google_config, &config.server_url)
          .map_err(|e| AppError::Config(format!("Google OAuth client: {}", e)))?,
      )),
      None => None,
    };

    let Backends {
      stores,
      gateway,
      notifier,
      hasher,
      db,
    } = backends;

    let catalog = Arc::new(CatalogService::new(stores.catalog.clone()));
    let auth = Arc::new(Authenticator::new(
      stores.accounts.clone(),
      issuer,
      hasher,
      config.admin_email.clone(),
    ));
    let desk = Arc::new(OrderDesk::new(stores, gateway, verifier, notifier, config.pricing));

    Ok(Self {
      config,
      catalog,
      desk,
      auth,
      google,
      db,
    })
  }
}
