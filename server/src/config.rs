// harvesthub/server/src/config.rs

use crate::errors::{AppError, Result};
use dotenvy::dotenv;
use harvesthub_core::model::{Money, PricingPolicy};
use harvesthub_core::tokens::{DEFAULT_ACCESS_TTL_SECS, DEFAULT_REFRESH_TTL_SECS};
use std::env;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
  Development,
  Production,
}

impl Environment {
  pub fn is_development(self) -> bool {
    self == Environment::Development
  }
}

impl FromStr for Environment {
  type Err = AppError;

  fn from_str(s: &str) -> Result<Self> {
    match s.to_ascii_lowercase().as_str() {
      "development" | "dev" => Ok(Environment::Development),
      "production" | "prod" => Ok(Environment::Production),
      other => Err(AppError::Config(format!("Invalid APP_ENV '{}'", other))),
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GatewayMode {
  Razorpay,
  Mock,
}

#[derive(Clone)]
pub struct RazorpayConfig {
  pub key_id: String,
  pub key_secret: String,
}

#[derive(Clone)]
pub struct GoogleConfig {
  pub client_id: String,
  pub client_secret: String,
}

#[derive(Clone)]
pub struct AppConfig {
  pub server_host: String,
  pub server_port: u16,
  pub database_url: String,
  /// Front-end origin, used for OAuth redirects.
  pub client_url: String,
  /// Public base URL of this service, used for the OAuth callback.
  pub server_url: String,
  pub environment: Environment,

  pub access_token_secret: String,
  pub refresh_token_secret: String,
  pub access_token_ttl_secs: i64,
  pub refresh_token_ttl_secs: i64,

  pub gateway_mode: GatewayMode,
  pub razorpay: RazorpayConfig,
  pub google: Option<GoogleConfig>,

  pub admin_email: Option<String>,
  pub sender_email: String,
  pub brevo_api_key: Option<String>,

  pub pricing: PricingPolicy,
  pub seed_db: bool,
}

impl std::fmt::Debug for AppConfig {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("AppConfig")
      .field("server_host", &self.server_host)
      .field("server_port", &self.server_port)
      .field("database_url", &"[REDACTED]")
      .field("client_url", &self.client_url)
      .field("server_url", &self.server_url)
      .field("environment", &self.environment)
      .field("gateway_mode", &self.gateway_mode)
      .field("google_enabled", &self.google.is_some())
      .field("admin_email", &self.admin_email)
      .field("pricing", &self.pricing)
      .field("seed_db", &self.seed_db)
      .finish_non_exhaustive()
  }
}

fn parse_var<T>(name: &str, raw: String) -> Result<T>
where
  T: FromStr,
  T::Err: std::fmt::Display,
{
  raw
    .trim()
    .parse::<T>()
    .map_err(|e| AppError::Config(format!("Invalid {}: {}", name, e)))
}

fn parse_money(name: &str, raw: String) -> Result<Money> {
  let major: f64 = parse_var(name, raw)?;
  if !major.is_finite() || major < 0.0 {
    return Err(AppError::Config(format!("Invalid {}: must be a non-negative amount", name)));
  }
  Ok(Money::from_major(major))
}

impl AppConfig {
  pub fn from_env() -> Result<Self> {
    dotenv().ok();

    let get_env = |var_name: &str| {
      env::var(var_name).map_err(|e| AppError::Config(format!("Missing environment variable '{}': {}", var_name, e)))
    };
    let optional = |var_name: &str| env::var(var_name).ok().filter(|v| !v.trim().is_empty());

    let server_host = get_env("SERVER_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
    let server_port = parse_var("SERVER_PORT", get_env("SERVER_PORT").unwrap_or_else(|_| "5000".to_string()))?;
    let database_url = get_env("DATABASE_URL")?;
    let client_url = get_env("CLIENT_URL")
      .unwrap_or_else(|_| "http://localhost:5173".to_string())
      .trim_end_matches('/')
      .to_string();
    let server_url = get_env("SERVER_URL")
      .unwrap_or_else(|_| format!("http://{}:{}", server_host, server_port))
      .trim_end_matches('/')
      .to_string();
    let environment = get_env("APP_ENV")
      .unwrap_or_else(|_| "development".to_string())
      .parse::<Environment>()?;

    let access_token_secret = get_env("ACCESS_TOKEN_SECRET")?;
    let refresh_token_secret = get_env("REFRESH_TOKEN_SECRET")?;
    if access_token_secret == refresh_token_secret {
      return Err(AppError::Config(
        "ACCESS_TOKEN_SECRET and REFRESH_TOKEN_SECRET must differ".to_string(),
      ));
    }
    let access_token_ttl_secs = match optional("ACCESS_TOKEN_TTL_SECS") {
      Some(raw) => parse_var("ACCESS_TOKEN_TTL_SECS", raw)?,
      None => DEFAULT_ACCESS_TTL_SECS,
    };
    let refresh_token_ttl_secs = match optional("REFRESH_TOKEN_TTL_SECS") {
      Some(raw) => parse_var("REFRESH_TOKEN_TTL_SECS", raw)?,
      None => DEFAULT_REFRESH_TTL_SECS,
    };

    let gateway_mode = match get_env("PAYMENT_GATEWAY")
      .unwrap_or_else(|_| "razorpay".to_string())
      .to_ascii_lowercase()
      .as_str()
    {
      "razorpay" => GatewayMode::Razorpay,
      "mock" => GatewayMode::Mock,
      other => return Err(AppError::Config(format!("Invalid PAYMENT_GATEWAY '{}'", other))),
    };
    // The key secret also signs payment callbacks, so it is required in both modes.
    let razorpay = RazorpayConfig {
      key_id: get_env("RAZORPAY_KEY_ID").unwrap_or_else(|_| "rzp_test_mock".to_string()),
      key_secret: get_env("RAZORPAY_KEY_SECRET")?,
    };

    let google = match (optional("GOOGLE_CLIENT_ID"), optional("GOOGLE_CLIENT_SECRET")) {
      (Some(client_id), Some(client_secret)) => Some(GoogleConfig {
        client_id,
        client_secret,
      }),
      (None, None) => None,
      _ => {
        return Err(AppError::Config(
          "GOOGLE_CLIENT_ID and GOOGLE_CLIENT_SECRET must be set together".to_string(),
        ))
      }
    };

    let admin_email = optional("ADMIN_EMAIL");
    let sender_email = get_env("SENDER_EMAIL").unwrap_or_else(|_| "orders@harvesthub.local".to_string());
    let brevo_api_key = optional("BREVO_API_KEY");

    let defaults = PricingPolicy::default();
    let pricing = PricingPolicy {
      shipping_fee: match optional("SHIPPING_FLAT_FEE") {
        Some(raw) => parse_money("SHIPPING_FLAT_FEE", raw)?,
        None => defaults.shipping_fee,
      },
      free_shipping_above: match optional("FREE_SHIPPING_ABOVE") {
        Some(raw) => parse_money("FREE_SHIPPING_ABOVE", raw)?,
        None => defaults.free_shipping_above,
      },
      tax_rate_bps: match optional("TAX_RATE_BPS") {
        Some(raw) => parse_var("TAX_RATE_BPS", raw)?,
        None => defaults.tax_rate_bps,
      },
    };

    let seed_db = get_env("SEED_DB")
      .unwrap_or_else(|_| "false".to_string())
      .parse::<bool>()
      .map_err(|e| AppError::Config(format!("Invalid SEED_DB value: {}", e)))?;

    tracing::info!("Application configuration loaded successfully.");

    Ok(Self {
      server_host,
      server_port,
      database_url,
      client_url,
      server_url,
      environment,
      access_token_secret,
      refresh_token_secret,
      access_token_ttl_secs,
      refresh_token_ttl_secs,
      gateway_mode,
      razorpay,
      google,
      admin_email,
      sender_email,
      brevo_api_key,
      pricing,
      seed_db,
    })
  }
}
