// harvesthub/server/src/services/google_oauth.rs

//! Google sign-in: authorization redirect, code exchange and profile lookup.

use harvesthub_core::model::ExternalProfile;
use reqwest::{Client, Url};
use serde::Deserialize;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, instrument, warn};
use uuid::Uuid;

use crate::config::GoogleConfig;

const AUTHORIZE_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
const TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
const USERINFO_URL: &str = "https://www.googleapis.com/oauth2/v3/userinfo";
const SCOPES: &str = "openid profile email";
const STATE_TTL: Duration = Duration::from_secs(10 * 60);
/// Upper bound on sign-ins that may be in flight at once.
const MAX_PENDING_STATES: usize = 10_000;

#[derive(Debug, Error)]
pub enum OAuthError {
  #[error("Unknown or expired OAuth state")]
  InvalidState,
  #[error("Google request failed: {0}")]
  Transport(#[from] reqwest::Error),
  #[error("Google rejected the request: {0}")]
  Rejected(String),
  #[error("Google profile is missing a verified email")]
  UnverifiedEmail,
  #[error("Invalid OAuth URL: {0}")]
  Url(String),
  #[error("Too many sign-in attempts in progress, try again shortly")]
  TooManyPending,
}

#[derive(Deserialize)]
struct TokenResponse {
  access_token: String,
}

#[derive(Deserialize)]
struct UserInfo {
  sub: String,
  #[serde(default)]
  name: Option<String>,
  #[serde(default)]
  email: Option<String>,
  #[serde(default)]
  email_verified: Option<bool>,
  #[serde(default)]
  picture: Option<String>,
}

impl UserInfo {
  fn into_profile(self) -> Result<ExternalProfile, OAuthError> {
    let email = match (self.email, self.email_verified) {
      (Some(email), Some(true)) if !email.trim().is_empty() => email,
      _ => return Err(OAuthError::UnverifiedEmail),
    };
    let name = self
      .name
      .filter(|n| !n.trim().is_empty())
      .unwrap_or_else(|| email.split('@').next().unwrap_or_default().to_string());
    Ok(ExternalProfile {
      provider_id: self.sub,
      name,
      email,
      picture: self.picture,
    })
  }
}

pub struct GoogleOAuth {
  client: Client,
  client_id: String,
  client_secret: String,
  redirect_uri: String,
  /// Outstanding `state` values and when they were handed out.
  pending: Mutex<HashMap<String, Instant>>,
}

impl GoogleOAuth {
  pub fn new(config: &GoogleConfig, server_url: &str) -> Result<Self, reqwest::Error> {
    let client = Client::builder().timeout(Duration::from_secs(15)).build()?;
    Ok(Self {
      client,
      client_id: config.client_id.clone(),
      client_secret: config.client_secret.clone(),
      redirect_uri: format!("{}/auth/google/callback", server_url),
      pending: Mutex::new(HashMap::new()),
    })
  }

  /// Builds the consent-screen URL and remembers its `state`. Refuses once
  /// `MAX_PENDING_STATES` unexpired states are outstanding.
  pub async fn authorize_url(&self) -> Result<Url, OAuthError> {
    let state = Uuid::new_v4().simple().to_string();
    let url = Url::parse_with_params(
      AUTHORIZE_URL,
      &[
        ("client_id", self.client_id.as_str()),
        ("redirect_uri", self.redirect_uri.as_str()),
        ("response_type", "code"),
        ("scope", SCOPES),
        ("state", state.as_str()),
        ("prompt", "select_account"),
      ],
    )
    .map_err(|e| OAuthError::Url(e.to_string()))?;

    let mut pending = self.pending.lock().await;
    pending.retain(|_, issued| issued.elapsed() < STATE_TTL);
    if pending.len() >= MAX_PENDING_STATES {
      warn!(pending = pending.len(), "OAuth state table full, refusing new sign-in.");
      return Err(OAuthError::TooManyPending);
    }
    pending.insert(state, Instant::now());
    Ok(url)
  }

  async fn consume_state(&self, state: &str) -> bool {
    let mut pending = self.pending.lock().await;
    matches!(pending.remove(state), Some(issued) if issued.elapsed() < STATE_TTL)
  }

  /// Exchanges an authorization code for the signed-in user's profile.
  #[instrument(name = "google_oauth::exchange", skip_all)]
  pub async fn exchange(&self, code: &str, state: &str) -> Result<ExternalProfile, OAuthError> {
    if !self.consume_state(state).await {
      warn!("OAuth callback with unknown state.");
      return Err(OAuthError::InvalidState);
    }

    let response = self
      .client
      .post(TOKEN_URL)
      .form(&[
        ("code", code),
        ("client_id", self.client_id.as_str()),
        ("client_secret", self.client_secret.as_str()),
        ("redirect_uri", self.redirect_uri.as_str()),
        ("grant_type", "authorization_code"),
      ])
      .send()
      .await?;
    if !response.status().is_success() {
      let status = response.status();
      let body = response.text().await.unwrap_or_default();
      return Err(OAuthError::Rejected(format!("token exchange {}: {}", status, body)));
    }
    let token: TokenResponse = response.json().await?;

    let response = self
      .client
      .get(USERINFO_URL)
      .bearer_auth(&token.access_token)
      .send()
      .await?;
    if !response.status().is_success() {
      return Err(OAuthError::Rejected(format!("userinfo {}", response.status())));
    }
    let info: UserInfo = response.json().await?;
    debug!(provider_id = %info.sub, "Google profile fetched.");
    info.into_profile()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn oauth() -> GoogleOAuth {
    let config = GoogleConfig {
      client_id: "client-123".to_string(),
      client_secret: "shh".to_string(),
    };
    GoogleOAuth::new(&config, "http://localhost:5000").unwrap()
  }

  #[tokio::test]
  async fn authorize_url_carries_client_and_callback() {
    let oauth = oauth();
    let url = oauth.authorize_url().await.unwrap();
    let params: HashMap<String, String> = url.query_pairs().into_owned().collect();
    assert_eq!(params["client_id"], "client-123");
    assert_eq!(params["redirect_uri"], "http://localhost:5000/auth/google/callback");
    assert_eq!(params["scope"], SCOPES);
    assert!(oauth.consume_state(&params["state"]).await);
    assert!(!oauth.consume_state(&params["state"]).await);
  }

  #[tokio::test]
  async fn pending_states_are_capped() {
    let oauth = oauth();
    {
      let mut pending = oauth.pending.lock().await;
      for i in 0..MAX_PENDING_STATES {
        pending.insert(format!("state-{}", i), Instant::now());
      }
    }
    assert!(matches!(oauth.authorize_url().await, Err(OAuthError::TooManyPending)));
    assert_eq!(oauth.pending.lock().await.len(), MAX_PENDING_STATES);

    // A completed sign-in frees a slot.
    assert!(oauth.consume_state("state-0").await);
    assert!(oauth.authorize_url().await.is_ok());
  }

  #[tokio::test]
  async fn exchange_rejects_unknown_state_without_calling_google() {
    let oauth = oauth();
    assert!(matches!(
      oauth.exchange("code", "never-issued").await,
      Err(OAuthError::InvalidState)
    ));
  }

  #[test]
  fn unverified_emails_are_refused() {
    let info = UserInfo {
      sub: "g-1".to_string(),
      name: Some("Ravi".to_string()),
      email: Some("ravi@harvesthub.test".to_string()),
      email_verified: Some(false),
      picture: None,
    };
    assert!(matches!(info.into_profile(), Err(OAuthError::UnverifiedEmail)));
  }

  #[test]
  fn missing_name_falls_back_to_email_local_part() {
    let info = UserInfo {
      sub: "g-2".to_string(),
      name: None,
      email: Some("meera@harvesthub.test".to_string()),
      email_verified: Some(true),
      picture: Some("https://img.test/meera.png".to_string()),
    };
    let profile = info.into_profile().unwrap();
    assert_eq!(profile.name, "meera");
    assert_eq!(profile.provider_id, "g-2");
  }
}
