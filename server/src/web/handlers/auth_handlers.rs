// harvesthub/server/src/web/handlers/auth_handlers.rs

use actix_web::http::header::LOCATION;
use actix_web::{web, HttpResponse};
use harvesthub_core::model::Role;
use harvesthub_core::{CommerceError, LoginRequest, RegisterRequest, Session};
use reqwest::Url;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use crate::errors::AppError;
use crate::services::google_oauth::OAuthError;
use crate::state::AppState;
use crate::web::extractors::AuthenticatedAccount;

/// Body returned by register and login.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionResponse {
  #[serde(rename = "_id")]
  pub id: Uuid,
  pub name: String,
  pub email: String,
  pub profile_pic: String,
  pub role: Role,
  pub token: String,
  pub refresh_token: String,
}

impl From<Session> for SessionResponse {
  fn from(session: Session) -> Self {
    Self {
      id: session.account.id,
      name: session.account.name,
      email: session.account.email,
      profile_pic: session.account.profile_pic,
      role: session.account.role,
      token: session.tokens.access_token,
      refresh_token: session.tokens.refresh_token,
    }
  }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshPayload {
  pub refresh_token: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct GoogleCallbackQuery {
  pub code: Option<String>,
  pub state: Option<String>,
  pub error: Option<String>,
}

#[instrument(name = "handler::register", skip(app_state, payload), fields(email = %payload.email))]
pub async fn register_handler(
  app_state: web::Data<AppState>,
  payload: web::Json<RegisterRequest>,
) -> Result<HttpResponse, AppError> {
  let session = app_state.auth.register(payload.into_inner()).await?;
  info!(account_id = %session.account.id, "Account registered.");
  Ok(HttpResponse::Created().json(SessionResponse::from(session)))
}

#[instrument(name = "handler::login", skip(app_state, payload), fields(email = %payload.email))]
pub async fn login_handler(
  app_state: web::Data<AppState>,
  payload: web::Json<LoginRequest>,
) -> Result<HttpResponse, AppError> {
  let session = app_state.auth.login(payload.into_inner()).await?;
  Ok(HttpResponse::Ok().json(SessionResponse::from(session)))
}

#[instrument(name = "handler::refresh", skip_all)]
pub async fn refresh_handler(
  app_state: web::Data<AppState>,
  payload: web::Json<RefreshPayload>,
) -> Result<HttpResponse, AppError> {
  let token = payload
    .into_inner()
    .refresh_token
    .filter(|t| !t.is_empty())
    .ok_or_else(|| CommerceError::Unauthorized("No refresh token found".to_string()))?;
  let access_token = app_state.auth.refresh(&token).await?;
  Ok(HttpResponse::Ok().json(json!({ "accessToken": access_token })))
}

#[instrument(name = "handler::me", skip_all, fields(account_id = %caller.0.id))]
pub async fn me_handler(
  app_state: web::Data<AppState>,
  caller: AuthenticatedAccount,
) -> Result<HttpResponse, AppError> {
  let account = app_state.auth.me(caller.0.id).await?;
  Ok(HttpResponse::Ok().json(account))
}

fn redirect(location: &str) -> HttpResponse {
  HttpResponse::Found().insert_header((LOCATION, location)).finish()
}

#[instrument(name = "handler::google_start", skip_all)]
pub async fn google_start_handler(app_state: web::Data<AppState>) -> Result<HttpResponse, AppError> {
  let google = app_state
    .google
    .as_ref()
    .ok_or_else(|| CommerceError::not_found("Sign-in provider", "google"))?;
  let url = google.authorize_url().await.map_err(|e| match e {
    OAuthError::TooManyPending => AppError::Unavailable(e.to_string()),
    other => AppError::Internal(other.to_string()),
  })?;
  Ok(redirect(url.as_str()))
}

#[instrument(name = "handler::google_callback", skip_all)]
pub async fn google_callback_handler(
  app_state: web::Data<AppState>,
  query: web::Query<GoogleCallbackQuery>,
) -> HttpResponse {
  let client_url = &app_state.config.client_url;
  let failure = format!("{}/login?error=auth_failed", client_url);

  let Some(google) = app_state.google.as_ref() else {
    warn!("Google callback hit while Google sign-in is disabled.");
    return redirect(&failure);
  };
  let query = query.into_inner();
  let (code, state) = match (query.code, query.state, query.error) {
    (Some(code), Some(state), None) => (code, state),
    (_, _, provider_error) => {
      warn!(error = ?provider_error, "Google callback without an authorization code.");
      return redirect(&failure);
    }
  };

  let profile = match google.exchange(&code, &state).await {
    Ok(profile) => profile,
    Err(e) => {
      error!(error = %e, "Google code exchange failed.");
      return redirect(&failure);
    }
  };
  let session = match app_state.auth.login_external(profile).await {
    Ok(session) => session,
    Err(e) => {
      error!(error = %e, "External sign-in failed.");
      return redirect(&failure);
    }
  };

  let success = Url::parse_with_params(
    &format!("{}/auth/success", client_url),
    &[
      ("accessToken", session.tokens.access_token.as_str()),
      ("refreshToken", session.tokens.refresh_token.as_str()),
    ],
  );
  match success {
    Ok(url) => {
      info!(account_id = %session.account.id, "Google sign-in complete.");
      redirect(url.as_str())
    }
    Err(e) => {
      error!(error = %e, "CLIENT_URL is not a valid base URL.");
      redirect(&failure)
    }
  }
}
