// harvesthub/server/src/web/extractors.rs

//! Bearer-token extractors. Handlers that take one of these only run for an
//! authenticated caller.

use actix_web::dev::Payload;
use actix_web::http::header::AUTHORIZATION;
use actix_web::{web, FromRequest, HttpRequest};
use futures_util::future::LocalBoxFuture;
use harvesthub_core::model::Account;
use harvesthub_core::CommerceError;
use tracing::debug;

use crate::errors::AppError;
use crate::state::AppState;

fn bearer_token(req: &HttpRequest) -> Option<String> {
  let raw = req.headers().get(AUTHORIZATION)?.to_str().ok()?;
  let (scheme, token) = raw.split_once(' ')?;
  let token = token.trim();
  (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then(|| token.to_string())
}

async fn resolve(state: Option<web::Data<AppState>>, token: Option<String>) -> Result<Account, AppError> {
  let state = state.ok_or_else(|| AppError::Internal("Application state not configured".to_string()))?;
  let token = token.ok_or_else(|| {
    debug!("Request without bearer token.");
    CommerceError::Unauthorized("Not authorized, no token".to_string())
  })?;
  Ok(state.auth.authenticate(&token).await?)
}

/// The account behind a valid access token.
#[derive(Debug, Clone)]
pub struct AuthenticatedAccount(pub Account);

impl FromRequest for AuthenticatedAccount {
  type Error = AppError;
  type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

  fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
    let state = req.app_data::<web::Data<AppState>>().cloned();
    let token = bearer_token(req);
    Box::pin(async move { resolve(state, token).await.map(AuthenticatedAccount) })
  }
}

/// Like [`AuthenticatedAccount`], but only admits administrators.
#[derive(Debug, Clone)]
pub struct AdminAccount(pub Account);

impl FromRequest for AdminAccount {
  type Error = AppError;
  type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

  fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
    let state = req.app_data::<web::Data<AppState>>().cloned();
    let token = bearer_token(req);
    Box::pin(async move {
      let account = resolve(state, token).await?;
      if !account.is_admin() {
        return Err(CommerceError::Forbidden("Not authorized as an admin".to_string()).into());
      }
      Ok(AdminAccount(account))
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use actix_web::test::TestRequest;

  #[test]
  fn bearer_scheme_is_required() {
    let req = TestRequest::default()
      .insert_header((AUTHORIZATION, "Bearer abc.def"))
      .to_http_request();
    assert_eq!(bearer_token(&req).as_deref(), Some("abc.def"));

    let req = TestRequest::default()
      .insert_header((AUTHORIZATION, "Basic abc"))
      .to_http_request();
    assert_eq!(bearer_token(&req), None);

    let req = TestRequest::default().insert_header((AUTHORIZATION, "Bearer  ")).to_http_request();
    assert_eq!(bearer_token(&req), None);

    assert_eq!(bearer_token(&TestRequest::default().to_http_request()), None);
  }
}
