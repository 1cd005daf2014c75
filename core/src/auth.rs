// harvesthub/core/src/auth.rs

//! Local and external sign-in, and the access/refresh token lifecycle.
//!
//! Each account stores exactly one refresh token. Issuing a new pair replaces
//! it, which invalidates every refresh token handed out before.

use crate::error::{CommerceError, CommerceResult, StoreError};
use crate::model::{Account, ExternalProfile, Role, DEFAULT_PROFILE_PIC};
use crate::store::AccountStore;
use crate::tokens::{TokenIssuer, TokenKind, TokenPair};
use chrono::Utc;
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

pub const MIN_PASSWORD_LEN: usize = 8;

const INVALID_CREDENTIALS: &str = "Invalid email or password";

/// Salted password hashing. The algorithm lives behind this seam.
pub trait CredentialHasher: Send + Sync {
  fn hash(&self, password: &str) -> CommerceResult<String>;

  /// `Ok(false)` on a mismatch; `Err` only when the stored hash is unusable.
  fn verify(&self, stored_hash: &str, password: &str) -> CommerceResult<bool>;
}

#[derive(Debug, Clone, Deserialize)]
pub struct RegisterRequest {
  pub name: String,
  pub email: String,
  pub password: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginRequest {
  pub email: String,
  pub password: String,
}

/// A signed-in account with a fresh token pair.
#[derive(Debug, Clone)]
pub struct Session {
  pub account: Account,
  pub tokens: TokenPair,
}

pub fn normalize_email(email: &str) -> String {
  email.trim().to_lowercase()
}

fn looks_like_email(email: &str) -> bool {
  match email.split_once('@') {
    Some((local, domain)) => !local.is_empty() && domain.contains('.') && !domain.starts_with('.') && !domain.ends_with('.'),
    None => false,
  }
}

pub struct Authenticator {
  accounts: Arc<dyn AccountStore>,
  tokens: TokenIssuer,
  hasher: Arc<dyn CredentialHasher>,
  admin_email: Option<String>,
}

impl Authenticator {
  pub fn new(
    accounts: Arc<dyn AccountStore>,
    tokens: TokenIssuer,
    hasher: Arc<dyn CredentialHasher>,
    admin_email: Option<String>,
  ) -> Self {
    Self {
      accounts,
      tokens,
      hasher,
      admin_email: admin_email.map(|e| normalize_email(&e)),
    }
  }

  fn role_for(&self, email: &str) -> Role {
    match &self.admin_email {
      Some(admin) if admin == email => Role::Admin,
      _ => Role::User,
    }
  }

  /// Issues a new pair and stores the refresh half on the account.
  async fn open_session(&self, mut account: Account) -> CommerceResult<Session> {
    let tokens = self.tokens.issue_pair(account.id);
    if !self.accounts.set_refresh_token(account.id, Some(&tokens.refresh_token)).await? {
      return Err(CommerceError::not_found("Account", account.id));
    }
    account.refresh_token = Some(tokens.refresh_token.clone());
    Ok(Session { account, tokens })
  }

  #[instrument(name = "auth::register", skip(self, request), fields(email = %request.email))]
  pub async fn register(&self, request: RegisterRequest) -> CommerceResult<Session> {
    let email = normalize_email(&request.email);
    let name = request.name.trim().to_string();
    if name.is_empty() {
      return Err(CommerceError::Validation("Name is required".to_string()));
    }
    if !looks_like_email(&email) {
      return Err(CommerceError::Validation("A valid email is required".to_string()));
    }
    if request.password.len() < MIN_PASSWORD_LEN {
      return Err(CommerceError::Validation(format!(
        "Password must be at least {} characters",
        MIN_PASSWORD_LEN
      )));
    }

    if self.accounts.find_account_by_email(&email).await?.is_some() {
      debug!("Registration rejected, email already in use.");
      return Err(CommerceError::AlreadyExists("User already exists".to_string()));
    }

    let now = Utc::now();
    let account = Account {
      id: Uuid::new_v4(),
      name,
      role: self.role_for(&email),
      email,
      password_hash: Some(self.hasher.hash(&request.password)?),
      external_id: None,
      profile_pic: DEFAULT_PROFILE_PIC.to_string(),
      phone: None,
      address: None,
      refresh_token: None,
      created_at: now,
      updated_at: now,
    };

    match self.accounts.insert_account(&account).await {
      Ok(()) => {}
      // Lost a race with a concurrent registration for the same email.
      Err(StoreError::Conflict(_)) => return Err(CommerceError::AlreadyExists("User already exists".to_string())),
      Err(e) => return Err(e.into()),
    }
    info!(account_id = %account.id, role = account.role.as_str(), "Account registered.");
    self.open_session(account).await
  }

  #[instrument(name = "auth::login", skip(self, request), fields(email = %request.email))]
  pub async fn login(&self, request: LoginRequest) -> CommerceResult<Session> {
    let email = normalize_email(&request.email);
    let unauthorized = || CommerceError::Unauthorized(INVALID_CREDENTIALS.to_string());

    let account = self.accounts.find_account_by_email(&email).await?.ok_or_else(unauthorized)?;
    // Accounts created through an external provider have no password.
    let Some(stored_hash) = account.password_hash.as_deref() else {
      return Err(unauthorized());
    };
    if !self.hasher.verify(stored_hash, &request.password)? {
      debug!(account_id = %account.id, "Password mismatch.");
      return Err(unauthorized());
    }
    info!(account_id = %account.id, "Signed in.");
    self.open_session(account).await
  }

  /// Signs in with a provider identity: match by provider id, else link to
  /// the account with the same email, else create a password-less account.
  #[instrument(name = "auth::login_external", skip(self, profile), fields(provider_id = %profile.provider_id))]
  pub async fn login_external(&self, profile: ExternalProfile) -> CommerceResult<Session> {
    if let Some(account) = self.accounts.find_account_by_external_id(&profile.provider_id).await? {
      return self.open_session(account).await;
    }

    let email = normalize_email(&profile.email);
    if let Some(mut account) = self.accounts.find_account_by_email(&email).await? {
      self
        .accounts
        .link_external_identity(account.id, &profile.provider_id, profile.picture.as_deref())
        .await?;
      info!(account_id = %account.id, "Linked external identity to existing account.");
      account.external_id = Some(profile.provider_id);
      if let Some(picture) = profile.picture {
        account.profile_pic = picture;
      }
      return self.open_session(account).await;
    }

    if !looks_like_email(&email) {
      return Err(CommerceError::Validation("Provider returned no usable email".to_string()));
    }
    let now = Utc::now();
    let account = Account {
      id: Uuid::new_v4(),
      name: profile.name,
      role: self.role_for(&email),
      email,
      password_hash: None,
      external_id: Some(profile.provider_id),
      profile_pic: profile.picture.unwrap_or_else(|| DEFAULT_PROFILE_PIC.to_string()),
      phone: None,
      address: None,
      refresh_token: None,
      created_at: now,
      updated_at: now,
    };
    match self.accounts.insert_account(&account).await {
      Ok(()) => {}
      Err(StoreError::Conflict(field)) => {
        return Err(CommerceError::AlreadyExists(format!("An account with this {} already exists", field)))
      }
      Err(e) => return Err(e.into()),
    }
    info!(account_id = %account.id, "Account created from external identity.");
    self.open_session(account).await
  }

  /// Exchanges the currently stored refresh token for a new access token.
  /// The refresh token itself is not rotated.
  #[instrument(name = "auth::refresh", skip_all)]
  pub async fn refresh(&self, refresh_token: &str) -> CommerceResult<String> {
    if refresh_token.is_empty() {
      return Err(CommerceError::Unauthorized("Refresh token required".to_string()));
    }
    let claims = self.tokens.verify(refresh_token, TokenKind::Refresh).map_err(|e| {
      debug!(error = %e, "Refresh token rejected.");
      CommerceError::Unauthorized("Invalid refresh token".to_string())
    })?;
    let account = self
      .accounts
      .find_account(claims.sub)
      .await?
      .ok_or_else(|| CommerceError::Unauthorized("Invalid refresh token".to_string()))?;
    if account.refresh_token.as_deref() != Some(refresh_token) {
      warn!(account_id = %account.id, "Refresh token is not the one on record.");
      return Err(CommerceError::Unauthorized("Invalid refresh token".to_string()));
    }
    Ok(self.tokens.issue(account.id, TokenKind::Access))
  }

  /// Resolves a bearer access token to its account.
  #[instrument(name = "auth::authenticate", skip_all)]
  pub async fn authenticate(&self, access_token: &str) -> CommerceResult<Account> {
    let claims = self.tokens.verify(access_token, TokenKind::Access).map_err(|e| {
      debug!(error = %e, "Access token rejected.");
      CommerceError::Unauthorized("Not authorized, token failed".to_string())
    })?;
    self
      .accounts
      .find_account(claims.sub)
      .await?
      .ok_or_else(|| CommerceError::Unauthorized("Not authorized, account not found".to_string()))
  }

  pub async fn me(&self, account_id: Uuid) -> CommerceResult<Account> {
    self
      .accounts
      .find_account(account_id)
      .await?
      .ok_or_else(|| CommerceError::not_found("Account", account_id))
  }
}
