// harvesthub/core/src/tokens.rs

//! Signed bearer tokens: `v1.<base64url claims>.<base64url hmac>`.
//!
//! Access and refresh tokens are signed with different secrets, so one kind
//! can never be presented as the other.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, Duration, Utc};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use thiserror::Error;
use uuid::Uuid;

type HmacSha256 = Hmac<Sha256>;

const TOKEN_VERSION_V1: &str = "v1";
const MAX_TOKEN_LEN: usize = 1024;

pub const DEFAULT_ACCESS_TTL_SECS: i64 = 15 * 60;
pub const DEFAULT_REFRESH_TTL_SECS: i64 = 30 * 24 * 60 * 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
  Access,
  Refresh,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
  pub sub: Uuid,
  pub kind: TokenKind,
  pub iat: i64,
  pub exp: i64,
  /// Unique per issue, so two tokens minted in the same second still differ.
  pub jti: Uuid,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TokenError {
  #[error("Malformed token")]
  Malformed,
  #[error("Unsupported token version")]
  UnsupportedVersion,
  #[error("Token signature mismatch")]
  BadSignature,
  #[error("Token expired")]
  Expired,
  #[error("Wrong token kind")]
  WrongKind,
  #[error("Token signing key rejected")]
  InvalidKey,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenPair {
  pub access_token: String,
  pub refresh_token: String,
}

#[derive(Clone)]
pub struct TokenIssuer {
  access_key: HmacSha256,
  refresh_key: HmacSha256,
  access_ttl: Duration,
  refresh_ttl: Duration,
}

impl TokenIssuer {
  pub fn new(
    access_secret: &[u8],
    refresh_secret: &[u8],
    access_ttl: Duration,
    refresh_ttl: Duration,
  ) -> Result<Self, TokenError> {
    Ok(Self {
      access_key: HmacSha256::new_from_slice(access_secret).map_err(|_| TokenError::InvalidKey)?,
      refresh_key: HmacSha256::new_from_slice(refresh_secret).map_err(|_| TokenError::InvalidKey)?,
      access_ttl,
      refresh_ttl,
    })
  }

  fn key(&self, kind: TokenKind) -> &HmacSha256 {
    match kind {
      TokenKind::Access => &self.access_key,
      TokenKind::Refresh => &self.refresh_key,
    }
  }

  fn ttl(&self, kind: TokenKind) -> Duration {
    match kind {
      TokenKind::Access => self.access_ttl,
      TokenKind::Refresh => self.refresh_ttl,
    }
  }

  pub fn issue_at(&self, account_id: Uuid, kind: TokenKind, now: DateTime<Utc>) -> String {
    let claims = Claims {
      sub: account_id,
      kind,
      iat: now.timestamp(),
      exp: (now + self.ttl(kind)).timestamp(),
      jti: Uuid::new_v4(),
    };
    // Claims hold only plain scalars, serialization cannot fail.
    let payload = serde_json::to_vec(&claims).unwrap_or_default();
    let payload_part = URL_SAFE_NO_PAD.encode(payload);
    let mut mac = self.key(kind).clone();
    mac.update(payload_part.as_bytes());
    let sig_part = URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes());
    format!("{}.{}.{}", TOKEN_VERSION_V1, payload_part, sig_part)
  }

  pub fn issue(&self, account_id: Uuid, kind: TokenKind) -> String {
    self.issue_at(account_id, kind, Utc::now())
  }

  pub fn issue_pair(&self, account_id: Uuid) -> TokenPair {
    TokenPair {
      access_token: self.issue(account_id, TokenKind::Access),
      refresh_token: self.issue(account_id, TokenKind::Refresh),
    }
  }

  pub fn verify_at(&self, token: &str, kind: TokenKind, now: DateTime<Utc>) -> Result<Claims, TokenError> {
    if token.len() > MAX_TOKEN_LEN {
      return Err(TokenError::Malformed);
    }
    let mut parts = token.split('.');
    let (Some(version), Some(payload_part), Some(sig_part), None) = (parts.next(), parts.next(), parts.next(), parts.next())
    else {
      return Err(TokenError::Malformed);
    };
    if version != TOKEN_VERSION_V1 {
      return Err(TokenError::UnsupportedVersion);
    }

    let sig = URL_SAFE_NO_PAD.decode(sig_part).map_err(|_| TokenError::Malformed)?;
    let mut mac = self.key(kind).clone();
    mac.update(payload_part.as_bytes());
    mac.verify_slice(&sig).map_err(|_| TokenError::BadSignature)?;

    let payload = URL_SAFE_NO_PAD.decode(payload_part).map_err(|_| TokenError::Malformed)?;
    let claims: Claims = serde_json::from_slice(&payload).map_err(|_| TokenError::Malformed)?;
    if claims.kind != kind {
      return Err(TokenError::WrongKind);
    }
    if claims.exp <= now.timestamp() {
      return Err(TokenError::Expired);
    }
    Ok(claims)
  }

  pub fn verify(&self, token: &str, kind: TokenKind) -> Result<Claims, TokenError> {
    self.verify_at(token, kind, Utc::now())
  }
}

impl std::fmt::Debug for TokenIssuer {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("TokenIssuer")
      .field("access_ttl", &self.access_ttl)
      .field("refresh_ttl", &self.refresh_ttl)
      .finish_non_exhaustive()
  }
}
