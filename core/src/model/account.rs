// harvesthub/core/src/model/account.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const DEFAULT_PROFILE_PIC: &str = "https://cdn-icons-png.flaticon.com/512/149/149071.png";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
  User,
  Admin,
}

impl Role {
  pub fn as_str(self) -> &'static str {
    match self {
      Role::User => "user",
      Role::Admin => "admin",
    }
  }

  pub fn parse(value: &str) -> Option<Role> {
    match value {
      "user" => Some(Role::User),
      "admin" => Some(Role::Admin),
      _ => None,
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedAddress {
  pub address: String,
  pub city: String,
  pub postal_code: String,
  pub country: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
  pub id: Uuid,
  pub name: String,
  pub email: String,
  #[serde(skip_serializing, default)]
  pub password_hash: Option<String>,
  /// Provider subject id of a linked external identity.
  #[serde(rename = "googleId")]
  pub external_id: Option<String>,
  pub profile_pic: String,
  pub role: Role,
  pub phone: Option<String>,
  pub address: Option<SavedAddress>,
  #[serde(skip_serializing, default)]
  pub refresh_token: Option<String>,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

impl Account {
  pub fn is_admin(&self) -> bool {
    self.role == Role::Admin
  }
}

/// Identity returned by an OAuth provider after a successful code exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternalProfile {
  pub provider_id: String,
  pub name: String,
  pub email: String,
  pub picture: Option<String>,
}
