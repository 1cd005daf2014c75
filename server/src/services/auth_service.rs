// harvesthub/server/src/services/auth_service.rs

//! Argon2 password hashing behind the core `CredentialHasher` seam.

use argon2::{
  password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
  Argon2,
};
use harvesthub_core::{CommerceError, CommerceResult, CredentialHasher};
use tracing::{debug, error, instrument};

#[derive(Default)]
pub struct Argon2Hasher {
  argon2: Argon2<'static>,
}

impl Argon2Hasher {
  pub fn new() -> Self {
    Self::default()
  }
}

impl CredentialHasher for Argon2Hasher {
  #[instrument(name = "auth_service::hash_password", skip_all)]
  fn hash(&self, password: &str) -> CommerceResult<String> {
    if password.is_empty() {
      return Err(CommerceError::Validation("Password cannot be empty".to_string()));
    }
    let salt = SaltString::generate(&mut OsRng);
    match self.argon2.hash_password(password.as_bytes(), &salt) {
      Ok(hash) => Ok(hash.to_string()),
      Err(argon_err) => {
        error!(error = %argon_err, "Argon2 password hashing failed.");
        Err(CommerceError::Internal(format!("Password hashing failed: {}", argon_err)))
      }
    }
  }

  #[instrument(name = "auth_service::verify_password", skip_all, fields(hash_len = stored_hash.len()))]
  fn verify(&self, stored_hash: &str, password: &str) -> CommerceResult<bool> {
    if stored_hash.is_empty() || password.is_empty() {
      return Ok(false);
    }
    let parsed = match PasswordHash::new(stored_hash) {
      Ok(parsed) => parsed,
      Err(parse_err) => {
        error!(error = %parse_err, "Stored password hash is unreadable.");
        return Err(CommerceError::Internal(format!("Invalid stored password hash: {}", parse_err)));
      }
    };
    match self.argon2.verify_password(password.as_bytes(), &parsed) {
      Ok(()) => Ok(true),
      Err(argon2::password_hash::Error::Password) => {
        debug!("Password mismatch.");
        Ok(false)
      }
      Err(other) => {
        error!(error = %other, "Argon2 password verification failed.");
        Err(CommerceError::Internal(format!("Password verification failed: {}", other)))
      }
    }
  }
}
