// harvesthub/core/src/payment.rs

//! Gateway-facing payment types and callback signature verification.

use crate::error::GatewayError;
use crate::model::Money;
use async_trait::async_trait;
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

pub const DEFAULT_CURRENCY: &str = "INR";

pub fn receipt_for(order_id: uuid::Uuid) -> String {
  format!("receipt_{}", order_id)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntentRequest {
  /// Amount in minor units (paise).
  pub amount_minor: i64,
  pub currency: String,
  pub receipt: String,
}

impl IntentRequest {
  pub fn for_order(total: Money, order_id: uuid::Uuid) -> Self {
    Self {
      amount_minor: total.minor(),
      currency: DEFAULT_CURRENCY.to_string(),
      receipt: receipt_for(order_id),
    }
  }
}

/// Gateway-side order handed back to the client to open the checkout widget.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentIntent {
  pub id: String,
  pub amount: i64,
  pub currency: String,
  pub receipt: Option<String>,
  #[serde(default)]
  pub status: String,
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
  async fn create_intent(&self, request: &IntentRequest) -> Result<PaymentIntent, GatewayError>;
}

/// What the gateway's client-side callback reports after a payment.
#[derive(Debug, Clone, Deserialize)]
pub struct PaymentCallback {
  #[serde(rename = "razorpay_order_id")]
  pub gateway_order_id: String,
  #[serde(rename = "razorpay_payment_id")]
  pub payment_id: String,
  #[serde(rename = "razorpay_signature")]
  pub signature: String,
}

/// Checks `HMAC-SHA256(secret, "{gateway_order_id}|{payment_id}")` against
/// the lowercase hex signature sent by the client.
#[derive(Clone)]
pub struct SignatureVerifier {
  keyed: HmacSha256,
}

impl SignatureVerifier {
  pub fn new(secret: &[u8]) -> Result<Self, hmac::digest::InvalidLength> {
    Ok(Self {
      keyed: HmacSha256::new_from_slice(secret)?,
    })
  }

  pub fn expected_signature(&self, gateway_order_id: &str, payment_id: &str) -> String {
    let mut mac = self.keyed.clone();
    mac.update(gateway_order_id.as_bytes());
    mac.update(b"|");
    mac.update(payment_id.as_bytes());
    hex::encode(mac.finalize().into_bytes())
  }

  /// Exact, case-sensitive comparison, constant time over equal lengths.
  pub fn verify(&self, gateway_order_id: &str, payment_id: &str, signature: &str) -> bool {
    let expected = self.expected_signature(gateway_order_id, payment_id);
    if expected.len() != signature.len() {
      return false;
    }
    expected
      .bytes()
      .zip(signature.bytes())
      .fold(0u8, |acc, (a, b)| acc | (a ^ b))
      == 0
  }
}

impl std::fmt::Debug for SignatureVerifier {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("SignatureVerifier").field("secret", &"[REDACTED]").finish()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn signs_lowercase_hex_and_verifies_itself() {
    let verifier = SignatureVerifier::new(b"secret").unwrap();
    let sig = verifier.expected_signature("order_1", "pay_1");
    assert_eq!(sig.len(), 64);
    assert!(sig.chars().all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c)));
    assert!(verifier.verify("order_1", "pay_1", &sig));
  }

  #[test]
  fn tampering_with_either_id_fails() {
    let verifier = SignatureVerifier::new(b"secret").unwrap();
    let sig = verifier.expected_signature("order_1", "pay_1");
    assert!(!verifier.verify("order_2", "pay_1", &sig));
    assert!(!verifier.verify("order_1", "pay_2", &sig));
    assert!(!verifier.verify("order_1", "pay_1", &sig[..63]));
  }

  #[test]
  fn comparison_is_case_sensitive() {
    let verifier = SignatureVerifier::new(b"secret").unwrap();
    let sig = verifier.expected_signature("order_1", "pay_1");
    assert!(!verifier.verify("order_1", "pay_1", &sig.to_uppercase()));
  }

  #[test]
  fn other_secret_does_not_verify() {
    let sig = SignatureVerifier::new(b"secret").unwrap().expected_signature("order_1", "pay_1");
    assert!(!SignatureVerifier::new(b"other").unwrap().verify("order_1", "pay_1", &sig));
  }

  #[test]
  fn intent_amount_is_in_minor_units() {
    let id = uuid::Uuid::new_v4();
    let req = IntentRequest::for_order(Money::from_minor(22_000), id);
    assert_eq!(req.amount_minor, 22_000);
    assert_eq!(req.currency, "INR");
    assert_eq!(req.receipt, format!("receipt_{}", id));
  }
}
