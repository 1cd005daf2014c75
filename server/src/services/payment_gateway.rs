// harvesthub/server/src/services/payment_gateway.rs

use async_trait::async_trait;
use harvesthub_core::{GatewayError, IntentRequest, PaymentGateway, PaymentIntent};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::config::RazorpayConfig;

const RAZORPAY_ORDERS_URL: &str = "https://api.razorpay.com/v1/orders";

#[derive(Serialize)]
struct CreateOrderBody<'a> {
  amount: i64,
  currency: &'a str,
  receipt: &'a str,
}

#[derive(Deserialize)]
struct RazorpayErrorBody {
  error: RazorpayErrorDetail,
}

#[derive(Deserialize)]
struct RazorpayErrorDetail {
  #[serde(default)]
  code: String,
  #[serde(default)]
  description: String,
}

/// Creates Razorpay orders over the REST API with basic auth.
pub struct RazorpayGateway {
  client: Client,
  endpoint: String,
  key_id: String,
  key_secret: String,
}

impl RazorpayGateway {
  pub fn new(config: &RazorpayConfig) -> Result<Self, reqwest::Error> {
    let client = Client::builder().timeout(Duration::from_secs(15)).build()?;
    Ok(Self {
      client,
      endpoint: RAZORPAY_ORDERS_URL.to_string(),
      key_id: config.key_id.clone(),
      key_secret: config.key_secret.clone(),
    })
  }
}

#[async_trait]
impl PaymentGateway for RazorpayGateway {
  #[instrument(name = "razorpay::create_order", skip(self, request), fields(receipt = %request.receipt, amount = request.amount_minor))]
  async fn create_intent(&self, request: &IntentRequest) -> Result<PaymentIntent, GatewayError> {
    let body = CreateOrderBody {
      amount: request.amount_minor,
      currency: &request.currency,
      receipt: &request.receipt,
    };
    let response = self
      .client
      .post(&self.endpoint)
      .basic_auth(&self.key_id, Some(&self.key_secret))
      .json(&body)
      .send()
      .await
      .map_err(|e| GatewayError::Transport(e.to_string()))?;

    let status = response.status();
    if !status.is_success() {
      let detail = match response.json::<RazorpayErrorBody>().await {
        Ok(body) => format!("{} {}", body.error.code, body.error.description),
        Err(_) => status.to_string(),
      };
      warn!(%status, %detail, "Razorpay rejected order creation.");
      return Err(GatewayError::Rejected(detail));
    }

    let intent = response
      .json::<PaymentIntent>()
      .await
      .map_err(|e| GatewayError::Transport(format!("Unreadable Razorpay response: {}", e)))?;
    info!(gateway_order_id = %intent.id, "Razorpay order created.");
    Ok(intent)
  }
}

/// Offline gateway for local development. Every request succeeds with a
/// fabricated order id.
#[derive(Debug, Default, Clone, Copy)]
pub struct MockGateway;

#[async_trait]
impl PaymentGateway for MockGateway {
  #[instrument(name = "mock_gateway::create_order", skip(self, request), fields(receipt = %request.receipt))]
  async fn create_intent(&self, request: &IntentRequest) -> Result<PaymentIntent, GatewayError> {
    if request.amount_minor <= 0 {
      return Err(GatewayError::Rejected("Amount must be greater than zero".to_string()));
    }
    let id = format!("order_mock_{}", Uuid::new_v4().simple());
    info!(gateway_order_id = %id, "Simulated gateway order created.");
    Ok(PaymentIntent {
      id,
      amount: request.amount_minor,
      currency: request.currency.clone(),
      receipt: Some(request.receipt.clone()),
      status: "created".to_string(),
    })
  }
}
