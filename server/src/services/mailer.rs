// harvesthub/server/src/services/mailer.rs

//! Order confirmation mail: HTML rendering plus two senders. `LogMailer`
//! only logs the message; `BrevoMailer` posts it to Brevo's transactional
//! mail API.

use anyhow::{anyhow, Context};
use async_trait::async_trait;
use chrono::{Datelike, Utc};
use harvesthub_core::model::Order;
use harvesthub_core::{OrderNotifier, Recipient};
use reqwest::Client;
use serde::Serialize;
use std::time::Duration;
use tracing::{info, instrument};

const BREVO_SEND_URL: &str = "https://api.brevo.com/v3/smtp/email";
const SENDER_NAME: &str = "HarvestHub";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedMail {
  pub to: String,
  pub subject: String,
  pub html: String,
}

fn escape_html(raw: &str) -> String {
  let mut out = String::with_capacity(raw.len());
  for c in raw.chars() {
    match c {
      '&' => out.push_str("&amp;"),
      '<' => out.push_str("&lt;"),
      '>' => out.push_str("&gt;"),
      '"' => out.push_str("&quot;"),
      '\'' => out.push_str("&#39;"),
      other => out.push(other),
    }
  }
  out
}

pub fn render_confirmation(recipient: &Recipient, order: &Order) -> RenderedMail {
  let address = &order.shipping_address;
  let rows: String = order
    .lines
    .iter()
    .map(|line| {
      format!(
        r#"<tr style="border-bottom: 1px solid #eee;">
<td style="padding: 10px 0;"><img src="{image}" alt="{name}" style="width: 50px; height: 50px; object-fit: cover; border-radius: 5px;"></td>
<td style="padding: 10px;"><strong>{name}</strong><br/><span style="color: #777;">&#8377;{price} x {qty}</span></td>
<td style="padding: 10px; text-align: right;"><strong>&#8377;{total}</strong></td>
</tr>"#,
        image = escape_html(&line.image),
        name = escape_html(&line.name),
        price = line.price,
        qty = line.quantity,
        total = line.line_total().unwrap_or_default(),
      )
    })
    .collect();

  let html = format!(
    r#"<div style="font-family: Arial, sans-serif; max-width: 600px; margin: 0 auto; padding: 20px; border: 1px solid #e0e0e0; border-radius: 10px;">
<div style="text-align: center; margin-bottom: 20px;">
<h1 style="color: #16a34a;">Order Confirmed!</h1>
<p style="color: #555;">Thank you for your purchase, {customer}.</p>
</div>
<div style="background-color: #f9fafb; padding: 15px; border-radius: 8px; margin-bottom: 20px;">
<p><strong>Order ID:</strong> {order_id}</p>
<p><strong>Date:</strong> {date}</p>
<p><strong>Payment Method:</strong> {method}</p>
<p><strong>Shipping Address:</strong><br/>{street}, {city}, {postal}</p>
</div>
<h3 style="border-bottom: 1px solid #eee; padding-bottom: 10px;">Order Details</h3>
<table style="width: 100%; border-collapse: collapse;">{rows}</table>
<div style="text-align: right; margin-top: 20px;">
<p style="font-size: 18px;"><strong>Total: <span style="color: #16a34a;">&#8377;{grand_total}</span></strong></p>
</div>
<div style="text-align: center; margin-top: 30px; border-top: 1px solid #eee; padding-top: 20px; color: #888; font-size: 12px;">
<p>&copy; {year} HarvestHub. All rights reserved.</p>
</div>
</div>"#,
    customer = escape_html(&recipient.name),
    order_id = order.id,
    date = order.created_at.format("%d %b %Y"),
    method = escape_html(order.payment_method.as_str()),
    street = escape_html(&address.address),
    city = escape_html(&address.city),
    postal = escape_html(&address.postal_code),
    rows = rows,
    grand_total = order.pricing.total_price,
    year = Utc::now().year(),
  );

  RenderedMail {
    to: recipient.email.clone(),
    subject: format!("Order Confirmation - Order #{}", order.id),
    html,
  }
}

/// Logs confirmations instead of sending them.
pub struct LogMailer {
  sender_email: String,
}

impl LogMailer {
  pub fn new(sender_email: impl Into<String>) -> Self {
    Self {
      sender_email: sender_email.into(),
    }
  }
}

#[async_trait]
impl OrderNotifier for LogMailer {
  #[instrument(name = "mailer::log", skip_all, fields(order_id = %order.id))]
  async fn order_confirmed(&self, recipient: &Recipient, order: &Order) -> anyhow::Result<()> {
    let mail = render_confirmation(recipient, order);
    info!(
      to = %mail.to,
      from = %self.sender_email,
      subject = %mail.subject,
      body_len = mail.html.len(),
      "Simulated order confirmation email."
    );
    Ok(())
  }
}

#[derive(Serialize)]
struct BrevoAddress<'a> {
  name: &'a str,
  email: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct BrevoMessage<'a> {
  sender: BrevoAddress<'a>,
  to: Vec<BrevoAddress<'a>>,
  subject: &'a str,
  html_content: &'a str,
}

pub struct BrevoMailer {
  client: Client,
  api_key: String,
  sender_email: String,
}

impl BrevoMailer {
  pub fn new(api_key: impl Into<String>, sender_email: impl Into<String>) -> Result<Self, reqwest::Error> {
    let client = Client::builder().timeout(Duration::from_secs(10)).build()?;
    Ok(Self {
      client,
      api_key: api_key.into(),
      sender_email: sender_email.into(),
    })
  }
}

#[async_trait]
impl OrderNotifier for BrevoMailer {
  #[instrument(name = "mailer::brevo", skip_all, fields(order_id = %order.id))]
  async fn order_confirmed(&self, recipient: &Recipient, order: &Order) -> anyhow::Result<()> {
    let mail = render_confirmation(recipient, order);
    let message = BrevoMessage {
      sender: BrevoAddress {
        name: SENDER_NAME,
        email: &self.sender_email,
      },
      to: vec![BrevoAddress {
        name: &recipient.name,
        email: &mail.to,
      }],
      subject: &mail.subject,
      html_content: &mail.html,
    };
    let response = self
      .client
      .post(BREVO_SEND_URL)
      .header("api-key", &self.api_key)
      .json(&message)
      .send()
      .await
      .context("Brevo request failed")?;
    let status = response.status();
    if !status.is_success() {
      let body = response.text().await.unwrap_or_default();
      return Err(anyhow!("Brevo returned {}: {}", status, body));
    }
    info!(to = %mail.to, "Order confirmation email sent.");
    Ok(())
  }
}
