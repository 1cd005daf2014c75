// harvesthub/core/src/notify.rs

//! Best-effort order confirmations. Delivery runs detached from the request
//! and is never retried; a failure is only logged.

use crate::model::Order;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{error, info, warn, Instrument};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Recipient {
  pub name: String,
  pub email: String,
}

#[async_trait]
pub trait OrderNotifier: Send + Sync {
  async fn order_confirmed(&self, recipient: &Recipient, order: &Order) -> anyhow::Result<()>;
}

/// Notifier that drops every message. Useful where no sender is configured.
#[derive(Debug, Default, Clone, Copy)]
pub struct SilentNotifier;

#[async_trait]
impl OrderNotifier for SilentNotifier {
  async fn order_confirmed(&self, _recipient: &Recipient, _order: &Order) -> anyhow::Result<()> {
    Ok(())
  }
}

/// Spawns delivery of a confirmation on the current runtime and returns
/// immediately. Returns `false` when no runtime is available.
pub fn dispatch_confirmation(notifier: Arc<dyn OrderNotifier>, recipient: Recipient, order: Order) -> bool {
  let Ok(handle) = tokio::runtime::Handle::try_current() else {
    warn!(order_id = %order.id, "No async runtime, confirmation not sent.");
    return false;
  };
  let span = tracing::info_span!("notify::order_confirmed", order_id = %order.id);
  handle.spawn(
    async move {
      match notifier.order_confirmed(&recipient, &order).await {
        Ok(()) => info!("Order confirmation delivered."),
        Err(e) => error!(error = %e, "Order confirmation failed."),
      }
    }
    .instrument(span),
  );
  true
}
