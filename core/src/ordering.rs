// harvesthub/core/src/ordering.rs

//! Order placement, payment confirmation, cancellation and fulfilment.
//!
//! Placement runs as a [`Flow`] whose `reserve_stock` step has a compensator,
//! so any failure after stock was taken puts every taken unit back.

use crate::error::{CommerceError, CommerceResult, StoreError};
use crate::flow::{Flow, FlowContext, FlowError, FlowOutcome, SkipCondition, StepControl};
use crate::model::{
  Account, ClientOrderRequest, Order, OrderLine, OrderStats, OrderStatus, PaymentMethod, PaymentResult, Pricing,
  PricingPolicy, SavedAddress, ValidatedOrderLine, PAYMENT_STATUS_PENDING_COD, PAYMENT_STATUS_SUCCESS,
};
use crate::notify::{dispatch_confirmation, OrderNotifier, Recipient};
use crate::payment::{
  receipt_for, IntentRequest, PaymentCallback, PaymentGateway, PaymentIntent, SignatureVerifier, DEFAULT_CURRENCY,
};
use crate::store::{AccountStore, CatalogStore, OrderLedger, StockTake};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

/// The three stores an [`OrderDesk`] reads and writes.
#[derive(Clone)]
pub struct Stores {
  pub catalog: Arc<dyn CatalogStore>,
  pub accounts: Arc<dyn AccountStore>,
  pub ledger: Arc<dyn OrderLedger>,
}

/// Result of a placement request.
#[derive(Debug, Clone)]
pub struct PlacedOrder {
  pub order: Order,
  /// Present for gateway payments: what the client needs to open checkout.
  pub payment_intent: Option<PaymentIntent>,
  /// True when an earlier order with the same idempotency key was returned.
  pub replayed: bool,
}

struct PlacementState {
  order_id: Uuid,
  account: Account,
  request: ClientOrderRequest,
  lines: Vec<ValidatedOrderLine>,
  /// Stock actually taken so far, as (product, amount).
  reserved: Vec<(Uuid, f64)>,
  pricing: Pricing,
  intent: Option<PaymentIntent>,
  order: Option<Order>,
}

impl PlacementState {
  fn build_order(&self, now: DateTime<Utc>) -> Order {
    let payment_result = match self.request.payment_method {
      PaymentMethod::Cod => Some(PaymentResult {
        id: None,
        status: PAYMENT_STATUS_PENDING_COD.to_string(),
        update_time: Some(now),
        email_address: Some(self.account.email.clone()),
      }),
      _ => None,
    };
    Order {
      id: self.order_id,
      account_id: self.account.id,
      lines: self.lines.iter().map(|l| l.line.clone()).collect(),
      shipping_address: self.request.shipping_address.clone(),
      payment_method: self.request.payment_method.clone(),
      payment_result,
      pricing: self.pricing,
      is_paid: false,
      paid_at: None,
      is_delivered: false,
      delivered_at: None,
      status: OrderStatus::Processing,
      gateway_order_id: self.intent.as_ref().map(|i| i.id.clone()),
      idempotency_key: self.request.idempotency_key.clone(),
      created_at: now,
      updated_at: now,
    }
  }
}

/// Rebuilds the checkout details of an unpaid gateway order so a replayed
/// placement can still open checkout.
fn pending_intent(order: &Order) -> Option<PaymentIntent> {
  if order.payment_method != PaymentMethod::Razorpay || order.is_paid || order.status != OrderStatus::Processing {
    return None;
  }
  let gateway_order_id = order.gateway_order_id.as_ref()?;
  Some(PaymentIntent {
    id: gateway_order_id.clone(),
    amount: order.pricing.total_price.minor(),
    currency: DEFAULT_CURRENCY.to_string(),
    receipt: Some(receipt_for(order.id)),
    status: "created".to_string(),
  })
}

fn replayed(order: Order) -> PlacedOrder {
  PlacedOrder {
    payment_intent: pending_intent(&order),
    order,
    replayed: true,
  }
}

fn skip_unless(method: PaymentMethod) -> SkipCondition<PlacementState> {
  Arc::new(move |state: &PlacementState| state.request.payment_method != method)
}

fn recipient_of(account: &Account) -> Recipient {
  Recipient {
    name: account.name.clone(),
    email: account.email.clone(),
  }
}

/// Returns every reserved amount to the catalog. Failures are logged; the
/// remaining items are still attempted.
async fn release_reserved(catalog: &dyn CatalogStore, ctx: &FlowContext<PlacementState>) {
  let reserved = std::mem::take(&mut ctx.write().reserved);
  for (product_id, amount) in reserved.into_iter().rev() {
    match catalog.return_stock(product_id, amount).await {
      Ok(Some(stock)) => debug!(%product_id, amount, stock, "Reserved stock released."),
      Ok(None) => warn!(%product_id, amount, "Product vanished before its reservation was released."),
      Err(e) => error!(%product_id, amount, error = %e, "Failed to release reserved stock."),
    }
  }
}

fn build_placement_flow(
  stores: &Stores,
  gateway: Arc<dyn PaymentGateway>,
  notifier: Arc<dyn OrderNotifier>,
  pricing: PricingPolicy,
) -> Flow<PlacementState, CommerceError> {
  let mut flow = Flow::<PlacementState, CommerceError>::new(
    "order_placement",
    &[
      ("resolve_lines", false, None),
      ("reserve_stock", false, None),
      ("open_payment", false, Some(skip_unless(PaymentMethod::Razorpay))),
      ("record_order", false, None),
      ("save_contact_details", true, None),
      ("send_confirmation", true, Some(skip_unless(PaymentMethod::Cod))),
    ],
  );

  let catalog = stores.catalog.clone();
  flow.on("resolve_lines", move |ctx: FlowContext<PlacementState>| {
    let catalog = catalog.clone();
    Box::pin(async move {
      let items = ctx.snapshot(|s| s.request.order_items.clone());
      let mut lines = Vec::with_capacity(items.len());
      for item in &items {
        let product = catalog
          .find_product(item.product)
          .await?
          .ok_or_else(|| CommerceError::not_found("Product", item.product))?;
        let line = ValidatedOrderLine::from_catalog(item, &product);
        if product.stock < line.deduction {
          return Err(CommerceError::insufficient_stock(
            product.id,
            &product.name,
            product.stock,
            line.deduction,
            product.unit,
          ));
        }
        lines.push(line);
      }
      // Priced before any stock is taken so an unpriceable order reserves nothing.
      let order_lines: Vec<OrderLine> = lines.iter().map(|l| l.line.clone()).collect();
      let priced = Pricing::compute(&order_lines, &pricing)?;
      let mut state = ctx.write();
      state.lines = lines;
      state.pricing = priced;
      Ok::<_, CommerceError>(StepControl::Continue)
    })
  });

  let catalog = stores.catalog.clone();
  flow.on("reserve_stock", move |ctx: FlowContext<PlacementState>| {
    let catalog = catalog.clone();
    Box::pin(async move {
      let lines = ctx.snapshot(|s| s.lines.clone());
      for vl in &lines {
        let product_id = vl.line.product_id;
        let outcome = catalog.take_stock(product_id, vl.deduction).await;
        let failure = match outcome {
          Ok(StockTake::Taken { remaining }) => {
            debug!(%product_id, taken = vl.deduction, remaining, "Stock reserved.");
            ctx.write().reserved.push((product_id, vl.deduction));
            continue;
          }
          Ok(StockTake::Insufficient { available }) => CommerceError::insufficient_stock(
            product_id,
            &vl.line.name,
            available,
            vl.deduction,
            vl.line.unit,
          ),
          Ok(StockTake::Missing) => CommerceError::not_found("Product", product_id),
          Err(e) => e.into(),
        };
        // This step did not complete, so the flow will not compensate it.
        release_reserved(catalog.as_ref(), &ctx).await;
        return Err(failure);
      }
      Ok::<_, CommerceError>(StepControl::Continue)
    })
  });
  let catalog = stores.catalog.clone();
  flow.compensate("reserve_stock", move |ctx: FlowContext<PlacementState>| {
    let catalog = catalog.clone();
    Box::pin(async move {
      release_reserved(catalog.as_ref(), &ctx).await;
      Ok::<_, CommerceError>(())
    })
  });

  flow.on("open_payment", move |ctx: FlowContext<PlacementState>| {
    let gateway = gateway.clone();
    Box::pin(async move {
      let (order_id, total) = ctx.snapshot(|s| (s.order_id, s.pricing.total_price));
      let intent = gateway.create_intent(&IntentRequest::for_order(total, order_id)).await?;
      info!(%order_id, gateway_order_id = %intent.id, "Payment intent opened.");
      ctx.write().intent = Some(intent);
      Ok::<_, CommerceError>(StepControl::Continue)
    })
  });

  let ledger = stores.ledger.clone();
  flow.on("record_order", move |ctx: FlowContext<PlacementState>| {
    let ledger = ledger.clone();
    Box::pin(async move {
      let order = ctx.snapshot(|s| s.build_order(Utc::now()));
      ledger.insert_order(&order).await?;
      ctx.write().order = Some(order);
      Ok::<_, CommerceError>(StepControl::Continue)
    })
  });

  let accounts = stores.accounts.clone();
  flow.on("save_contact_details", move |ctx: FlowContext<PlacementState>| {
    let accounts = accounts.clone();
    Box::pin(async move {
      let (account_id, shipping) = ctx.snapshot(|s| (s.account.id, s.request.shipping_address.clone()));
      let saved = SavedAddress {
        address: shipping.address,
        city: shipping.city,
        postal_code: shipping.postal_code,
        country: shipping.country,
      };
      accounts
        .save_contact_details(account_id, &saved, shipping.phone.as_deref())
        .await?;
      Ok::<_, CommerceError>(StepControl::Continue)
    })
  });

  flow.on("send_confirmation", move |ctx: FlowContext<PlacementState>| {
    let notifier = notifier.clone();
    Box::pin(async move {
      let (recipient, order) = ctx.snapshot(|s| (recipient_of(&s.account), s.order.clone()));
      if let Some(order) = order {
        dispatch_confirmation(notifier, recipient, order);
      }
      Ok::<_, CommerceError>(StepControl::Continue)
    })
  });

  flow
}

pub struct OrderDesk {
  stores: Stores,
  verifier: SignatureVerifier,
  notifier: Arc<dyn OrderNotifier>,
  placement: Flow<PlacementState, CommerceError>,
}

impl OrderDesk {
  pub fn new(
    stores: Stores,
    gateway: Arc<dyn PaymentGateway>,
    verifier: SignatureVerifier,
    notifier: Arc<dyn OrderNotifier>,
    pricing: PricingPolicy,
  ) -> Self {
    let placement = build_placement_flow(&stores, gateway, notifier.clone(), pricing);
    Self {
      stores,
      verifier,
      notifier,
      placement,
    }
  }

  fn require_admin(requester: &Account) -> CommerceResult<()> {
    if requester.is_admin() {
      Ok(())
    } else {
      Err(CommerceError::Forbidden("Not authorized as an admin".to_string()))
    }
  }

  async fn load(&self, order_id: Uuid) -> CommerceResult<Order> {
    self
      .stores
      .ledger
      .find_order(order_id)
      .await?
      .ok_or_else(|| CommerceError::not_found("Order", order_id))
  }

  /// Places an order for `account`: prices it from the catalog, reserves
  /// stock for every line or none, opens a gateway payment when needed and
  /// records it. A replayed idempotency key returns the recorded order.
  #[instrument(name = "orders::place", skip(self, account, request), fields(account_id = %account.id))]
  pub async fn place_order(&self, account: &Account, request: ClientOrderRequest) -> CommerceResult<PlacedOrder> {
    request.validate()?;

    let key = request.idempotency_key.clone();
    if let Some(key) = key.as_deref() {
      if let Some(order) = self.stores.ledger.find_by_idempotency_key(account.id, key).await? {
        info!(order_id = %order.id, "Idempotent replay, returning existing order.");
        return Ok(replayed(order));
      }
    }

    let ctx = FlowContext::new(PlacementState {
      order_id: Uuid::new_v4(),
      account: account.clone(),
      request,
      lines: Vec::new(),
      reserved: Vec::new(),
      pricing: Pricing::default(),
      intent: None,
      order: None,
    });

    match self.placement.run(ctx.clone()).await {
      Ok(FlowOutcome::Completed) => {}
      Ok(FlowOutcome::Stopped) => {
        return Err(FlowError::Incomplete {
          flow: self.placement.name().to_string(),
        }
        .into())
      }
      // A concurrent request with the same key won the insert; stock was
      // already returned by compensation.
      Err(CommerceError::Storage(StoreError::Conflict(_))) if key.is_some() => {
        let key = key.as_deref().unwrap_or_default();
        let order = self
          .stores
          .ledger
          .find_by_idempotency_key(account.id, key)
          .await?
          .ok_or_else(|| CommerceError::AlreadyExists("Duplicate idempotency key".to_string()))?;
        return Ok(replayed(order));
      }
      Err(e) => return Err(e),
    }

    let (order, intent) = {
      let mut state = ctx.write();
      (state.order.take(), state.intent.take())
    };
    let order = order.ok_or_else(|| FlowError::Incomplete {
      flow: self.placement.name().to_string(),
    })?;
    info!(order_id = %order.id, total = %order.pricing.total_price, method = %order.payment_method, "Order placed.");
    Ok(PlacedOrder {
      order,
      payment_intent: intent,
      replayed: false,
    })
  }

  /// Confirms a gateway payment. The signature is checked before the order is
  /// looked up, and the gateway order id must be the one recorded on this
  /// order. Confirming an already paid order returns it unchanged without a
  /// second notification.
  #[instrument(name = "orders::verify_payment", skip(self, requester, callback), fields(account_id = %requester.id))]
  pub async fn verify_payment(
    &self,
    requester: &Account,
    order_id: Uuid,
    callback: &PaymentCallback,
  ) -> CommerceResult<Order> {
    let authentic = self
      .verifier
      .verify(&callback.gateway_order_id, &callback.payment_id, &callback.signature);
    if !authentic {
      warn!(%order_id, "Payment signature rejected.");
      return Err(CommerceError::InvalidSignature);
    }

    let order = self.load(order_id).await?;
    if !order.is_owned_by(requester.id) && !requester.is_admin() {
      return Err(CommerceError::Unauthorized("Not authorized to pay for this order".to_string()));
    }
    if order.gateway_order_id.as_deref() != Some(callback.gateway_order_id.as_str()) {
      warn!(%order_id, "Payment is for a different gateway order.");
      return Err(CommerceError::InvalidSignature);
    }

    if order.is_paid {
      info!(%order_id, "Order already paid, nothing to do.");
      return Ok(order);
    }
    if order.status != OrderStatus::Processing {
      return Err(CommerceError::InvalidState {
        status: order.status,
        reason: format!("Cannot record payment for an order that is {}", order.status),
      });
    }

    let owner = self.stores.accounts.find_account(order.account_id).await?;
    let now = Utc::now();
    let result = PaymentResult {
      id: Some(callback.payment_id.clone()),
      status: PAYMENT_STATUS_SUCCESS.to_string(),
      update_time: Some(now),
      email_address: owner.as_ref().map(|a| a.email.clone()),
    };

    let Some(paid) = self.stores.ledger.record_payment(order_id, &result, now).await? else {
      // Lost a race: either another confirmation landed first or the order
      // was cancelled in between.
      let current = self.load(order_id).await?;
      if current.is_paid {
        return Ok(current);
      }
      return Err(CommerceError::InvalidState {
        status: current.status,
        reason: format!("Cannot record payment for an order that is {}", current.status),
      });
    };

    info!(%order_id, payment_id = %callback.payment_id, "Payment recorded.");
    match owner {
      Some(owner) => {
        dispatch_confirmation(self.notifier.clone(), recipient_of(&owner), paid.clone());
      }
      None => warn!(%order_id, "Order owner missing, confirmation skipped."),
    }
    Ok(paid)
  }

  /// Cancels a Processing order and returns its stock, using the unit and
  /// pack size frozen on each line.
  #[instrument(name = "orders::cancel", skip(self, requester), fields(account_id = %requester.id))]
  pub async fn cancel_order(&self, requester: &Account, order_id: Uuid) -> CommerceResult<Order> {
    let order = self.load(order_id).await?;
    if !order.is_owned_by(requester.id) && !requester.is_admin() {
      return Err(CommerceError::Unauthorized("Not authorized to cancel this order".to_string()));
    }
    if let Some(reason) = order.status.cancel_blocker() {
      return Err(CommerceError::InvalidState {
        status: order.status,
        reason: reason.to_string(),
      });
    }

    let Some(cancelled) = self
      .stores
      .ledger
      .transition_status(order_id, OrderStatus::Processing, OrderStatus::Cancelled)
      .await?
    else {
      let current = self.load(order_id).await?;
      let reason = current
        .status
        .cancel_blocker()
        .unwrap_or("Order changed while it was being cancelled");
      return Err(CommerceError::InvalidState {
        status: current.status,
        reason: reason.to_string(),
      });
    };

    // The transition above succeeds at most once, so stock is returned once.
    for line in &cancelled.lines {
      let amount = line.stock_amount();
      match self.stores.catalog.return_stock(line.product_id, amount).await {
        Ok(Some(stock)) => debug!(product_id = %line.product_id, amount, stock, "Stock restored."),
        Ok(None) => warn!(product_id = %line.product_id, amount, "Product no longer exists, stock not restored."),
        Err(e) => error!(product_id = %line.product_id, amount, error = %e, "Stock restoration failed."),
      }
    }
    info!(%order_id, "Order cancelled.");
    Ok(cancelled)
  }

  #[instrument(name = "orders::deliver", skip(self, requester), fields(account_id = %requester.id))]
  pub async fn mark_delivered(&self, requester: &Account, order_id: Uuid) -> CommerceResult<Order> {
    Self::require_admin(requester)?;
    let order = self.load(order_id).await?;
    if let Some(delivered) = self.stores.ledger.mark_delivered(order_id, Utc::now()).await? {
      info!(%order_id, "Order delivered.");
      return Ok(delivered);
    }
    let current = self.load(order_id).await.unwrap_or(order);
    Err(CommerceError::InvalidState {
      status: current.status,
      reason: format!("Cannot deliver an order that is {}", current.status),
    })
  }

  pub async fn orders_for(&self, account: &Account) -> CommerceResult<Vec<Order>> {
    Ok(self.stores.ledger.orders_for_account(account.id).await?)
  }

  /// An order as seen by its owner or an admin.
  pub async fn order_for_viewer(&self, requester: &Account, order_id: Uuid) -> CommerceResult<Order> {
    let order = self.load(order_id).await?;
    if !order.is_owned_by(requester.id) && !requester.is_admin() {
      return Err(CommerceError::Unauthorized("Not authorized to view this order".to_string()));
    }
    Ok(order)
  }

  pub async fn all_orders(&self, requester: &Account) -> CommerceResult<Vec<Order>> {
    Self::require_admin(requester)?;
    Ok(self.stores.ledger.all_orders().await?)
  }

  #[instrument(name = "orders::stats", skip(self, requester))]
  pub async fn stats(&self, requester: &Account) -> CommerceResult<OrderStats> {
    Self::require_admin(requester)?;
    let (total_revenue, total_orders) = self.stores.ledger.revenue_summary().await?;
    Ok(OrderStats {
      total_revenue,
      total_orders,
      total_products: self.stores.catalog.count_products().await?,
      total_users: self.stores.accounts.count_customers().await?,
    })
  }
}
