// tests/common/mod.rs
#![allow(dead_code)] // Each test binary uses a different subset.

use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, Utc};
use harvesthub_core::auth::Authenticator;
use harvesthub_core::catalog::CatalogService;
use harvesthub_core::error::{CommerceResult, GatewayError, StoreError};
use harvesthub_core::model::{
  Account, ClientOrderItem, ClientOrderRequest, Category, Money, Order, OrderStatus, PaymentMethod, PaymentResult,
  PricingPolicy, Product, Role, ShippingAddress, StockUnit, DEFAULT_PROFILE_PIC,
};
use harvesthub_core::notify::{OrderNotifier, Recipient};
use harvesthub_core::ordering::{OrderDesk, Stores};
use harvesthub_core::payment::{IntentRequest, PaymentCallback, PaymentGateway, PaymentIntent, SignatureVerifier};
use harvesthub_core::store::{InMemoryStore, OrderLedger, StoreResult};
use harvesthub_core::tokens::TokenIssuer;
use harvesthub_core::CredentialHasher;
use once_cell::sync::Lazy;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::Level;
use uuid::Uuid;

pub const GATEWAY_SECRET: &[u8] = b"test_gateway_secret";
pub const ADMIN_EMAIL: &str = "owner@harvesthub.test";

static TRACING_INIT: Lazy<()> = Lazy::new(|| {
  tracing_subscriber::fmt()
    .with_max_level(Level::DEBUG)
    .with_test_writer()
    .try_init()
    .ok();
});

pub fn setup_tracing() {
  Lazy::force(&TRACING_INIT);
}

// --- Collaborator doubles ---

/// Reversible "hash" so tests stay fast.
pub struct PlainHasher;

impl CredentialHasher for PlainHasher {
  fn hash(&self, password: &str) -> CommerceResult<String> {
    Ok(format!("plain${}", password))
  }

  fn verify(&self, stored_hash: &str, password: &str) -> CommerceResult<bool> {
    Ok(stored_hash.strip_prefix("plain$") == Some(password))
  }
}

#[derive(Default)]
pub struct FakeGateway {
  pub fail: AtomicBool,
  pub requests: Mutex<Vec<IntentRequest>>,
}

#[async_trait]
impl PaymentGateway for FakeGateway {
  async fn create_intent(&self, request: &IntentRequest) -> Result<PaymentIntent, GatewayError> {
    if self.fail.load(Ordering::SeqCst) {
      return Err(GatewayError::Transport("gateway down".to_string()));
    }
    self.requests.lock().push(request.clone());
    Ok(PaymentIntent {
      id: format!("order_{}", Uuid::new_v4().simple()),
      amount: request.amount_minor,
      currency: request.currency.clone(),
      receipt: Some(request.receipt.clone()),
      status: "created".to_string(),
    })
  }
}

#[derive(Default)]
pub struct RecordingNotifier {
  pub fail: AtomicBool,
  pub attempts: AtomicUsize,
  pub sent: Mutex<Vec<(Recipient, Uuid)>>,
}

impl RecordingNotifier {
  /// Polls until `count` delivery attempts were made or a second passes.
  pub async fn wait_for_attempts(&self, count: usize) -> usize {
    for _ in 0..100 {
      if self.attempts.load(Ordering::SeqCst) >= count {
        break;
      }
      tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    }
    self.attempts.load(Ordering::SeqCst)
  }

  /// Gives detached tasks a chance to run, then reports attempts so far.
  pub async fn settle(&self) -> usize {
    tokio::time::sleep(std::time::Duration::from_millis(50)).await;
    self.attempts.load(Ordering::SeqCst)
  }
}

#[async_trait]
impl OrderNotifier for RecordingNotifier {
  async fn order_confirmed(&self, recipient: &Recipient, order: &Order) -> anyhow::Result<()> {
    self.attempts.fetch_add(1, Ordering::SeqCst);
    if self.fail.load(Ordering::SeqCst) {
      anyhow::bail!("smtp relay refused connection");
    }
    self.sent.lock().push((recipient.clone(), order.id));
    Ok(())
  }
}

/// Ledger that can be told to fail inserts, to exercise rollback.
pub struct SwitchableLedger {
  pub inner: Arc<InMemoryStore>,
  pub fail_inserts: AtomicBool,
}

#[async_trait]
impl OrderLedger for SwitchableLedger {
  async fn insert_order(&self, order: &Order) -> StoreResult<()> {
    if self.fail_inserts.load(Ordering::SeqCst) {
      return Err(StoreError::Backend(anyhow::anyhow!("connection reset by peer")));
    }
    self.inner.insert_order(order).await
  }

  async fn find_order(&self, id: Uuid) -> StoreResult<Option<Order>> {
    self.inner.find_order(id).await
  }

  async fn find_by_idempotency_key(&self, account_id: Uuid, key: &str) -> StoreResult<Option<Order>> {
    self.inner.find_by_idempotency_key(account_id, key).await
  }

  async fn orders_for_account(&self, account_id: Uuid) -> StoreResult<Vec<Order>> {
    self.inner.orders_for_account(account_id).await
  }

  async fn all_orders(&self) -> StoreResult<Vec<Order>> {
    self.inner.all_orders().await
  }

  async fn transition_status(&self, id: Uuid, from: OrderStatus, to: OrderStatus) -> StoreResult<Option<Order>> {
    self.inner.transition_status(id, from, to).await
  }

  async fn record_payment(
    &self,
    id: Uuid,
    result: &PaymentResult,
    paid_at: chrono::DateTime<Utc>,
  ) -> StoreResult<Option<Order>> {
    self.inner.record_payment(id, result, paid_at).await
  }

  async fn mark_delivered(&self, id: Uuid, delivered_at: chrono::DateTime<Utc>) -> StoreResult<Option<Order>> {
    self.inner.mark_delivered(id, delivered_at).await
  }

  async fn revenue_summary(&self) -> StoreResult<(Money, i64)> {
    self.inner.revenue_summary().await
  }
}

// --- Harness ---

pub struct Harness {
  pub store: Arc<InMemoryStore>,
  pub ledger: Arc<SwitchableLedger>,
  pub gateway: Arc<FakeGateway>,
  pub notifier: Arc<RecordingNotifier>,
  pub desk: OrderDesk,
  pub auth: Authenticator,
  pub catalog: CatalogService,
}

pub fn token_issuer() -> TokenIssuer {
  TokenIssuer::new(
    b"test_access_secret",
    b"test_refresh_secret",
    ChronoDuration::minutes(15),
    ChronoDuration::days(30),
  )
  .unwrap()
}

impl Harness {
  pub fn new() -> Self {
    Self::with_policy(PricingPolicy::default())
  }

  pub fn with_policy(policy: PricingPolicy) -> Self {
    setup_tracing();
    let store = Arc::new(InMemoryStore::new());
    let ledger = Arc::new(SwitchableLedger {
      inner: store.clone(),
      fail_inserts: AtomicBool::new(false),
    });
    let gateway = Arc::new(FakeGateway::default());
    let notifier = Arc::new(RecordingNotifier::default());
    let stores = Stores {
      catalog: store.clone(),
      accounts: store.clone(),
      ledger: ledger.clone(),
    };
    let desk = OrderDesk::new(
      stores,
      gateway.clone(),
      SignatureVerifier::new(GATEWAY_SECRET).unwrap(),
      notifier.clone(),
      policy,
    );
    let auth = Authenticator::new(
      store.clone(),
      token_issuer(),
      Arc::new(PlainHasher),
      Some(ADMIN_EMAIL.to_string()),
    );
    let catalog = CatalogService::new(store.clone());
    Self {
      store,
      ledger,
      gateway,
      notifier,
      desk,
      auth,
      catalog,
    }
  }

  pub async fn add_product(&self, name: &str, stock: f64, pack_size: f64, unit: StockUnit, price: f64) -> Product {
    let now = Utc::now();
    let product = Product {
      id: Uuid::new_v4(),
      name: name.to_string(),
      description: format!("Fresh {}", name.to_lowercase()),
      short_description: None,
      price: Money::from_major(price),
      category: Category::Vegetable,
      images: vec![format!("https://img.test/{}.jpg", name.to_lowercase())],
      stock,
      pack_size,
      unit,
      rating: 4.0,
      num_reviews: 0,
      is_organic: false,
      created_at: now,
      updated_at: now,
    };
    harvesthub_core::CatalogStore::insert_product(self.store.as_ref(), &product)
      .await
      .unwrap();
    product
  }

  pub async fn add_account(&self, name: &str, role: Role) -> Account {
    let now = Utc::now();
    let account = Account {
      id: Uuid::new_v4(),
      name: name.to_string(),
      email: format!("{}@harvesthub.test", name.to_lowercase()),
      password_hash: None,
      external_id: None,
      profile_pic: DEFAULT_PROFILE_PIC.to_string(),
      role,
      phone: None,
      address: None,
      refresh_token: None,
      created_at: now,
      updated_at: now,
    };
    harvesthub_core::AccountStore::insert_account(self.store.as_ref(), &account)
      .await
      .unwrap();
    account
  }

  pub fn stock(&self, product: &Product) -> f64 {
    self.store.stock_of(product.id).unwrap()
  }

  pub fn sign(&self, gateway_order_id: &str, payment_id: &str) -> PaymentCallback {
    let signature = SignatureVerifier::new(GATEWAY_SECRET)
      .unwrap()
      .expected_signature(gateway_order_id, payment_id);
    PaymentCallback {
      gateway_order_id: gateway_order_id.to_string(),
      payment_id: payment_id.to_string(),
      signature,
    }
  }
}

pub fn shipping() -> ShippingAddress {
  ShippingAddress {
    address: "12 Market Road".to_string(),
    city: "Pune".to_string(),
    postal_code: "411001".to_string(),
    country: "India".to_string(),
    phone: Some("+91 98765 43210".to_string()),
  }
}

pub fn order_request(items: &[(&Product, u32)], method: PaymentMethod) -> ClientOrderRequest {
  ClientOrderRequest {
    order_items: items
      .iter()
      .map(|(product, quantity)| ClientOrderItem {
        product: product.id,
        quantity: *quantity,
      })
      .collect(),
    shipping_address: shipping(),
    payment_method: method,
    idempotency_key: None,
  }
}
