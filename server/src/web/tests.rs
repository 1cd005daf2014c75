// harvesthub/server/src/web/tests.rs

//! Route-level tests against the in-memory stores.

use actix_web::http::header::LOCATION;
use actix_web::http::StatusCode;
use actix_web::{test, web, App};
use harvesthub_core::model::{Category, Money, PricingPolicy, ProductDraft, StockUnit};
use harvesthub_core::notify::SilentNotifier;
use harvesthub_core::{CatalogStore, CommerceResult, CredentialHasher, InMemoryStore, SignatureVerifier, Stores};
use serde_json::{json, Value};
use std::sync::Arc;
use uuid::Uuid;

use super::configure_app_routes;
use crate::config::{AppConfig, Environment, GatewayMode, RazorpayConfig};
use crate::services::payment_gateway::MockGateway;
use crate::state::{AppState, Backends};

const GATEWAY_SECRET: &str = "rzp_test_secret";
const ADMIN_EMAIL: &str = "owner@harvesthub.test";
const PASSWORD: &str = "harvest-pass";

struct PlainHasher;

impl CredentialHasher for PlainHasher {
  fn hash(&self, password: &str) -> CommerceResult<String> {
    Ok(format!("plain${}", password))
  }

  fn verify(&self, stored_hash: &str, password: &str) -> CommerceResult<bool> {
    Ok(stored_hash == format!("plain${}", password))
  }
}

fn test_config() -> AppConfig {
  AppConfig {
    server_host: "127.0.0.1".to_string(),
    server_port: 5000,
    database_url: "postgres://unused".to_string(),
    client_url: "http://localhost:5173".to_string(),
    server_url: "http://localhost:5000".to_string(),
    environment: Environment::Development,
    access_token_secret: "access-secret-for-tests".to_string(),
    refresh_token_secret: "refresh-secret-for-tests".to_string(),
    access_token_ttl_secs: 900,
    refresh_token_ttl_secs: 3600,
    gateway_mode: GatewayMode::Mock,
    razorpay: RazorpayConfig {
      key_id: "rzp_test_key".to_string(),
      key_secret: GATEWAY_SECRET.to_string(),
    },
    google: None,
    admin_email: Some(ADMIN_EMAIL.to_string()),
    sender_email: "orders@harvesthub.test".to_string(),
    brevo_api_key: None,
    pricing: PricingPolicy::default(),
    seed_db: false,
  }
}

fn test_state() -> (AppState, Arc<InMemoryStore>) {
  let store = Arc::new(InMemoryStore::new());
  let backends = Backends {
    stores: Stores {
      catalog: store.clone(),
      accounts: store.clone(),
      ledger: store.clone(),
    },
    gateway: Arc::new(MockGateway),
    notifier: Arc::new(SilentNotifier),
    hasher: Arc::new(PlainHasher),
    db: None,
  };
  let state = AppState::build(Arc::new(test_config()), backends).expect("state builds");
  (state, store)
}

fn tomato() -> ProductDraft {
  ProductDraft {
    name: "Tomato".to_string(),
    description: "Vine ripened".to_string(),
    short_description: None,
    price: Money::from_minor(4_000),
    category: Category::Fruit,
    images: vec!["https://img.test/tomato.jpg".to_string()],
    stock: 10.0,
    pack_size: 1.0,
    unit: StockUnit::Kg,
    rating: 4.5,
    num_reviews: 0,
    is_organic: true,
  }
}

fn shipping() -> Value {
  json!({ "address": "12 Market Road", "city": "Pune", "postalCode": "411001", "country": "India" })
}

macro_rules! spawn_app {
  ($state:expr) => {
    test::init_service(
      App::new()
        .app_data(web::Data::new($state.clone()))
        .configure(configure_app_routes),
    )
    .await
  };
}

macro_rules! send {
  ($app:expr, $req:expr) => {{
    let resp = test::call_service(&$app, $req.to_request()).await;
    let status = resp.status();
    let body: Value = test::read_body_json(resp).await;
    (status, body)
  }};
}

macro_rules! register {
  ($app:expr, $name:expr, $email:expr) => {{
    let (status, body) = send!(
      $app,
      test::TestRequest::post()
        .uri("/auth/register")
        .set_json(json!({ "name": $name, "email": $email, "password": PASSWORD }))
    );
    assert_eq!(status, StatusCode::CREATED, "{}", body);
    body
  }};
}

fn bearer(body: &Value) -> (&'static str, String) {
  ("Authorization", format!("Bearer {}", body["token"].as_str().unwrap_or_default()))
}

async fn stock_of(store: &InMemoryStore, id: Uuid) -> f64 {
  store.find_product(id).await.unwrap().unwrap().stock
}

#[actix_web::test]
async fn health_reports_ok_without_database() {
  let (state, _) = test_state();
  let app = spawn_app!(state);
  let (status, body) = send!(app, test::TestRequest::get().uri("/health"));
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["status"], "ok");
}

#[actix_web::test]
async fn register_login_me_round() {
  let (state, _) = test_state();
  let app = spawn_app!(state);

  let session = register!(app, "Asha", "Asha@HarvestHub.test");
  assert_eq!(session["email"], "asha@harvesthub.test");
  assert_eq!(session["role"], "user");
  assert!(session["refreshToken"].as_str().is_some());

  let (status, body) = send!(
    app,
    test::TestRequest::post()
      .uri("/auth/register")
      .set_json(json!({ "name": "Asha", "email": "asha@harvesthub.test", "password": PASSWORD }))
  );
  assert_eq!(status, StatusCode::CONFLICT);
  assert_eq!(body["error"], "User already exists");

  let (status, body) = send!(
    app,
    test::TestRequest::post()
      .uri("/auth/login")
      .set_json(json!({ "email": "asha@harvesthub.test", "password": "wrong-password" }))
  );
  assert_eq!(status, StatusCode::UNAUTHORIZED);
  assert_eq!(body["error"], "Invalid email or password");

  let (status, login) = send!(
    app,
    test::TestRequest::post()
      .uri("/auth/login")
      .set_json(json!({ "email": "asha@harvesthub.test", "password": PASSWORD }))
  );
  assert_eq!(status, StatusCode::OK);

  let (status, me) = send!(
    app,
    test::TestRequest::get().uri("/auth/me").insert_header(bearer(&login))
  );
  assert_eq!(status, StatusCode::OK);
  assert_eq!(me["name"], "Asha");
  assert!(me.get("passwordHash").is_none());
  assert!(me.get("refreshToken").is_none());
}

#[actix_web::test]
async fn refresh_issues_access_token_for_current_refresh_token_only() {
  let (state, _) = test_state();
  let app = spawn_app!(state);
  let first = register!(app, "Ravi", "ravi@harvesthub.test");

  let (status, body) = send!(
    app,
    test::TestRequest::post()
      .uri("/auth/refresh")
      .set_json(json!({ "refreshToken": first["refreshToken"] }))
  );
  assert_eq!(status, StatusCode::OK);
  assert!(body["accessToken"].as_str().is_some());

  // Logging in again replaces the stored refresh token.
  let (_, _) = send!(
    app,
    test::TestRequest::post()
      .uri("/auth/login")
      .set_json(json!({ "email": "ravi@harvesthub.test", "password": PASSWORD }))
  );
  let (status, _) = send!(
    app,
    test::TestRequest::post()
      .uri("/auth/refresh")
      .set_json(json!({ "refreshToken": first["refreshToken"] }))
  );
  assert_eq!(status, StatusCode::UNAUTHORIZED);

  let (status, body) = send!(app, test::TestRequest::post().uri("/auth/refresh").set_json(json!({})));
  assert_eq!(status, StatusCode::UNAUTHORIZED);
  assert_eq!(body["error"], "No refresh token found");
}

#[actix_web::test]
async fn protected_routes_require_a_valid_bearer_token() {
  let (state, _) = test_state();
  let app = spawn_app!(state);

  let (status, body) = send!(app, test::TestRequest::get().uri("/api/orders/myorders"));
  assert_eq!(status, StatusCode::UNAUTHORIZED);
  assert_eq!(body["error"], "Not authorized, no token");

  let (status, _) = send!(
    app,
    test::TestRequest::get()
      .uri("/api/orders/myorders")
      .insert_header(("Authorization", "Bearer v1.forged.token"))
  );
  assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn catalog_writes_are_admin_only() {
  let (state, _) = test_state();
  let app = spawn_app!(state);
  let customer = register!(app, "Meera", "meera@harvesthub.test");
  let admin = register!(app, "Owner", ADMIN_EMAIL);
  assert_eq!(admin["role"], "admin");

  let draft = json!({ "name": "Spinach", "price": 30.0, "category": "Leafy", "stock": 5, "images": ["", "https://img.test/spinach.jpg"] });
  let (status, _) = send!(
    app,
    test::TestRequest::post()
      .uri("/api/vegetables")
      .insert_header(bearer(&customer))
      .set_json(&draft)
  );
  assert_eq!(status, StatusCode::FORBIDDEN);

  let (status, created) = send!(
    app,
    test::TestRequest::post()
      .uri("/api/vegetables")
      .insert_header(bearer(&admin))
      .set_json(&draft)
  );
  assert_eq!(status, StatusCode::CREATED, "{}", created);
  assert_eq!(created["images"], json!(["https://img.test/spinach.jpg"]));
  assert_eq!(created["packSize"], 1.0);
  let id = created["id"].as_str().unwrap().to_string();

  let (status, patched) = send!(
    app,
    test::TestRequest::put()
      .uri(&format!("/api/vegetables/{}", id))
      .insert_header(bearer(&admin))
      .set_json(json!({ "price": 35.5 }))
  );
  assert_eq!(status, StatusCode::OK);
  assert_eq!(patched["price"], 35.5);
  assert_eq!(patched["stock"], 5.0);

  let (status, listed) = send!(app, test::TestRequest::get().uri("/api/vegetables?category=Leafy&keyword=spin"));
  assert_eq!(status, StatusCode::OK);
  assert_eq!(listed.as_array().map(Vec::len), Some(1));

  let (status, body) = send!(app, test::TestRequest::get().uri("/api/vegetables?category=Nuts"));
  assert_eq!(status, StatusCode::BAD_REQUEST);
  assert!(body["error"].as_str().unwrap_or_default().contains("Nuts"));

  let (status, _) = send!(app, test::TestRequest::get().uri("/api/vegetables/not-a-uuid"));
  assert_eq!(status, StatusCode::BAD_REQUEST);

  let (status, body) = send!(
    app,
    test::TestRequest::delete()
      .uri(&format!("/api/vegetables/{}", id))
      .insert_header(bearer(&admin))
  );
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["message"], "Vegetable removed");

  let (status, _) = send!(app, test::TestRequest::get().uri(&format!("/api/vegetables/{}", id)));
  assert_eq!(status, StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn cod_order_replays_by_key_and_cancels_with_restock() {
  let (state, store) = test_state();
  let product = state.catalog.create(tomato()).await.unwrap();
  let app = spawn_app!(state);
  let customer = register!(app, "Asha", "asha@harvesthub.test");

  let order_body = json!({
    "orderItems": [{ "product": product.id, "quantity": 3 }],
    "shippingAddress": shipping(),
    "paymentMethod": "COD",
  });
  let (status, placed) = send!(
    app,
    test::TestRequest::post()
      .uri("/api/orders")
      .insert_header(bearer(&customer))
      .insert_header(("Idempotency-Key", "checkout-1"))
      .set_json(&order_body)
  );
  assert_eq!(status, StatusCode::CREATED, "{}", placed);
  assert_eq!(placed["order"]["itemsPrice"], 120.0);
  assert_eq!(placed["order"]["shippingPrice"], 50.0);
  assert_eq!(placed["order"]["totalPrice"], 170.0);
  assert!(placed.get("razorpayOrder").is_none());
  assert_eq!(stock_of(&store, product.id).await, 7.0);

  let (status, replay) = send!(
    app,
    test::TestRequest::post()
      .uri("/api/orders")
      .insert_header(bearer(&customer))
      .insert_header(("Idempotency-Key", "checkout-1"))
      .set_json(&order_body)
  );
  assert_eq!(status, StatusCode::OK);
  assert_eq!(replay["order"]["id"], placed["order"]["id"]);
  assert_eq!(stock_of(&store, product.id).await, 7.0);

  let order_id = placed["order"]["id"].as_str().unwrap().to_string();
  let (status, cancelled) = send!(
    app,
    test::TestRequest::put()
      .uri(&format!("/api/orders/{}/cancel", order_id))
      .insert_header(bearer(&customer))
  );
  assert_eq!(status, StatusCode::OK);
  assert_eq!(cancelled["message"], "Order cancelled");
  assert_eq!(cancelled["order"]["status"], "Cancelled");
  assert_eq!(stock_of(&store, product.id).await, 10.0);

  let (status, _) = send!(
    app,
    test::TestRequest::put()
      .uri(&format!("/api/orders/{}/cancel", order_id))
      .insert_header(bearer(&customer))
  );
  assert_eq!(status, StatusCode::BAD_REQUEST);
  assert_eq!(stock_of(&store, product.id).await, 10.0);
}

#[actix_web::test]
async fn short_stock_is_reported_with_both_figures() {
  let (state, store) = test_state();
  let product = state.catalog.create(tomato()).await.unwrap();
  let app = spawn_app!(state);
  let customer = register!(app, "Asha", "asha@harvesthub.test");

  let (status, body) = send!(
    app,
    test::TestRequest::post()
      .uri("/api/orders")
      .insert_header(bearer(&customer))
      .set_json(json!({
        "orderItems": [{ "product": product.id, "quantity": 20 }],
        "shippingAddress": shipping(),
        "paymentMethod": "COD",
      }))
  );
  assert_eq!(status, StatusCode::BAD_REQUEST);
  assert_eq!(body["productId"], json!(product.id));
  assert_eq!(body["available"], 10.0);
  assert_eq!(body["required"], 20.0);
  assert_eq!(body["unit"], "kg");
  assert_eq!(stock_of(&store, product.id).await, 10.0);
}

#[actix_web::test]
async fn razorpay_payment_is_confirmed_only_with_a_matching_signature() {
  let (state, _) = test_state();
  let product = state.catalog.create(tomato()).await.unwrap();
  let app = spawn_app!(state);
  let customer = register!(app, "Asha", "asha@harvesthub.test");

  let (status, placed) = send!(
    app,
    test::TestRequest::post()
      .uri("/api/orders")
      .insert_header(bearer(&customer))
      .set_json(json!({
        "orderItems": [{ "product": product.id, "quantity": 2 }],
        "shippingAddress": shipping(),
        "paymentMethod": "Razorpay",
      }))
  );
  assert_eq!(status, StatusCode::CREATED, "{}", placed);
  let gateway_order_id = placed["razorpayOrder"]["id"].as_str().unwrap().to_string();
  assert_eq!(placed["razorpayOrder"]["amount"], 13_000);
  let order_id = placed["order"]["id"].clone();

  let verifier = SignatureVerifier::new(GATEWAY_SECRET.as_bytes()).unwrap();
  let signature = verifier.expected_signature(&gateway_order_id, "pay_123");

  let (status, body) = send!(
    app,
    test::TestRequest::post()
      .uri("/api/orders/verify-payment")
      .insert_header(bearer(&customer))
      .set_json(json!({
        "razorpay_order_id": gateway_order_id,
        "razorpay_payment_id": "pay_124",
        "razorpay_signature": signature,
        "order_id": order_id,
      }))
  );
  assert_eq!(status, StatusCode::BAD_REQUEST);
  assert_eq!(body["error"], "Invalid Signature");

  let (status, body) = send!(
    app,
    test::TestRequest::post()
      .uri("/api/orders/verify-payment")
      .insert_header(bearer(&customer))
      .set_json(json!({
        "razorpay_order_id": gateway_order_id,
        "razorpay_payment_id": "pay_123",
        "razorpay_signature": signature,
        "order_id": order_id,
      }))
  );
  assert_eq!(status, StatusCode::OK, "{}", body);
  assert_eq!(body["message"], "Payment success");
  assert_eq!(body["order"]["isPaid"], true);
  assert_eq!(body["order"]["paymentResult"]["status"], "success");
}

#[actix_web::test]
async fn admin_sees_all_orders_stats_and_delivers() {
  let (state, _) = test_state();
  let product = state.catalog.create(tomato()).await.unwrap();
  let app = spawn_app!(state);
  let customer = register!(app, "Asha", "asha@harvesthub.test");
  let stranger = register!(app, "Kiran", "kiran@harvesthub.test");
  let admin = register!(app, "Owner", ADMIN_EMAIL);

  let (_, placed) = send!(
    app,
    test::TestRequest::post()
      .uri("/api/orders")
      .insert_header(bearer(&customer))
      .set_json(json!({
        "orderItems": [{ "product": product.id, "quantity": 3 }],
        "shippingAddress": shipping(),
        "paymentMethod": "COD",
      }))
  );
  let order_id = placed["order"]["id"].as_str().unwrap().to_string();

  let (status, _) = send!(
    app,
    test::TestRequest::get()
      .uri(&format!("/api/orders/{}", order_id))
      .insert_header(bearer(&stranger))
  );
  assert_eq!(status, StatusCode::UNAUTHORIZED);

  let (status, _) = send!(app, test::TestRequest::get().uri("/api/orders").insert_header(bearer(&customer)));
  assert_eq!(status, StatusCode::FORBIDDEN);

  let (status, all) = send!(app, test::TestRequest::get().uri("/api/orders").insert_header(bearer(&admin)));
  assert_eq!(status, StatusCode::OK);
  assert_eq!(all.as_array().map(Vec::len), Some(1));

  let (status, stats) = send!(app, test::TestRequest::get().uri("/api/orders/stats").insert_header(bearer(&admin)));
  assert_eq!(status, StatusCode::OK);
  assert_eq!(stats["totalRevenue"], 170.0);
  assert_eq!(stats["totalOrders"], 1);
  assert_eq!(stats["totalProducts"], 1);
  assert_eq!(stats["totalUsers"], 2);

  let (status, delivered) = send!(
    app,
    test::TestRequest::put()
      .uri(&format!("/api/orders/{}/deliver", order_id))
      .insert_header(bearer(&admin))
  );
  assert_eq!(status, StatusCode::OK);
  assert_eq!(delivered["status"], "Delivered");
  assert_eq!(delivered["isDelivered"], true);

  let (status, mine) = send!(
    app,
    test::TestRequest::get()
      .uri("/api/orders/myorders")
      .insert_header(bearer(&customer))
  );
  assert_eq!(status, StatusCode::OK);
  assert_eq!(mine[0]["status"], "Delivered");
}

#[actix_web::test]
async fn google_sign_in_is_unavailable_without_credentials() {
  let (state, _) = test_state();
  let app = spawn_app!(state);

  let (status, _) = send!(app, test::TestRequest::get().uri("/auth/google"));
  assert_eq!(status, StatusCode::NOT_FOUND);

  let resp = test::call_service(
    &app,
    test::TestRequest::get()
      .uri("/auth/google/callback?code=abc&state=xyz")
      .to_request(),
  )
  .await;
  assert_eq!(resp.status(), StatusCode::FOUND);
  assert_eq!(
    resp.headers().get(LOCATION).and_then(|v| v.to_str().ok()),
    Some("http://localhost:5173/login?error=auth_failed")
  );
}

#[actix_web::test]
async fn malformed_json_gets_an_error_body() {
  let (state, _) = test_state();
  let app = spawn_app!(state);
  let (status, body) = send!(
    app,
    test::TestRequest::post()
      .uri("/auth/login")
      .insert_header(("Content-Type", "application/json"))
      .set_payload("{not json")
  );
  assert_eq!(status, StatusCode::BAD_REQUEST);
  assert!(body["error"].is_string());
}
