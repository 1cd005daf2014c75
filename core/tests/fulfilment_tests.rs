// tests/fulfilment_tests.rs
mod common;

use common::*;
use harvesthub_core::model::{OrderStatus, PaymentMethod, Role, StockUnit};
use harvesthub_core::{CatalogStore, CommerceError, OrderLedger};
use serial_test::serial;

#[tokio::test]
#[serial]
async fn cancel_restores_gram_stock_using_frozen_pack_size() {
  let h = Harness::new();
  let spinach = h.add_product("Spinach", 2.0, 250.0, StockUnit::G, 25.0).await;
  let buyer = h.add_account("Asha", Role::User).await;
  let order = h
    .desk
    .place_order(&buyer, order_request(&[(&spinach, 3)], PaymentMethod::Cod))
    .await
    .unwrap()
    .order;
  assert_eq!(h.stock(&spinach), 1.25);

  // The pack size changes after the order was placed.
  let mut edited = h.store.find_product(spinach.id).await.unwrap().unwrap();
  edited.pack_size = 500.0;
  h.store.replace_product(&edited, false).await.unwrap();

  h.desk.cancel_order(&buyer, order.id).await.unwrap();
  assert_eq!(h.stock(&spinach), 2.0);
}

#[tokio::test]
#[serial]
async fn second_cancel_is_rejected_and_restores_nothing() {
  let h = Harness::new();
  let carrot = h.add_product("Carrot", 10.0, 1.0, StockUnit::Kg, 40.0).await;
  let buyer = h.add_account("Ravi", Role::User).await;
  let order = h
    .desk
    .place_order(&buyer, order_request(&[(&carrot, 4)], PaymentMethod::Cod))
    .await
    .unwrap()
    .order;

  h.desk.cancel_order(&buyer, order.id).await.unwrap();
  let err = h.desk.cancel_order(&buyer, order.id).await.unwrap_err();

  assert!(matches!(err, CommerceError::InvalidState { status: OrderStatus::Cancelled, .. }));
  assert_eq!(h.stock(&carrot), 10.0);
}

#[tokio::test]
#[serial]
async fn delivered_order_cannot_be_cancelled() {
  let h = Harness::new();
  let carrot = h.add_product("Carrot", 10.0, 1.0, StockUnit::Kg, 40.0).await;
  let buyer = h.add_account("Meera", Role::User).await;
  let admin = h.add_account("Admin", Role::Admin).await;
  let order = h
    .desk
    .place_order(&buyer, order_request(&[(&carrot, 1)], PaymentMethod::Cod))
    .await
    .unwrap()
    .order;

  let delivered = h.desk.mark_delivered(&admin, order.id).await.unwrap();
  assert!(delivered.is_delivered);
  assert!(delivered.delivered_at.is_some());
  assert_eq!(delivered.status, OrderStatus::Delivered);

  let err = h.desk.cancel_order(&buyer, order.id).await.unwrap_err();
  assert_eq!(err.to_string(), "Cannot cancel order that is already shipped or delivered");
  assert_eq!(h.stock(&carrot), 9.0);
}

#[tokio::test]
#[serial]
async fn only_owner_or_admin_may_cancel() {
  let h = Harness::new();
  let carrot = h.add_product("Carrot", 10.0, 1.0, StockUnit::Kg, 40.0).await;
  let buyer = h.add_account("Kiran", Role::User).await;
  let stranger = h.add_account("Stranger", Role::User).await;
  let admin = h.add_account("Admin", Role::Admin).await;
  let order = h
    .desk
    .place_order(&buyer, order_request(&[(&carrot, 2)], PaymentMethod::Cod))
    .await
    .unwrap()
    .order;

  let err = h.desk.cancel_order(&stranger, order.id).await.unwrap_err();
  assert!(matches!(err, CommerceError::Unauthorized(ref m) if m == "Not authorized to cancel this order"));
  assert_eq!(h.stock(&carrot), 8.0);

  h.desk.cancel_order(&admin, order.id).await.unwrap();
  assert_eq!(h.stock(&carrot), 10.0);
}

#[tokio::test]
#[serial]
async fn cancelling_a_missing_order_is_not_found() {
  let h = Harness::new();
  let buyer = h.add_account("Dev", Role::User).await;
  let err = h.desk.cancel_order(&buyer, uuid::Uuid::new_v4()).await.unwrap_err();
  assert!(matches!(err, CommerceError::NotFound { entity: "Order", .. }));
}

#[tokio::test]
#[serial]
async fn cancel_survives_a_deleted_product() {
  let h = Harness::new();
  let carrot = h.add_product("Carrot", 10.0, 1.0, StockUnit::Kg, 40.0).await;
  let tomato = h.add_product("Tomato", 10.0, 1.0, StockUnit::Kg, 30.0).await;
  let buyer = h.add_account("Anu", Role::User).await;
  let order = h
    .desk
    .place_order(&buyer, order_request(&[(&carrot, 2), (&tomato, 3)], PaymentMethod::Cod))
    .await
    .unwrap()
    .order;

  h.store.delete_product(carrot.id).await.unwrap();
  let cancelled = h.desk.cancel_order(&buyer, order.id).await.unwrap();

  assert_eq!(cancelled.status, OrderStatus::Cancelled);
  assert_eq!(h.stock(&tomato), 10.0);
}

#[tokio::test]
#[serial]
async fn delivery_requires_admin_and_a_live_order() {
  let h = Harness::new();
  let carrot = h.add_product("Carrot", 10.0, 1.0, StockUnit::Kg, 40.0).await;
  let buyer = h.add_account("Lata", Role::User).await;
  let admin = h.add_account("Admin", Role::Admin).await;
  let order = h
    .desk
    .place_order(&buyer, order_request(&[(&carrot, 1)], PaymentMethod::Cod))
    .await
    .unwrap()
    .order;

  let err = h.desk.mark_delivered(&buyer, order.id).await.unwrap_err();
  assert!(matches!(err, CommerceError::Forbidden(_)));

  h.desk.cancel_order(&buyer, order.id).await.unwrap();
  let err = h.desk.mark_delivered(&admin, order.id).await.unwrap_err();
  assert!(matches!(err, CommerceError::InvalidState { status: OrderStatus::Cancelled, .. }));
}

#[tokio::test]
#[serial]
async fn order_views_respect_ownership() {
  let h = Harness::new();
  let carrot = h.add_product("Carrot", 10.0, 1.0, StockUnit::Kg, 40.0).await;
  let buyer = h.add_account("Nisha", Role::User).await;
  let other = h.add_account("Omar", Role::User).await;
  let admin = h.add_account("Admin", Role::Admin).await;

  let first = h
    .desk
    .place_order(&buyer, order_request(&[(&carrot, 1)], PaymentMethod::Cod))
    .await
    .unwrap()
    .order;
  let second = h
    .desk
    .place_order(&buyer, order_request(&[(&carrot, 1)], PaymentMethod::Cod))
    .await
    .unwrap()
    .order;

  let mine = h.desk.orders_for(&buyer).await.unwrap();
  assert_eq!(mine.len(), 2);
  assert!(mine[0].created_at >= mine[1].created_at);
  assert!(h.desk.orders_for(&other).await.unwrap().is_empty());

  assert_eq!(h.desk.order_for_viewer(&buyer, first.id).await.unwrap().id, first.id);
  assert_eq!(h.desk.order_for_viewer(&admin, second.id).await.unwrap().id, second.id);
  assert!(matches!(
    h.desk.order_for_viewer(&other, first.id).await.unwrap_err(),
    CommerceError::Unauthorized(_)
  ));

  assert!(matches!(h.desk.all_orders(&buyer).await.unwrap_err(), CommerceError::Forbidden(_)));
  assert_eq!(h.desk.all_orders(&admin).await.unwrap().len(), 2);
}

#[tokio::test]
#[serial]
async fn stats_exclude_cancelled_revenue_and_admins() {
  let h = Harness::new();
  let carrot = h.add_product("Carrot", 50.0, 1.0, StockUnit::Kg, 100.0).await;
  h.add_product("Tomato", 10.0, 1.0, StockUnit::Kg, 30.0).await;
  let buyer = h.add_account("Sana", Role::User).await;
  h.add_account("Zoya", Role::User).await;
  let admin = h.add_account("Admin", Role::Admin).await;

  // 600 ships free; 200 pays 50 shipping.
  h.desk
    .place_order(&buyer, order_request(&[(&carrot, 6)], PaymentMethod::Cod))
    .await
    .unwrap();
  h.desk
    .place_order(&buyer, order_request(&[(&carrot, 2)], PaymentMethod::Cod))
    .await
    .unwrap();
  let cancelled = h
    .desk
    .place_order(&buyer, order_request(&[(&carrot, 1)], PaymentMethod::Cod))
    .await
    .unwrap()
    .order;
  h.desk.cancel_order(&buyer, cancelled.id).await.unwrap();

  let stats = h.desk.stats(&admin).await.unwrap();
  assert_eq!(stats.total_revenue.minor(), 60_000 + 25_000);
  assert_eq!(stats.total_orders, 3);
  assert_eq!(stats.total_products, 2);
  assert_eq!(stats.total_users, 2);
  assert_eq!(h.store.revenue_summary().await.unwrap().1, 3);

  assert!(matches!(h.desk.stats(&buyer).await.unwrap_err(), CommerceError::Forbidden(_)));
}
