// harvesthub/core/src/lib.rs

//! HarvestHub: order, inventory and account logic for a vegetable storefront.
//!
//! The crate is transport-agnostic. Persistence, payment gateways, password
//! hashing and notification delivery sit behind traits. The HTTP service
//! plugs in Postgres and Razorpay; tests use the in-memory store.
//!
//!  - [`catalog`]: product listing with filters and sorting, admin edits.
//!  - [`ordering`]: all-or-nothing placement, payment confirmation,
//!    cancellation with stock restoration, delivery and dashboard stats.
//!  - [`auth`]: local and external sign-in with access/refresh tokens.
//!  - [`flow`]: the ordered step runner with compensation used by placement.

pub mod auth;
pub mod catalog;
pub mod error;
pub mod flow;
pub mod model;
pub mod notify;
pub mod ordering;
pub mod payment;
pub mod store;
pub mod tokens;

#[cfg(doctest)]
#[doc = include_str!("../README.md")]
pub struct ReadmeDoctests;

pub use crate::auth::{Authenticator, CredentialHasher, LoginRequest, RegisterRequest, Session};
pub use crate::catalog::{CatalogService, ProductQuery, SortOrder};
pub use crate::error::{CommerceError, CommerceResult, GatewayError, StoreError};
pub use crate::notify::{OrderNotifier, Recipient};
pub use crate::ordering::{OrderDesk, PlacedOrder, Stores};
pub use crate::payment::{IntentRequest, PaymentCallback, PaymentGateway, PaymentIntent, SignatureVerifier};
pub use crate::store::{AccountStore, CatalogStore, InMemoryStore, OrderLedger, StockTake, StoreResult};
pub use crate::tokens::{TokenIssuer, TokenKind, TokenPair};
