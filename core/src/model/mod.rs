// harvesthub/core/src/model/mod.rs

mod account;
mod money;
mod order;
mod product;
mod request;
mod unit;

pub use account::{Account, ExternalProfile, Role, SavedAddress, DEFAULT_PROFILE_PIC};
pub use money::Money;
pub use order::{
  Order, OrderLine, OrderStats, OrderStatus, PaymentMethod, PaymentResult, Pricing, PricingPolicy, ShippingAddress,
  PAYMENT_STATUS_PENDING_COD, PAYMENT_STATUS_SUCCESS,
};
pub use product::{Category, Product, ProductDraft, ProductPatch, MAX_IMAGES, MAX_PRICE};
pub use request::{ClientOrderItem, ClientOrderRequest, ValidatedOrderLine};
pub use unit::{settle, StockUnit};
