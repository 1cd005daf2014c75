// harvesthub/server/src/services/mod.rs

pub mod auth_service;
pub mod google_oauth;
pub mod mailer;
pub mod payment_gateway;
