//! HTTP handlers, one module per resource.

pub mod cart;
pub mod checkout;
pub mod health;
pub mod metrics;
pub mod orders;
pub mod shipping;
pub mod webhooks;
