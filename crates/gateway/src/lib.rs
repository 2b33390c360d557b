//! Typed contracts for the external systems the order engine depends on.
//!
//! - [`DistributorApi`]: the third-party order-management system that owns
//!   real cart and order state, keyed by poNumber
//! - [`PaymentProcessor`]: payment intents and signed webhook delivery
//! - [`IdentityProvider`]: user profile metadata (persisted carts and order
//!   numbers)
//!
//! Each contract has an in-memory fake in [`fakes`] with failure switches and
//! call recording. [`HttpDistributorClient`] talks to a real distributor over
//! JSON/HTTP.

pub mod distributor;
pub mod error;
pub mod fakes;
pub mod http;
pub mod identity;
pub mod payment;
pub mod signature;

pub use distributor::{
    CartCreated, DistributorApi, DistributorCart, DistributorLineItem, ExternalOrderRecord,
    OrderCreated,
};
pub use error::{GatewayError, Result, Service, SignatureError};
pub use fakes::{
    DistributorCall, InMemoryDistributor, InMemoryIdentityProvider, InMemoryPaymentProcessor,
};
pub use http::HttpDistributorClient;
pub use identity::{IdentityProvider, UserRecord, METADATA_CART, METADATA_ORDER_NUMBERS};
pub use payment::{
    PaymentIntent, PaymentIntentStatus, PaymentProcessor, WebhookEvent, WebhookEventKind,
    WebhookPaymentIntent,
};
pub use signature::{SIGNATURE_HEADER, WebhookSigner};
