//! In-memory collaborator fakes for tests and local runs.

pub mod distributor;
pub mod identity;
pub mod payment;

pub use distributor::{DistributorCall, InMemoryDistributor};
pub use identity::InMemoryIdentityProvider;
pub use payment::InMemoryPaymentProcessor;
