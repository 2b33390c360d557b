//! Shared building blocks for the storefront order engine.
//!
//! - Identifier newtypes (`PoNumber`, `IdentityId`, `CatalogItemId`)
//! - `Money` in integer cents and the `ShippingAddress` value type
//! - An injectable `Clock`
//! - An injectable key/value store with explicit TTL eviction

pub mod address;
pub mod clock;
pub mod money;
pub mod ttl_store;
pub mod types;

pub use address::ShippingAddress;
pub use clock::{Clock, ManualClock, SharedClock, SystemClock};
pub use money::Money;
pub use ttl_store::{InMemoryTtlStore, TtlStore};
pub use types::{CatalogItemId, IdentityId, PoNumber};
