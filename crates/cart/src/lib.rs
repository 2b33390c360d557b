//! Shopping cart state for one browsing session.
//!
//! [`CartStateManager`] owns the cart and is the only way to change it, so
//! the quantity invariants (every line has quantity ≥ 1, lines that drop to
//! zero are removed) always hold. When the cart is bound to an identity,
//! every item change is handed to a [`CartPersister`], which writes to a
//! [`CartStore`] in the background.
//!
//! Signing in merges the anonymous cart into the identity's stored cart once;
//! signing out leaves an empty anonymous cart behind.

pub mod cart;
pub mod error;
pub mod item;
pub mod manager;
pub mod persister;
pub mod store;

pub use cart::{Cart, CartTotals};
pub use error::{CartError, Result};
pub use item::CartItem;
pub use manager::{BindOutcome, CartConfig, CartSnapshot, CartStateManager};
pub use persister::CartPersister;
pub use store::{CartStore, IdentityCartStore, InMemoryCartStore};
