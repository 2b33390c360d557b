//! Cart error types.

use common::{CatalogItemId, IdentityId};
use gateway::GatewayError;
use thiserror::Error;

/// Errors that can occur during cart operations.
#[derive(Debug, Clone, Error)]
pub enum CartError {
    /// Items are added with a quantity of at least one.
    #[error("Quantity must be at least 1")]
    ZeroQuantity,

    /// The cart has no line for this catalog item.
    #[error("Item not in cart: {0}")]
    ItemNotFound(CatalogItemId),

    /// The cart is owned by another identity; it must be unbound first.
    #[error("Cart is bound to {current}, cannot bind to {requested}")]
    AlreadyBound {
        current: IdentityId,
        requested: IdentityId,
    },

    /// The stored cart could not be read or written.
    #[error("Cart store error: {0}")]
    Store(#[from] GatewayError),

    /// The stored cart exists but is not a valid item list.
    #[error("Stored cart is corrupt: {0}")]
    Corrupt(String),
}

/// Convenience type alias for cart results.
pub type Result<T> = std::result::Result<T, CartError>;
