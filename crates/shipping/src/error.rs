//! Shipping calculation errors.

use thiserror::Error;

/// Errors returned instead of rates.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ShippingError {
    /// The address lacks the fields needed to pick a zone.
    #[error("Invalid address: missing {}", missing.join(", "))]
    InvalidAddress { missing: Vec<&'static str> },

    /// Package weight is negative or not a number.
    #[error("Invalid package weight: {0}")]
    InvalidWeight(f64),
}
