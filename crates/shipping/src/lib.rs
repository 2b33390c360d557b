//! Shipping rate calculation.
//!
//! A pure function from (address, subtotal, package weight) to a ranked list
//! of shipping options:
//! 1. Orders at or above the free-shipping threshold get a single free rate.
//! 2. Otherwise the destination state picks a zone (local, regional, national).
//! 3. Heavy packages add a flat surcharge per started weight bracket.
//!
//! No clock, randomness or I/O is involved, so the checkout UI and the order
//! orchestrator always agree on price.

pub mod calculator;
pub mod config;
pub mod error;
pub mod rate;
pub mod zone;

pub use calculator::ShippingRateCalculator;
pub use config::{ServiceLevel, ShippingConfig, ZoneRates};
pub use error::ShippingError;
pub use rate::ShippingRate;
pub use zone::Zone;
