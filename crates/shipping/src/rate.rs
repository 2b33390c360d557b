//! Shipping rate value type.

use common::Money;
use serde::{Deserialize, Serialize};

/// One shipping option offered for a cart.
///
/// Rates are produced by the calculator and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShippingRate {
    pub id: String,
    pub service: String,
    pub carrier: String,
    pub rate: Money,
    pub delivery_days: u32,
    #[serde(default)]
    pub guaranteed: bool,
}

impl ShippingRate {
    /// Returns true if `other` is the same option at the same price.
    ///
    /// Used to check a client-selected rate against a fresh calculation.
    pub fn matches(&self, other: &ShippingRate) -> bool {
        self.id == other.id && self.rate == other.rate
    }

    pub fn is_free(&self) -> bool {
        self.rate.is_zero()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rate(id: &str, cents: i64) -> ShippingRate {
        ShippingRate {
            id: id.into(),
            service: "Ground".into(),
            carrier: "USPS".into(),
            rate: Money::from_cents(cents),
            delivery_days: 3,
            guaranteed: false,
        }
    }

    #[test]
    fn test_matches_requires_same_id_and_price() {
        assert!(rate("local-ground", 599).matches(&rate("local-ground", 599)));
        assert!(!rate("local-ground", 599).matches(&rate("local-ground", 499)));
        assert!(!rate("local-ground", 599).matches(&rate("local-expedited", 599)));
    }

    #[test]
    fn test_guaranteed_defaults_to_false() {
        let json = r#"{"id":"free","service":"Free Shipping","carrier":"USPS","rate":0,"delivery_days":5}"#;
        let parsed: ShippingRate = serde_json::from_str(json).unwrap();
        assert!(!parsed.guaranteed);
        assert!(parsed.is_free());
    }
}
