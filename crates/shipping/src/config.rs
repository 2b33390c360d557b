//! Shipping rate tables and thresholds.

use common::Money;

use crate::zone::Zone;

/// Price and transit time of one service level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServiceLevel {
    pub rate: Money,
    pub delivery_days: u32,
}

impl ServiceLevel {
    pub const fn new(cents: i64, delivery_days: u32) -> Self {
        Self {
            rate: Money::from_cents(cents),
            delivery_days,
        }
    }
}

/// Ground and expedited service for one zone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ZoneRates {
    pub ground: ServiceLevel,
    pub expedited: ServiceLevel,
}

/// Calculator configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct ShippingConfig {
    /// Subtotals at or above this ship free.
    pub free_shipping_threshold: Money,
    /// Packages at or below this weight (lb) carry no surcharge.
    pub base_weight_lbs: f64,
    /// Size of each surcharge bracket above the base weight (lb).
    pub weight_bracket_lbs: f64,
    /// Surcharge per started bracket.
    pub surcharge_per_bracket: Money,
    pub ground_carrier: String,
    pub expedited_carrier: String,
    pub local: ZoneRates,
    pub regional: ZoneRates,
    pub national: ZoneRates,
}

impl ShippingConfig {
    /// Rates for a zone.
    pub fn rates_for(&self, zone: Zone) -> &ZoneRates {
        match zone {
            Zone::Local => &self.local,
            Zone::Regional => &self.regional,
            Zone::National => &self.national,
        }
    }

    /// Returns a copy with a different free-shipping threshold.
    pub fn with_free_shipping_threshold(mut self, threshold: Money) -> Self {
        self.free_shipping_threshold = threshold;
        self
    }
}

impl Default for ShippingConfig {
    fn default() -> Self {
        Self {
            free_shipping_threshold: Money::from_cents(9_900),
            base_weight_lbs: 5.0,
            weight_bracket_lbs: 5.0,
            surcharge_per_bracket: Money::from_cents(250),
            ground_carrier: "USPS".to_string(),
            expedited_carrier: "UPS".to_string(),
            local: ZoneRates {
                ground: ServiceLevel::new(599, 2),
                expedited: ServiceLevel::new(1_299, 1),
            },
            regional: ZoneRates {
                ground: ServiceLevel::new(899, 4),
                expedited: ServiceLevel::new(1_899, 2),
            },
            national: ZoneRates {
                ground: ServiceLevel::new(1_199, 6),
                expedited: ServiceLevel::new(2_499, 3),
            },
        }
    }
}
