//! Shipping rate calculator.

use common::{Money, ShippingAddress};

use crate::config::{ServiceLevel, ShippingConfig};
use crate::error::ShippingError;
use crate::rate::ShippingRate;
use crate::zone::Zone;

/// Rate id of the free-shipping option.
pub const FREE_RATE_ID: &str = "free";

const FREE_DELIVERY_DAYS: u32 = 5;

/// Computes shipping options.
///
/// Identical inputs always produce identical output.
#[derive(Debug, Clone, Default)]
pub struct ShippingRateCalculator {
    config: ShippingConfig,
}

impl ShippingRateCalculator {
    pub fn new(config: ShippingConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ShippingConfig {
        &self.config
    }

    /// Returns shipping options sorted ascending by price.
    ///
    /// A subtotal at or above the free-shipping threshold short-circuits to a
    /// single free rate. Otherwise the address must carry a state and a zip.
    pub fn calculate(
        &self,
        address: &ShippingAddress,
        subtotal: Money,
        weight_lbs: f64,
    ) -> Result<Vec<ShippingRate>, ShippingError> {
        if subtotal >= self.config.free_shipping_threshold {
            return Ok(vec![self.free_rate()]);
        }

        let mut missing = Vec::new();
        if address.state.trim().is_empty() {
            missing.push("state");
        }
        if address.zip.trim().is_empty() {
            missing.push("zip");
        }
        if !missing.is_empty() {
            return Err(ShippingError::InvalidAddress { missing });
        }

        if !weight_lbs.is_finite() || weight_lbs < 0.0 {
            return Err(ShippingError::InvalidWeight(weight_lbs));
        }

        let zone = Zone::for_state(&address.state);
        let zone_rates = self.config.rates_for(zone);
        let surcharge = self.weight_surcharge(weight_lbs);

        let mut rates = vec![
            self.build_rate(zone, zone_rates.ground, surcharge, false),
            self.build_rate(zone, zone_rates.expedited, surcharge, true),
        ];
        rates.sort_by(|a, b| a.rate.cmp(&b.rate).then_with(|| a.id.cmp(&b.id)));

        Ok(rates)
    }

    /// Flat surcharge for every started bracket above the base weight.
    pub fn weight_surcharge(&self, weight_lbs: f64) -> Money {
        if weight_lbs <= self.config.base_weight_lbs || self.config.weight_bracket_lbs <= 0.0 {
            return Money::zero();
        }
        let over = weight_lbs - self.config.base_weight_lbs;
        let brackets = (over / self.config.weight_bracket_lbs).ceil() as u32;
        self.config.surcharge_per_bracket.multiply(brackets)
    }

    fn free_rate(&self) -> ShippingRate {
        ShippingRate {
            id: FREE_RATE_ID.to_string(),
            service: "Free Shipping".to_string(),
            carrier: self.config.ground_carrier.clone(),
            rate: Money::zero(),
            delivery_days: FREE_DELIVERY_DAYS,
            guaranteed: false,
        }
    }

    fn build_rate(
        &self,
        zone: Zone,
        base: ServiceLevel,
        surcharge: Money,
        expedited: bool,
    ) -> ShippingRate {
        let (level, service, carrier) = if expedited {
            ("expedited", "Expedited", &self.config.expedited_carrier)
        } else {
            ("ground", "Ground", &self.config.ground_carrier)
        };
        ShippingRate {
            id: format!("{zone}-{level}"),
            service: service.to_string(),
            carrier: carrier.clone(),
            rate: base.rate + surcharge,
            delivery_days: base.delivery_days,
            guaranteed: expedited,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn address(state: &str, zip: &str) -> ShippingAddress {
        ShippingAddress {
            name: "Grace Hopper".into(),
            street1: "1 Navy Way".into(),
            city: "Anywhere".into(),
            state: state.into(),
            zip: zip.into(),
            ..Default::default()
        }
    }

    #[test]
    fn test_local_zone_without_surcharge() {
        let calc = ShippingRateCalculator::default();
        let rates = calc
            .calculate(&address("CA", "93701"), Money::from_dollars(20), 3.0)
            .unwrap();

        assert_eq!(rates.len(), 2);
        assert_eq!(rates[0].id, "local-ground");
        assert_eq!(rates[0].rate, calc.config().local.ground.rate);
        assert_eq!(rates[1].id, "local-expedited");
        assert!(rates[0].rate < rates[1].rate);
        assert!(rates[1].guaranteed);
    }

    #[test]
    fn test_free_shipping_at_threshold() {
        let calc = ShippingRateCalculator::default();
        let rates = calc
            .calculate(&address("NY", "10001"), Money::from_dollars(99), 40.0)
            .unwrap();
        assert_eq!(rates.len(), 1);
        assert!(rates[0].is_free());
        assert_eq!(rates[0].id, FREE_RATE_ID);
    }

    #[test]
    fn test_free_shipping_ignores_incomplete_address() {
        let calc = ShippingRateCalculator::default();
        let rates = calc
            .calculate(&address("", ""), Money::from_dollars(150), 1.0)
            .unwrap();
        assert_eq!(rates.len(), 1);
        assert!(rates[0].is_free());
    }

    #[test]
    fn test_missing_state_and_zip() {
        let calc = ShippingRateCalculator::default();
        let err = calc
            .calculate(&address(" ", ""), Money::from_dollars(10), 1.0)
            .unwrap_err();
        assert_eq!(
            err,
            ShippingError::InvalidAddress {
                missing: vec!["state", "zip"]
            }
        );
    }

    #[test]
    fn test_weight_surcharge_brackets() {
        let calc = ShippingRateCalculator::default();
        assert_eq!(calc.weight_surcharge(0.0), Money::zero());
        assert_eq!(calc.weight_surcharge(5.0), Money::zero());
        assert_eq!(calc.weight_surcharge(5.1), Money::from_cents(250));
        assert_eq!(calc.weight_surcharge(10.0), Money::from_cents(250));
        assert_eq!(calc.weight_surcharge(10.5), Money::from_cents(500));
    }

    #[test]
    fn test_surcharge_applied_to_every_rate() {
        let calc = ShippingRateCalculator::default();
        let rates = calc
            .calculate(&address("TX", "73301"), Money::from_dollars(30), 12.0)
            .unwrap();
        let national = calc.config().national;
        assert_eq!(rates[0].rate, national.ground.rate + Money::from_cents(500));
        assert_eq!(rates[1].rate, national.expedited.rate + Money::from_cents(500));
    }

    #[test]
    fn test_negative_weight_rejected() {
        let calc = ShippingRateCalculator::default();
        let err = calc
            .calculate(&address("CA", "93701"), Money::from_dollars(10), -1.0)
            .unwrap_err();
        assert!(matches!(err, ShippingError::InvalidWeight(_)));
    }

    #[test]
    fn test_deterministic() {
        let calc = ShippingRateCalculator::default();
        let a = calc.calculate(&address("WA", "98101"), Money::from_cents(4_250), 7.5);
        let b = calc.calculate(&address("WA", "98101"), Money::from_cents(4_250), 7.5);
        assert_eq!(a, b);
    }
}
