//! Behavioral properties of the shipping calculator across many inputs.

use common::{Money, ShippingAddress};
use shipping::{ShippingRateCalculator, Zone};

const STATES: &[&str] = &["CA", "OR", "WA", "NV", "AZ", "NY", "TX", "FL", "IL", "ME"];
const WEIGHTS: &[f64] = &[0.0, 0.5, 3.0, 5.0, 5.01, 9.99, 10.0, 17.3, 42.0, 120.0];
const SUBTOTALS: &[i64] = &[0, 1, 999, 2_000, 5_000, 9_899, 9_900, 15_000, 250_000];

fn address(state: &str) -> ShippingAddress {
    ShippingAddress {
        name: "Customer".into(),
        street1: "100 Market St".into(),
        city: "Somewhere".into(),
        state: state.into(),
        zip: "90001".into(),
        ..Default::default()
    }
}

#[test]
fn test_above_threshold_always_single_free_rate() {
    let calc = ShippingRateCalculator::default();
    let threshold = calc.config().free_shipping_threshold;

    for state in STATES {
        for weight in WEIGHTS {
            for cents in SUBTOTALS.iter().filter(|c| Money::from_cents(**c) >= threshold) {
                let rates = calc
                    .calculate(&address(state), Money::from_cents(*cents), *weight)
                    .unwrap();
                assert_eq!(rates.len(), 1, "state={state} weight={weight}");
                assert!(rates[0].rate.is_zero());
            }
        }
    }
}

#[test]
fn test_below_threshold_sorted_and_at_least_zone_ground() {
    let calc = ShippingRateCalculator::default();
    let threshold = calc.config().free_shipping_threshold;

    for state in STATES {
        let base_ground = calc.config().rates_for(Zone::for_state(state)).ground.rate;
        for weight in WEIGHTS {
            for cents in SUBTOTALS.iter().filter(|c| Money::from_cents(**c) < threshold) {
                let rates = calc
                    .calculate(&address(state), Money::from_cents(*cents), *weight)
                    .unwrap();
                assert!(!rates.is_empty());
                assert!(rates.windows(2).all(|w| w[0].rate <= w[1].rate));
                assert!(rates.iter().all(|r| r.rate >= base_ground));
            }
        }
    }
}

#[test]
fn test_scenario_local_cart_under_threshold() {
    // Items: A x1 @ $10, B x2 @ $5 => subtotal $20, 3 lb package.
    let calc = ShippingRateCalculator::default();
    let subtotal = Money::from_cents(1_000) + Money::from_cents(500).multiply(2);
    assert_eq!(subtotal, Money::from_dollars(20));

    let rates = calc.calculate(&address("CA"), subtotal, 3.0).unwrap();

    assert_eq!(rates.len(), 2);
    assert_eq!(rates[0].rate, calc.config().local.ground.rate);
    assert_eq!(rates[0].service, "Ground");
    assert_eq!(rates[1].service, "Expedited");
    assert!(rates[0].rate < rates[1].rate);
}

#[test]
fn test_scenario_subtotal_above_threshold() {
    let calc = ShippingRateCalculator::default();
    let rates = calc
        .calculate(&address("TX"), Money::from_dollars(150), 8.0)
        .unwrap();
    assert_eq!(rates.len(), 1);
    assert_eq!(rates[0].rate, Money::zero());
}
