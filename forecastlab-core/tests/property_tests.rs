//! Property tests for pipeline invariants.
//!
//! Uses proptest to verify:
//! 1. EWMAC crossover is non-negative on strictly rising prices
//! 2. Combination weights sum to one wherever any rule has data
//! 3. Malformed carry degrades to an all-zero forecast on the input dates
//! 4. Positions scale linearly with capital
//! 5. Scaled and combined forecasts never exceed the cap

mod common;

use proptest::prelude::*;

use forecastlab_core::rules::ewmac::{raw_crossover, EwmacParams};
use forecastlab_core::rules::{CarryParams, RuleInputs, RuleOutcome};
use forecastlab_core::{ConfigBuilder, TradingRule};

use common::{data, series, system, two_ewmac_config};

// ── Strategies (proptest) ────────────────────────────────────────────

fn arb_rising_prices() -> impl Strategy<Value = Vec<f64>> {
    prop::collection::vec(0.01..5.0_f64, 40..200).prop_map(|steps| {
        let mut p = 100.0;
        steps
            .into_iter()
            .map(|s| {
                p += s;
                p
            })
            .collect()
    })
}

fn arb_weight() -> impl Strategy<Value = f64> {
    (0.0..1.0_f64).prop_map(|w| (w * 100.0).round() / 100.0)
}

// ── 1. EWMAC sign ────────────────────────────────────────────────────

proptest! {
    /// Fast EWMA never trails slow EWMA while prices only go up.
    #[test]
    fn ewmac_crossover_non_negative_on_rising_prices(prices in arb_rising_prices()) {
        let raw = raw_crossover(&series(&prices), &EwmacParams::new(8, Some(32)));
        for v in raw.values() {
            prop_assert!(*v >= -1e-9, "crossover {} < 0", v);
        }
    }
}

// ── 2. Weight normalization ──────────────────────────────────────────

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn weights_sum_to_one(w8 in arb_weight(), w32 in arb_weight()) {
        prop_assume!(w8 + w32 > 0.0);
        let config = two_ewmac_config(&["SOFR"])
            .forecast_weight("ewmac8", w8)
            .forecast_weight("ewmac32", w32)
            .build()
            .unwrap();
        let sys = system(config, data(&["SOFR"], 150));
        let weights = sys.forecast_weights("SOFR").unwrap();
        for t in 0..150 {
            let total: f64 = weights.values().map(|w| w.values()[t]).sum();
            prop_assert!((total - 1.0).abs() < 1e-12);
        }
    }
}

// ── 3. Carry degradation ─────────────────────────────────────────────

proptest! {
    /// Too few observations, or any infinity, yields a flat forecast.
    #[test]
    fn malformed_carry_is_flat(
        values in prop::collection::vec(-0.05..0.05_f64, 1..30),
        poison in any::<bool>(),
    ) {
        let mut values = values;
        if poison {
            let mid = values.len() / 2;
            values[mid] = f64::INFINITY;
        }
        prop_assume!(poison || values.len() < 10);

        let raw = series(&values);
        let rule = TradingRule::carry(CarryParams::default());
        let inputs = RuleInputs { instrument: "X", price: None, raw_carry: Some(&raw) };
        match rule.evaluate("carry", &inputs).unwrap() {
            RuleOutcome::Degenerate { forecast, .. } => {
                prop_assert_eq!(forecast.index(), raw.index());
                prop_assert!(forecast.values().iter().all(|v| *v == 0.0));
            }
            RuleOutcome::Forecast(_) => prop_assert!(false, "expected a degenerate outcome"),
        }
    }
}

// ── 4. Capital linearity ─────────────────────────────────────────────

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    #[test]
    fn doubling_capital_doubles_position(capital in 10_000.0..10_000_000.0_f64) {
        let position = |capital: f64| {
            let config = two_ewmac_config(&["SOFR"])
                .notional_trading_capital(capital)
                .build()
                .unwrap();
            system(config, data(&["SOFR"], 200)).subsystem_position("SOFR").unwrap()
        };
        let one = position(capital);
        let two = position(capital * 2.0);
        for (a, b) in one.values().iter().zip(two.values()) {
            if a.is_finite() {
                prop_assert!((b - 2.0 * a).abs() <= 1e-9 * a.abs().max(1.0));
            } else {
                prop_assert!(b.is_nan());
            }
        }
    }
}

// ── 5. Forecast cap ──────────────────────────────────────────────────

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    #[test]
    fn forecasts_stay_within_cap(scalar in 0.5..200.0_f64, cap in 5.0..40.0_f64, fdm in 1.0..3.0_f64) {
        let config = ConfigBuilder::new()
            .instrument("SOFR")
            .rule("ewmac8", TradingRule::ewmac(8, None))
            .rule("ewmac16", TradingRule::ewmac(16, None))
            .forecast_scalar("ewmac8", scalar)
            .forecast_scalar("ewmac16", scalar)
            .forecast_cap(cap)
            .forecast_div_multiplier(fdm)
            .build()
            .unwrap();
        let sys = system(config, data(&["SOFR"], 120));
        for rule in ["ewmac8", "ewmac16"] {
            let scaled = sys.scaled_forecast("SOFR", rule).unwrap();
            prop_assert!(scaled.values().iter().all(|v| v.abs() <= cap));
        }
        let combined = sys.combined_forecast("SOFR").unwrap();
        prop_assert!(combined.values().iter().all(|v| v.abs() <= cap));
    }
}
