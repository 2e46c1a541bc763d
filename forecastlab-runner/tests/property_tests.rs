//! Property tests for runner helpers.

use chrono::{Datelike, NaiveDate, Weekday};
use proptest::prelude::*;

use forecastlab_core::{ConfigBuilder, TradingRule};
use forecastlab_runner::{config_fingerprint, synthetic_prices};

fn arb_code() -> impl Strategy<Value = String> {
    "[A-Z]{2,6}"
}

fn arb_range() -> impl Strategy<Value = (NaiveDate, NaiveDate)> {
    (0i64..3000, 0i64..400).prop_map(|(offset, len)| {
        let start = NaiveDate::from_ymd_opt(2000, 1, 1).unwrap() + chrono::Duration::days(offset);
        (start, start + chrono::Duration::days(len))
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Synthetic prices are positive, weekday-only and inside the range.
    #[test]
    fn synthetic_prices_are_well_formed(code in arb_code(), (start, end) in arb_range()) {
        let prices = synthetic_prices(&code, start, end);
        for (date, value) in prices.iter() {
            prop_assert!(date >= start && date <= end);
            prop_assert!(!matches!(date.weekday(), Weekday::Sat | Weekday::Sun));
            prop_assert!(value > 0.0 && value.is_finite());
        }
    }

    /// Any change to the vol target changes the fingerprint.
    #[test]
    fn fingerprint_distinguishes_vol_targets(a in 1.0..50.0_f64, b in 1.0..50.0_f64) {
        prop_assume!(a != b);
        let config = |target: f64| {
            ConfigBuilder::new()
                .instrument("SOFR")
                .rule("ewmac8", TradingRule::ewmac(8, None))
                .percentage_vol_target(target)
                .build()
                .unwrap()
        };
        prop_assert_ne!(config_fingerprint(&config(a)), config_fingerprint(&config(b)));
    }
}
