//! Shared helpers for unit tests.

use chrono::NaiveDate;

use crate::series::{calendar, TimeSeries};

/// Assert two f64 values are approximately equal (within epsilon).
pub fn assert_approx(actual: f64, expected: f64, epsilon: f64) {
    assert!(
        (actual - expected).abs() < epsilon,
        "assert_approx failed: actual={actual}, expected={expected}, diff={}, epsilon={epsilon}",
        (actual - expected).abs()
    );
}

/// A series over consecutive business days starting 2024-01-01.
pub fn bday_series(values: &[f64]) -> TimeSeries {
    let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
    let index = calendar::business_days_from(start)
        .take(values.len())
        .collect();
    TimeSeries::new(index, values.to_vec()).unwrap()
}

/// A trending price path with deterministic wiggles, one value per business day.
pub fn wavy_prices(n: usize) -> TimeSeries {
    let values: Vec<f64> = (0..n)
        .map(|i| {
            let t = i as f64;
            100.0 + 0.05 * t + 2.0 * (t / 9.0).sin() + 0.5 * (t / 2.3).cos()
        })
        .collect();
    bday_series(&values)
}
