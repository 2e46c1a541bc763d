//! Deterministic synthetic market data for demos and benchmarks.
//!
//! Each instrument gets its own random walk seeded from the BLAKE3 hash of
//! its code, so the same code always produces the same history.

use chrono::{Datelike, NaiveDate, Weekday};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use forecastlab_core::data_source::InMemoryData;
use forecastlab_core::series::TimeSeries;

const START_PRICE: f64 = 100.0;

fn rng_for(code: &str, salt: &str) -> StdRng {
    let mut hasher = blake3::Hasher::new();
    hasher.update(code.as_bytes());
    hasher.update(salt.as_bytes());
    StdRng::from_seed(*hasher.finalize().as_bytes())
}

fn weekdays(start: NaiveDate, end: NaiveDate) -> impl Iterator<Item = NaiveDate> {
    start
        .iter_days()
        .take_while(move |d| *d <= end)
        .filter(|d| !matches!(d.weekday(), Weekday::Sat | Weekday::Sun))
}

/// Weekday closes: a multiplicative walk with a small per-instrument drift.
pub fn synthetic_prices(code: &str, start: NaiveDate, end: NaiveDate) -> TimeSeries {
    let mut rng = rng_for(code, "price");
    let drift: f64 = rng.gen_range(-0.0004..0.0004);
    let mut price = START_PRICE;
    let series = weekdays(start, end).map(|day| {
        let daily_return: f64 = drift + rng.gen_range(-0.02..0.02);
        price *= 1.0 + daily_return;
        (day, price)
    });
    // Dates come out strictly ascending.
    TimeSeries::from_pairs(series).unwrap_or_default()
}

/// Annualised carry: a slow mean-reverting level around a per-instrument mean.
pub fn synthetic_carry(code: &str, start: NaiveDate, end: NaiveDate) -> TimeSeries {
    let mut rng = rng_for(code, "carry");
    let mean: f64 = rng.gen_range(-0.03..0.03);
    let mut level = mean;
    let series = weekdays(start, end).map(|day| {
        level += 0.02 * (mean - level) + rng.gen_range(-0.001..0.001);
        (day, level)
    });
    TimeSeries::from_pairs(series).unwrap_or_default()
}

/// Prices and carry for every code over the same date range.
pub fn synthetic_data(codes: &[String], start: NaiveDate, end: NaiveDate) -> InMemoryData {
    codes.iter().fold(InMemoryData::new(), |data, code| {
        data.with_prices(code.as_str(), synthetic_prices(code, start, end))
            .with_carry(code.as_str(), synthetic_carry(code, start, end))
    })
}
