//! Shared fixtures for integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use chrono::NaiveDate;
use forecastlab_core::series::calendar::business_days_from;
use forecastlab_core::{Config, ConfigBuilder, InMemoryData, System, TimeSeries, TradingRule};

pub fn start_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2020, 1, 1).unwrap()
}

/// Business-day series starting 2020-01-01.
pub fn series(values: &[f64]) -> TimeSeries {
    let index = business_days_from(start_date()).take(values.len()).collect();
    TimeSeries::new(index, values.to_vec()).unwrap()
}

/// Deterministic mean-reverting-with-drift price path.
pub fn prices(n: usize, phase: f64) -> TimeSeries {
    let values: Vec<f64> = (0..n)
        .map(|i| {
            let t = i as f64 + phase;
            95.0 + 0.02 * t + 3.0 * (t / 25.0).sin() + 0.7 * (t / 3.1).cos()
        })
        .collect();
    series(&values)
}

pub fn carry(n: usize) -> TimeSeries {
    let values: Vec<f64> = (0..n)
        .map(|i| 0.01 + 0.003 * (i as f64 / 40.0).sin())
        .collect();
    series(&values)
}

pub fn two_ewmac_config(instruments: &[&str]) -> ConfigBuilder {
    ConfigBuilder::new()
        .instruments(instruments.iter().copied())
        .rule("ewmac8", TradingRule::ewmac(8, Some(32)))
        .rule("ewmac32", TradingRule::ewmac(32, Some(128)))
        .forecast_weight("ewmac8", 0.5)
        .forecast_weight("ewmac32", 0.5)
        .forecast_scalar("ewmac8", 5.3)
        .forecast_scalar("ewmac32", 2.65)
}

pub fn data(instruments: &[&str], n: usize) -> InMemoryData {
    instruments
        .iter()
        .enumerate()
        .fold(InMemoryData::new(), |data, (i, code)| {
            data.with_prices(*code, prices(n, i as f64 * 17.0))
                .with_carry(*code, carry(n))
        })
}

pub fn system(config: Config, data: InMemoryData) -> System {
    System::new(forecastlab_core::standard_stages(), Arc::new(data), config).unwrap()
}
