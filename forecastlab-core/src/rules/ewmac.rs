//! Exponentially weighted moving average crossover.

use crate::series::TimeSeries;
use crate::volatility::{robust_vol_calc, VolConfig};

#[derive(Debug, Clone, PartialEq)]
pub struct EwmacParams {
    pub lfast: usize,
    pub lslow: usize,
}

impl EwmacParams {
    pub fn new(lfast: usize, lslow: Option<usize>) -> Self {
        Self {
            lfast,
            lslow: lslow.unwrap_or(lfast * 4),
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.lfast == 0 {
            return Err("ewmac lfast must be at least 1".into());
        }
        if self.lslow <= self.lfast {
            return Err(format!(
                "ewmac lslow ({}) must exceed lfast ({})",
                self.lslow, self.lfast
            ));
        }
        Ok(())
    }
}

/// Fast minus slow EWMA of the business-day resampled price, in price units.
pub fn raw_crossover(price: &TimeSeries, params: &EwmacParams) -> TimeSeries {
    crossover(&price.resample_to_business_days(), params)
}

/// `price` must already be on business days.
fn crossover(price: &TimeSeries, params: &EwmacParams) -> TimeSeries {
    let fast = price.ewma(params.lfast);
    let slow = price.ewma(params.lslow);
    let values = fast
        .values()
        .iter()
        .zip(slow.values())
        .map(|(f, s)| f - s)
        .collect();
    price.with_values(values)
}

/// Volatility-normalised crossover on business days.
///
/// Dates where the robust volatility is undefined or zero get a forecast of 0.
pub fn ewmac_forecast(price: &TimeSeries, params: &EwmacParams) -> TimeSeries {
    let resampled = price.resample_to_business_days();
    let raw = crossover(&resampled, params);
    let vol = robust_vol_calc(&resampled.diff(), &VolConfig::default());

    let values = raw
        .values()
        .iter()
        .zip(vol.values())
        .map(|(&r, &v)| if v.is_nan() || v == 0.0 { 0.0 } else { r / v })
        .collect();
    raw.with_values(values)
}
