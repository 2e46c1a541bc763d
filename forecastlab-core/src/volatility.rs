//! Robust volatility estimate shared by RawData, EWMAC and account curves.
//!
//! EW standard deviation of price differences, lifted to an absolute
//! minimum, then floored at a low rolling quantile of its own history so
//! that a quiet spell cannot shrink the estimate towards zero.

use crate::series::TimeSeries;

pub const BUSINESS_DAYS_IN_YEAR: f64 = 256.0;
pub const ROOT_BDAYS_IN_YEAR: f64 = 16.0;

/// Parameters for [`robust_vol_calc`].
#[derive(Debug, Clone, PartialEq)]
pub struct VolConfig {
    /// EW span in observations.
    pub days: usize,
    pub min_periods: usize,
    /// Defined values below this are raised to it.
    pub abs_min: f64,
    pub floor: bool,
    pub floor_quantile: f64,
    pub floor_min_periods: usize,
    pub floor_days: usize,
}

impl Default for VolConfig {
    fn default() -> Self {
        Self {
            days: 35,
            min_periods: 10,
            abs_min: 1e-10,
            floor: true,
            floor_quantile: 0.05,
            floor_min_periods: 100,
            floor_days: 500,
        }
    }
}

/// Robust daily volatility of a return (price difference) series.
///
/// Output is NaN wherever the EW estimate is not yet defined; every defined
/// value is `>= abs_min`, so dividing by it is always safe.
pub fn robust_vol_calc(returns: &TimeSeries, config: &VolConfig) -> TimeSeries {
    let vol = returns
        .ewm_std(config.days, config.min_periods)
        .map(|v| if v.is_nan() { v } else { v.max(config.abs_min) });

    if !config.floor {
        return vol;
    }

    // Floor is 0 until the quantile is defined, then carried forward.
    let floor = vol
        .rolling_quantile(config.floor_days, config.floor_min_periods, config.floor_quantile)
        .ffill()
        .fillna(0.0);

    vol.with_values(
        vol.values()
            .iter()
            .zip(floor.values())
            .map(|(&v, &f)| if v.is_nan() { v } else { v.max(f) })
            .collect(),
    )
}
