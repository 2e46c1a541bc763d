//! Carry: smoothed raw carry measured against its own volatility.

use thiserror::Error;

use crate::series::TimeSeries;

/// Fewer finite observations than this and carry is not attempted.
pub const MIN_CARRY_OBSERVATIONS: usize = 10;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum CarryError {
    #[error("raw carry series is empty")]
    Empty,

    #[error("raw carry contains non-finite value at {0}")]
    NonFinite(chrono::NaiveDate),

    #[error("only {found} finite raw carry observations, need {MIN_CARRY_OBSERVATIONS}")]
    TooShort { found: usize },
}

#[derive(Debug, Clone, PartialEq)]
pub struct CarryParams {
    pub smooth_days: usize,
    pub vol_days: usize,
    pub min_periods: usize,
}

impl Default for CarryParams {
    fn default() -> Self {
        Self {
            smooth_days: 90,
            vol_days: 35,
            min_periods: MIN_CARRY_OBSERVATIONS,
        }
    }
}

impl CarryParams {
    pub fn new(smooth_days: usize, vol_days: usize) -> Self {
        Self {
            smooth_days,
            vol_days,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.smooth_days == 0 || self.vol_days == 0 {
            return Err("carry smooth_days and vol_days must be at least 1".into());
        }
        Ok(())
    }
}

/// Check raw carry before any arithmetic touches it. NaN gaps are allowed.
pub fn validate_raw_carry(raw: &TimeSeries) -> Result<(), CarryError> {
    if raw.is_empty() {
        return Err(CarryError::Empty);
    }
    if let Some((date, _)) = raw.iter().find(|(_, v)| v.is_infinite()) {
        return Err(CarryError::NonFinite(date));
    }
    let found = raw.count_finite();
    if found < MIN_CARRY_OBSERVATIONS {
        return Err(CarryError::TooShort { found });
    }
    Ok(())
}

/// Relative carry against a zero benchmark on the raw carry index.
///
/// `(ewma(raw, smooth_days) - 0) / ewm_std(raw, vol_days)`; 0 where the
/// volatility is undefined or zero.
pub fn carry_forecast(raw: &TimeSeries, params: &CarryParams) -> Result<TimeSeries, CarryError> {
    validate_raw_carry(raw)?;

    let smoothed = raw.ewma(params.smooth_days);
    let benchmark = TimeSeries::constant(smoothed.index(), 0.0);
    let vol = raw.ewm_std(params.vol_days, params.min_periods);

    let values = smoothed
        .values()
        .iter()
        .zip(benchmark.values())
        .zip(vol.values())
        .map(|((&s, &b), &v)| {
            if v.is_nan() || v == 0.0 || s.is_nan() {
                0.0
            } else {
                (s - b) / v
            }
        })
        .collect();
    Ok(smoothed.with_values(values))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::bday_series;

    fn noisy_carry(n: usize, level: f64) -> TimeSeries {
        let values: Vec<f64> = (0..n)
            .map(|i| level + 0.002 * ((i as f64) * 1.7).sin())
            .collect();
        bday_series(&values)
    }

    #[test]
    fn rejects_malformed_input() {
        assert_eq!(
            carry_forecast(&TimeSeries::empty(), &CarryParams::default()),
            Err(CarryError::Empty)
        );
        let short = bday_series(&[0.01; 9]);
        assert_eq!(
            carry_forecast(&short, &CarryParams::default()),
            Err(CarryError::TooShort { found: 9 })
        );
        let inf = bday_series(&[0.01, f64::NEG_INFINITY, 0.01]);
        assert!(matches!(
            carry_forecast(&inf, &CarryParams::default()),
            Err(CarryError::NonFinite(_))
        ));
    }

    #[test]
    fn positive_carry_gives_positive_forecast() {
        let raw = noisy_carry(200, 0.01);
        let forecast = carry_forecast(&raw, &CarryParams::default()).unwrap();
        assert_eq!(forecast.index(), raw.index());
        assert!(forecast.values()[..9].iter().all(|v| *v == 0.0));
        assert!(forecast.values()[9..].iter().all(|v| *v > 0.0));
    }

    #[test]
    fn flat_carry_has_zero_vol_and_zero_forecast() {
        let raw = bday_series(&[0.02; 40]);
        let forecast = carry_forecast(&raw, &CarryParams::default()).unwrap();
        assert!(forecast.values().iter().all(|v| *v == 0.0));
    }
}
