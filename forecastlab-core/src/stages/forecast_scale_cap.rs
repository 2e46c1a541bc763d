//! Forecast scaling and capping.

use tracing::warn;

use crate::cache::CacheKey;
use crate::error::PipelineError;
use crate::series::TimeSeries;
use crate::stage::{Stage, StageOutput};
use crate::system::System;

pub const NAME: &str = "forecast_scale_cap";
pub const FORECAST_SCALAR: &str = "forecast_scalar";
pub const SCALED_FORECAST: &str = "scaled_forecast";

const METHODS: &[&str] = &[FORECAST_SCALAR, SCALED_FORECAST];

/// Average absolute forecast the scalar estimate aims for.
pub const TARGET_ABS_FORECAST: f64 = 10.0;

#[derive(Debug, Clone)]
pub struct ForecastScaleCap {
    /// Observations of raw forecast required before an estimate is trusted.
    pub estimate_min_periods: usize,
}

impl Default for ForecastScaleCap {
    fn default() -> Self {
        Self {
            estimate_min_periods: 500,
        }
    }
}

impl ForecastScaleCap {
    pub fn new() -> Self {
        Self::default()
    }

    fn scalar(&self, system: &System, instrument: &str, rule: &str) -> Result<TimeSeries, PipelineError> {
        let raw = system.raw_forecast(instrument, rule)?;
        let fixed = system.config().forecast_scalar(rule);

        if !system.config().use_forecast_scale_estimates {
            return Ok(TimeSeries::constant(raw.index(), fixed));
        }

        let estimate = raw
            .abs()
            .expanding_mean(self.estimate_min_periods)
            .map(|m| if m > 0.0 { TARGET_ABS_FORECAST / m } else { f64::NAN })
            .backfill_leading();

        if estimate.count_finite() == 0 {
            warn!(
                instrument,
                rule,
                min_periods = self.estimate_min_periods,
                "not enough history to estimate forecast scalar, using fixed value"
            );
            return Ok(TimeSeries::constant(raw.index(), fixed));
        }
        Ok(estimate)
    }
}

impl Stage for ForecastScaleCap {
    fn name(&self) -> &'static str {
        NAME
    }

    fn methods(&self) -> &'static [&'static str] {
        METHODS
    }

    fn compute(&self, system: &System, key: &CacheKey) -> Result<StageOutput, PipelineError> {
        let instrument = key.require_instrument()?;
        let rule = key.require_rule()?;

        match key.method.as_str() {
            FORECAST_SCALAR => Ok(StageOutput::series(self.scalar(system, instrument, rule)?)),
            SCALED_FORECAST => {
                let cap = system.config().forecast_cap;
                let raw = system.raw_forecast(instrument, rule)?;
                let scalar = system.forecast_scalar(instrument, rule)?;
                let scaled = raw.zip_with(&scalar, |f, s| f * s)?.clip(-cap, cap);
                Ok(StageOutput::series(scaled))
            }
            _ => Err(PipelineError::unknown_method(key)),
        }
    }
}
