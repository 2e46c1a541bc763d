//! Volatility targeting: combined forecast to position in instrument units.

use crate::cache::CacheKey;
use crate::error::PipelineError;
use crate::stage::{Stage, StageOutput};
use crate::system::System;

pub const NAME: &str = "position_size";
pub const VOLATILITY_SCALAR: &str = "volatility_scalar";
pub const SUBSYSTEM_POSITION: &str = "subsystem_position";

const METHODS: &[&str] = &[VOLATILITY_SCALAR, SUBSYSTEM_POSITION];

/// Forecast value that maps to a full volatility-target position.
pub const AVERAGE_ABS_FORECAST: f64 = 10.0;

#[derive(Debug, Clone, Copy, Default)]
pub struct PositionSizing;

impl Stage for PositionSizing {
    fn name(&self) -> &'static str {
        NAME
    }

    fn methods(&self) -> &'static [&'static str] {
        METHODS
    }

    fn compute(&self, system: &System, key: &CacheKey) -> Result<StageOutput, PipelineError> {
        let instrument = key.require_instrument()?;
        let config = system.config();

        let series = match key.method.as_str() {
            // Units whose annualised volatility equals the cash risk target.
            VOLATILITY_SCALAR => {
                let cash_target = config.percentage_vol_target * config.notional_trading_capital / 100.0;
                let pct_vol = system.annualised_percentage_volatility(instrument)?;
                let price = system.daily_prices(instrument)?;
                pct_vol.zip_with(&price, |v, p| {
                    let unit_risk = v * p;
                    if unit_risk.is_finite() && unit_risk > 0.0 {
                        cash_target / unit_risk
                    } else {
                        f64::NAN
                    }
                })?
            }
            SUBSYSTEM_POSITION => {
                let forecast = system.combined_forecast(instrument)?;
                let scalar = system.volatility_scalar(instrument)?;
                forecast.zip_with(&scalar, |f, s| f / AVERAGE_ABS_FORECAST * s)?
            }
            _ => return Err(PipelineError::unknown_method(key)),
        };

        Ok(StageOutput::series(series))
    }
}
