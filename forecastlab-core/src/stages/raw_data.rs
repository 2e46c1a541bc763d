//! Prices, carry and the volatility measures derived from them.

use crate::cache::CacheKey;
use crate::error::PipelineError;
use crate::stage::{Stage, StageOutput};
use crate::system::System;
use crate::volatility::{robust_vol_calc, VolConfig, ROOT_BDAYS_IN_YEAR};

pub const NAME: &str = "raw_data";
pub const DAILY_PRICES: &str = "daily_prices";
pub const RAW_CARRY: &str = "raw_carry";
pub const DAILY_RETURNS: &str = "daily_returns";
pub const DAILY_VOLATILITY: &str = "daily_volatility";
pub const ANNUALISED_PERCENTAGE_VOLATILITY: &str = "annualised_percentage_volatility";

const METHODS: &[&str] = &[
    DAILY_PRICES,
    RAW_CARRY,
    DAILY_RETURNS,
    DAILY_VOLATILITY,
    ANNUALISED_PERCENTAGE_VOLATILITY,
];

#[derive(Debug, Clone, Default)]
pub struct RawData {
    vol: VolConfig,
}

impl RawData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_vol_config(vol: VolConfig) -> Self {
        Self { vol }
    }
}

impl Stage for RawData {
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
            DAILY_PRICES => {
                let prices = system
                    .data()
                    .daily_prices(instrument)
                    .map_err(|e| PipelineError::data_unavailable(instrument, e))?
                    .between(config.start_date, config.end_date);
                if prices.count_finite() == 0 {
                    return Err(PipelineError::data_unavailable(
                        instrument,
                        "no prices in the configured date range",
                    ));
                }
                prices
            }
            RAW_CARRY => system
                .data()
                .get_instrument_raw_carry_data(instrument)
                .map_err(|e| PipelineError::data_unavailable(instrument, e))?
                .between(config.start_date, config.end_date),
            DAILY_RETURNS => system.daily_prices(instrument)?.diff(),
            DAILY_VOLATILITY => {
                let returns = system.daily_returns(instrument)?;
                robust_vol_calc(&returns, &self.vol)
            }
            ANNUALISED_PERCENTAGE_VOLATILITY => {
                let vol = system.daily_volatility(instrument)?;
                let price = system.daily_prices(instrument)?;
                vol.zip_with(&price, |v, p| {
                    if p > 0.0 {
                        v / p * ROOT_BDAYS_IN_YEAR
                    } else {
                        f64::NAN
                    }
                })?
            }
            _ => return Err(PipelineError::unknown_method(key)),
        };

        Ok(StageOutput::series(series))
    }
}
