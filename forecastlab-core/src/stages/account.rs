//! Profit and loss attribution.

use crate::cache::CacheKey;
use crate::curve::{pandl_for_position, AccountCurve};
use crate::error::PipelineError;
use crate::series::TimeSeries;
use crate::stage::{Stage, StageOutput};
use crate::system::System;
use crate::volatility::{robust_vol_calc, VolConfig, ROOT_BDAYS_IN_YEAR};

pub const NAME: &str = "accounts";
pub const PANDL_FOR_INSTRUMENT: &str = "pandl_for_instrument";
pub const PANDL_FOR_SUBSYSTEM: &str = "pandl_for_subsystem";
pub const PANDL_FOR_INSTRUMENT_FORECAST: &str = "pandl_for_instrument_forecast";
pub const PORTFOLIO: &str = "portfolio";

const METHODS: &[&str] = &[
    PANDL_FOR_INSTRUMENT,
    PANDL_FOR_SUBSYSTEM,
    PANDL_FOR_INSTRUMENT_FORECAST,
    PORTFOLIO,
];

/// Sizing assumptions for trading a single forecast in isolation.
#[derive(Debug, Clone, PartialEq)]
pub struct ForecastPandlParams {
    pub capital: f64,
    /// Annualised risk target, percent of capital.
    pub risk_target_pct: f64,
    pub target_abs_forecast: f64,
    pub vol: VolConfig,
}

impl Default for ForecastPandlParams {
    fn default() -> Self {
        Self {
            capital: crate::config::DEFAULT_NOTIONAL_TRADING_CAPITAL,
            risk_target_pct: crate::config::DEFAULT_PERCENTAGE_VOL_TARGET,
            target_abs_forecast: 10.0,
            vol: VolConfig::default(),
        }
    }
}

/// P&L from trading `forecast` alone on `price`.
///
/// The forecast is forward filled onto the price dates (0 before it starts).
/// A forecast of `target_abs_forecast` risks `risk_target_pct` of capital a
/// year, measured with the robust volatility of the price.
pub fn pandl_for_instrument_forecast(
    instrument: &str,
    rule: &str,
    forecast: &TimeSeries,
    price: &TimeSeries,
    params: &ForecastPandlParams,
) -> Result<AccountCurve, PipelineError> {
    let label = format!("{instrument}/{rule}");
    if price.is_empty() {
        return Err(PipelineError::data_unavailable(instrument, "empty price series"));
    }

    let forecast = forecast.reindex_forward_fill(price.index()).fillna(0.0);
    let daily_vol = robust_vol_calc(&price.diff(), &params.vol);
    let daily_cash_target = params.capital * params.risk_target_pct / 100.0 / ROOT_BDAYS_IN_YEAR;

    let position = forecast.zip_with(&daily_vol, |f, v| {
        f / params.target_abs_forecast * daily_cash_target / v
    })?;

    Ok(pandl_for_position(label, &position, price, params.capital)?)
}

#[derive(Debug, Clone, Default)]
pub struct Account {
    vol: VolConfig,
}

impl Account {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_vol_config(vol: VolConfig) -> Self {
        Self { vol }
    }

    fn position_pandl(
        &self,
        system: &System,
        instrument: &str,
        position: &TimeSeries,
        label: String,
    ) -> Result<AccountCurve, PipelineError> {
        let price = system.daily_prices(instrument)?;
        let capital = system.config().notional_trading_capital;
        Ok(pandl_for_position(label, position, &price, capital)?)
    }

    /// Sum of instrument P&L on the union of their dates; missing days count 0.
    fn portfolio(&self, system: &System) -> Result<AccountCurve, PipelineError> {
        let mut curves = Vec::with_capacity(system.instruments().len());
        for code in system.instruments() {
            curves.push(system.pandl_for_instrument(code)?);
        }
        let index = TimeSeries::union_index(curves.iter().map(|c| c.currency.series()));
        let mut total = vec![0.0; index.len()];
        for curve in &curves {
            let aligned = curve.currency.reindex_exact(&index, 0.0);
            for (t, v) in total.iter_mut().zip(aligned.values()) {
                *t += v;
            }
        }
        let currency = TimeSeries::new(index, total)?;
        Ok(AccountCurve::from_currency(
            "portfolio",
            currency,
            system.config().notional_trading_capital,
        )?)
    }
}

impl Stage for Account {
    fn name(&self) -> &'static str {
        NAME
    }

    fn methods(&self) -> &'static [&'static str] {
        METHODS
    }

    fn compute(&self, system: &System, key: &CacheKey) -> Result<StageOutput, PipelineError> {
        let curve = match key.method.as_str() {
            PANDL_FOR_INSTRUMENT => {
                let instrument = key.require_instrument()?;
                let position = system.notional_position(instrument)?;
                self.position_pandl(system, instrument, &position, instrument.to_string())?
            }
            PANDL_FOR_SUBSYSTEM => {
                let instrument = key.require_instrument()?;
                let position = system.subsystem_position(instrument)?;
                self.position_pandl(system, instrument, &position, format!("{instrument} subsystem"))?
            }
            PANDL_FOR_INSTRUMENT_FORECAST => {
                let instrument = key.require_instrument()?;
                let rule = key.require_rule()?;
                let config = system.config();
                let params = ForecastPandlParams {
                    capital: config.notional_trading_capital,
                    risk_target_pct: config.percentage_vol_target,
                    vol: self.vol.clone(),
                    ..ForecastPandlParams::default()
                };
                let forecast = system.scaled_forecast(instrument, rule)?;
                let price = system.daily_prices(instrument)?;
                pandl_for_instrument_forecast(instrument, rule, &forecast, &price, &params)?
            }
            PORTFOLIO => self.portfolio(system)?,
            _ => return Err(PipelineError::unknown_method(key)),
        };
        Ok(StageOutput::curve(curve))
    }
}
