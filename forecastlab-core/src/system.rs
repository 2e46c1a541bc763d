//! The orchestrator: configuration, data source, stage registry and cache.
//!
//! Every computed value is reached through [`System::get`]. A request names a
//! stage, a method and optionally an instrument and rule; the owning stage
//! computes it on first use, pulling its own inputs through the same entry
//! point, and the result is cached for the lifetime of the `System`.

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::debug;

use crate::cache::{CacheKey, CacheStats, StageCache};
use crate::config::Config;
use crate::curve::AccountCurve;
use crate::data_source::DataSource;
use crate::error::PipelineError;
use crate::series::TimeSeries;
use crate::stage::{Stage, StageOutput};
use crate::stages::{
    account, forecast_combine, forecast_scale_cap, portfolios, position_sizing, raw_data, rules,
};

pub struct System {
    stages: BTreeMap<&'static str, Box<dyn Stage>>,
    data: Arc<dyn DataSource>,
    config: Config,
    cache: StageCache,
}

impl System {
    /// Validate `config` and register `stages`. Registration order is
    /// irrelevant; stages are looked up by name.
    pub fn new(
        stages: Vec<Box<dyn Stage>>,
        data: Arc<dyn DataSource>,
        config: Config,
    ) -> Result<Self, PipelineError> {
        config.validate()?;

        let mut registry: BTreeMap<&'static str, Box<dyn Stage>> = BTreeMap::new();
        for stage in stages {
            let name = stage.name();
            if registry.insert(name, stage).is_some() {
                return Err(PipelineError::DuplicateStage(name.to_string()));
            }
        }

        debug!(
            stages = ?registry.keys().collect::<Vec<_>>(),
            data = data.name(),
            instruments = config.instruments.len(),
            "system constructed"
        );

        Ok(Self {
            stages: registry,
            data,
            config,
            cache: StageCache::new(),
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn data(&self) -> &dyn DataSource {
        self.data.as_ref()
    }

    pub fn instruments(&self) -> &[String] {
        &self.config.instruments
    }

    pub fn stage_names(&self) -> Vec<&'static str> {
        self.stages.keys().copied().collect()
    }

    pub fn has_stage(&self, name: &str) -> bool {
        self.stages.contains_key(name)
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    /// Named cross-stage lookup. Computes and caches on first request.
    pub fn get(&self, key: &CacheKey) -> Result<StageOutput, PipelineError> {
        let stage = self
            .stages
            .get(key.stage.as_str())
            .ok_or_else(|| PipelineError::UnknownStage(key.stage.clone()))?;
        if !stage.methods().contains(&key.method.as_str()) {
            return Err(PipelineError::unknown_method(key));
        }
        self.cache.get_or_compute(key, || stage.compute(self, key))
    }

    fn series(&self, key: CacheKey) -> Result<Arc<TimeSeries>, PipelineError> {
        self.get(&key)?.into_series(&key)
    }

    fn curve(&self, key: CacheKey) -> Result<Arc<AccountCurve>, PipelineError> {
        self.get(&key)?.into_curve(&key)
    }

    // ─── Raw data ───────────────────────────────────────────────────

    pub fn daily_prices(&self, instrument: &str) -> Result<Arc<TimeSeries>, PipelineError> {
        self.series(CacheKey::instrument(raw_data::NAME, raw_data::DAILY_PRICES, instrument))
    }

    pub fn raw_carry(&self, instrument: &str) -> Result<Arc<TimeSeries>, PipelineError> {
        self.series(CacheKey::instrument(raw_data::NAME, raw_data::RAW_CARRY, instrument))
    }

    pub fn daily_returns(&self, instrument: &str) -> Result<Arc<TimeSeries>, PipelineError> {
        self.series(CacheKey::instrument(raw_data::NAME, raw_data::DAILY_RETURNS, instrument))
    }

    pub fn daily_volatility(&self, instrument: &str) -> Result<Arc<TimeSeries>, PipelineError> {
        self.series(CacheKey::instrument(
            raw_data::NAME,
            raw_data::DAILY_VOLATILITY,
            instrument,
        ))
    }

    pub fn annualised_percentage_volatility(
        &self,
        instrument: &str,
    ) -> Result<Arc<TimeSeries>, PipelineError> {
        self.series(CacheKey::instrument(
            raw_data::NAME,
            raw_data::ANNUALISED_PERCENTAGE_VOLATILITY,
            instrument,
        ))
    }

    // ─── Forecasts ──────────────────────────────────────────────────

    pub fn raw_forecast(&self, instrument: &str, rule: &str) -> Result<Arc<TimeSeries>, PipelineError> {
        self.series(CacheKey::rule(rules::NAME, rules::RAW_FORECAST, instrument, rule))
    }

    pub fn forecast_scalar(&self, instrument: &str, rule: &str) -> Result<Arc<TimeSeries>, PipelineError> {
        self.series(CacheKey::rule(
            forecast_scale_cap::NAME,
            forecast_scale_cap::FORECAST_SCALAR,
            instrument,
            rule,
        ))
    }

    pub fn scaled_forecast(&self, instrument: &str, rule: &str) -> Result<Arc<TimeSeries>, PipelineError> {
        self.series(CacheKey::rule(
            forecast_scale_cap::NAME,
            forecast_scale_cap::SCALED_FORECAST,
            instrument,
            rule,
        ))
    }

    pub fn forecast_weights(
        &self,
        instrument: &str,
    ) -> Result<Arc<BTreeMap<String, TimeSeries>>, PipelineError> {
        let key = CacheKey::instrument(
            forecast_combine::NAME,
            forecast_combine::FORECAST_WEIGHTS,
            instrument,
        );
        self.get(&key)?.into_frame(&key)
    }

    pub fn combined_forecast(&self, instrument: &str) -> Result<Arc<TimeSeries>, PipelineError> {
        self.series(CacheKey::instrument(
            forecast_combine::NAME,
            forecast_combine::COMBINED_FORECAST,
            instrument,
        ))
    }

    // ─── Positions ──────────────────────────────────────────────────

    pub fn volatility_scalar(&self, instrument: &str) -> Result<Arc<TimeSeries>, PipelineError> {
        self.series(CacheKey::instrument(
            position_sizing::NAME,
            position_sizing::VOLATILITY_SCALAR,
            instrument,
        ))
    }

    pub fn subsystem_position(&self, instrument: &str) -> Result<Arc<TimeSeries>, PipelineError> {
        self.series(CacheKey::instrument(
            position_sizing::NAME,
            position_sizing::SUBSYSTEM_POSITION,
            instrument,
        ))
    }

    pub fn notional_position(&self, instrument: &str) -> Result<Arc<TimeSeries>, PipelineError> {
        self.series(CacheKey::instrument(
            portfolios::NAME,
            portfolios::NOTIONAL_POSITION,
            instrument,
        ))
    }

    // ─── Accounts ───────────────────────────────────────────────────

    pub fn pandl_for_instrument(&self, instrument: &str) -> Result<Arc<AccountCurve>, PipelineError> {
        self.curve(CacheKey::instrument(
            account::NAME,
            account::PANDL_FOR_INSTRUMENT,
            instrument,
        ))
    }

    pub fn pandl_for_subsystem(&self, instrument: &str) -> Result<Arc<AccountCurve>, PipelineError> {
        self.curve(CacheKey::instrument(
            account::NAME,
            account::PANDL_FOR_SUBSYSTEM,
            instrument,
        ))
    }

    pub fn pandl_for_instrument_forecast(
        &self,
        instrument: &str,
        rule: &str,
    ) -> Result<Arc<AccountCurve>, PipelineError> {
        self.curve(CacheKey::rule(
            account::NAME,
            account::PANDL_FOR_INSTRUMENT_FORECAST,
            instrument,
            rule,
        ))
    }

    pub fn portfolio_pandl(&self) -> Result<Arc<AccountCurve>, PipelineError> {
        self.curve(CacheKey::new(account::NAME, account::PORTFOLIO))
    }
}

impl std::fmt::Debug for System {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("System")
            .field("stages", &self.stage_names())
            .field("data", &self.data.name())
            .field("instruments", &self.config.instruments)
            .finish_non_exhaustive()
    }
}
