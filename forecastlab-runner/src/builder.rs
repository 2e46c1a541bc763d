//! Assembles a [`System`] from a configuration, a data source and the
//! standard stages.

use std::fmt;
use std::sync::Arc;

use chrono::NaiveDate;
use thiserror::Error;

use forecastlab_core::config::{ConfigBuilder, ConfigError};
use forecastlab_core::data_source::DataSource;
use forecastlab_core::stage::Stage;
use forecastlab_core::stages::{
    Account, ForecastCombine, ForecastScaleCap, ForecastWeightEstimator, Portfolios,
    PositionSizing, RawData, Rules,
};
use forecastlab_core::volatility::VolConfig;
use forecastlab_core::{PipelineError, System, TradingRule};

use crate::config_file::ConfigFile;

#[derive(Debug, Error)]
pub enum BuildError {
    #[error("no data source was given")]
    NoDataSource,
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Pipeline(#[from] PipelineError),
}

/// Fluent wiring of one pipeline.
///
/// Configuration setters forward to [`ConfigBuilder`]; validation happens
/// once, in [`PipelineBuilder::build`].
#[derive(Clone, Default)]
pub struct PipelineBuilder {
    config: ConfigBuilder,
    data: Option<Arc<dyn DataSource>>,
    estimator: Option<Arc<dyn ForecastWeightEstimator>>,
    vol: VolConfig,
}

impl fmt::Debug for PipelineBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PipelineBuilder")
            .field("config", &self.config)
            .field("data", &self.data.as_ref().map(|d| d.name().to_string()))
            .field("estimator", &self.estimator.as_ref().map(|e| e.name().to_string()))
            .field("vol", &self.vol)
            .finish()
    }
}

impl PipelineBuilder {
    pub fn new() -> Self {
        Self {
            config: ConfigBuilder::new(),
            ..Self::default()
        }
    }

    pub fn from_config_file(file: &ConfigFile) -> Self {
        Self {
            config: file.to_builder(),
            ..Self::new()
        }
    }

    pub fn data(self, data: impl DataSource + 'static) -> Self {
        self.shared_data(Arc::new(data))
    }

    pub fn shared_data(mut self, data: Arc<dyn DataSource>) -> Self {
        self.data = Some(data);
        self
    }

    pub fn instruments<I, S>(mut self, codes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config = self.config.instruments(codes);
        self
    }

    pub fn rule(mut self, name: impl Into<String>, rule: TradingRule) -> Self {
        self.config = self.config.rule(name, rule);
        self
    }

    pub fn forecast_scalar(mut self, rule: impl Into<String>, scalar: f64) -> Self {
        self.config = self.config.forecast_scalar(rule, scalar);
        self
    }

    pub fn forecast_weight(mut self, rule: impl Into<String>, weight: f64) -> Self {
        self.config = self.config.forecast_weight(rule, weight);
        self
    }

    pub fn instrument_weight(mut self, code: impl Into<String>, weight: f64) -> Self {
        self.config = self.config.instrument_weight(code, weight);
        self
    }

    /// Inclusive date bounds; `None` leaves that side open.
    pub fn dates(mut self, start: Option<NaiveDate>, end: Option<NaiveDate>) -> Self {
        if let Some(start) = start {
            self.config = self.config.start_date(start);
        }
        if let Some(end) = end {
            self.config = self.config.end_date(end);
        }
        self
    }

    /// Use `estimator` for forecast weights instead of the configured ones.
    pub fn weight_estimator(mut self, estimator: Arc<dyn ForecastWeightEstimator>) -> Self {
        self.estimator = Some(estimator);
        self.config = self.config.use_forecast_weight_estimates(true);
        self
    }

    pub fn vol_config(mut self, vol: VolConfig) -> Self {
        self.vol = vol;
        self
    }

    /// Arbitrary configuration overrides.
    pub fn configure(mut self, f: impl FnOnce(ConfigBuilder) -> ConfigBuilder) -> Self {
        self.config = f(self.config);
        self
    }

    /// The seven stages, parameterized by this builder.
    pub fn stages(&self) -> Vec<Box<dyn Stage>> {
        let combine = match &self.estimator {
            Some(estimator) => ForecastCombine::with_estimator(Arc::clone(estimator)),
            None => ForecastCombine::new(),
        };
        vec![
            Box::new(RawData::with_vol_config(self.vol.clone())),
            Box::new(Rules),
            Box::new(ForecastScaleCap::new()),
            Box::new(combine),
            Box::new(PositionSizing),
            Box::new(Portfolios),
            Box::new(Account::with_vol_config(self.vol.clone())),
        ]
    }

    pub fn build(self) -> Result<System, BuildError> {
        let stages = self.stages();
        let data = self.data.ok_or(BuildError::NoDataSource)?;
        let config = self.config.build()?;
        Ok(System::new(stages, data, config)?)
    }
}
