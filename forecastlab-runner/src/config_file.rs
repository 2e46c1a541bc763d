//! TOML configuration files.
//!
//! ```toml
//! [system]
//! instruments = ["SOFR", "US10"]
//! percentage_vol_target = 20.0
//! notional_trading_capital = 100000.0
//! start_date = "2020-01-01"
//!
//! [rules.ewmac8]
//! type = "ewmac"
//! lfast = 8
//! lslow = 32
//!
//! [rules.carry]
//! type = "carry"
//!
//! [forecast_scalars]
//! ewmac8 = 5.3
//!
//! [forecast_weights]
//! ewmac8 = 0.6
//! carry = 0.4
//!
//! [instrument_forecast_weights.US10]
//! ewmac8 = 1.0
//! ```
//!
//! Every table except `[system].instruments` and `[rules]` is optional;
//! omitted values take the core defaults. Dates are quoted ISO strings.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use forecastlab_core::config::{Config, ConfigBuilder, ConfigError, RuleSpec};

#[derive(Debug, Error)]
pub enum ConfigFileError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("TOML serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// The `[system]` table. `None` keeps the core default.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SystemSection {
    #[serde(default)]
    pub instruments: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub percentage_vol_target: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notional_trading_capital: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_currency: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub forecast_div_multiplier: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instrument_div_multiplier: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub forecast_cap: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<NaiveDate>,
    #[serde(default)]
    pub use_forecast_weight_estimates: bool,
    #[serde(default)]
    pub use_forecast_scale_estimates: bool,
}

/// On-disk form of a [`Config`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    #[serde(default)]
    pub system: SystemSection,
    #[serde(default)]
    pub rules: BTreeMap<String, RuleSpec>,
    #[serde(default)]
    pub forecast_scalars: BTreeMap<String, f64>,
    #[serde(default)]
    pub forecast_weights: BTreeMap<String, f64>,
    #[serde(default)]
    pub instrument_weights: BTreeMap<String, f64>,
    #[serde(default)]
    pub instrument_forecast_weights: BTreeMap<String, BTreeMap<String, f64>>,
}

impl ConfigFile {
    pub fn from_file(path: &Path) -> Result<Self, ConfigFileError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigFileError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigFileError> {
        Ok(toml::from_str(content)?)
    }

    pub fn to_toml(&self) -> Result<String, ConfigFileError> {
        Ok(toml::to_string(self)?)
    }

    /// Restrict the run to `codes`.
    ///
    /// Instrument weights fall back to an equal split over `codes`;
    /// per-instrument forecast weights for excluded codes are dropped.
    pub fn restrict_instruments(&mut self, codes: &[String]) {
        self.system.instruments = codes.to_vec();
        self.instrument_weights.clear();
        self.instrument_forecast_weights
            .retain(|code, _| codes.contains(code));
    }

    /// A [`ConfigBuilder`] pre-filled from the file, for further overrides.
    pub fn to_builder(&self) -> ConfigBuilder {
        let s = &self.system;
        let mut builder = ConfigBuilder::new()
            .instruments(s.instruments.iter().cloned())
            .use_forecast_weight_estimates(s.use_forecast_weight_estimates)
            .use_forecast_scale_estimates(s.use_forecast_scale_estimates);

        if let Some(v) = s.percentage_vol_target {
            builder = builder.percentage_vol_target(v);
        }
        if let Some(v) = s.notional_trading_capital {
            builder = builder.notional_trading_capital(v);
        }
        if let Some(v) = &s.base_currency {
            builder = builder.base_currency(v.clone());
        }
        if let Some(v) = s.forecast_div_multiplier {
            builder = builder.forecast_div_multiplier(v);
        }
        if let Some(v) = s.instrument_div_multiplier {
            builder = builder.instrument_div_multiplier(v);
        }
        if let Some(v) = s.forecast_cap {
            builder = builder.forecast_cap(v);
        }
        if let Some(d) = s.start_date {
            builder = builder.start_date(d);
        }
        if let Some(d) = s.end_date {
            builder = builder.end_date(d);
        }

        for (name, spec) in &self.rules {
            builder = builder.rule_spec(name.clone(), spec);
        }
        for (rule, scalar) in &self.forecast_scalars {
            builder = builder.forecast_scalar(rule.clone(), *scalar);
        }
        for (rule, weight) in &self.forecast_weights {
            builder = builder.forecast_weight(rule.clone(), *weight);
        }
        for (code, weight) in &self.instrument_weights {
            builder = builder.instrument_weight(code.clone(), *weight);
        }
        for (code, weights) in &self.instrument_forecast_weights {
            for (rule, weight) in weights {
                builder = builder.instrument_forecast_weight(code.clone(), rule.clone(), *weight);
            }
        }
        builder
    }

    /// Build and validate the immutable [`Config`].
    pub fn into_config(self) -> Result<Config, ConfigFileError> {
        Ok(self.to_builder().build()?)
    }
}
