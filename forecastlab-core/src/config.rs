//! Immutable system configuration.
//!
//! A [`Config`] is assembled through [`ConfigBuilder`] (or by filling the
//! public fields from [`Config::defaults`]) and checked once by
//! [`Config::validate`] when the `System` is constructed. Nothing mutates it
//! afterwards, so cached stage outputs can never go stale.

use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::rules::{CarryParams, TradingRule};

pub const DEFAULT_FORECAST_CAP: f64 = 20.0;
pub const DEFAULT_PERCENTAGE_VOL_TARGET: f64 = 16.0;
pub const DEFAULT_NOTIONAL_TRADING_CAPITAL: f64 = 1_000_000.0;
pub const DEFAULT_BASE_CURRENCY: &str = "USD";

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("missing required configuration: {0}")]
    MissingField(String),

    #[error("{field} refers to unknown rule '{rule}'")]
    UnknownRule { field: String, rule: String },

    #[error("{field} refers to unknown instrument '{instrument}'")]
    UnknownInstrument { field: String, instrument: String },

    #[error("invalid value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },
}

/// Serializable description of a built-in rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RuleSpec {
    /// EWMA crossover; `lslow` defaults to `4 * lfast`.
    Ewmac {
        lfast: usize,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        lslow: Option<usize>,
    },

    Carry {
        #[serde(default = "default_smooth_days")]
        smooth_days: usize,
        #[serde(default = "default_vol_days")]
        vol_days: usize,
    },
}

fn default_smooth_days() -> usize {
    CarryParams::default().smooth_days
}

fn default_vol_days() -> usize {
    CarryParams::default().vol_days
}

impl From<&RuleSpec> for TradingRule {
    fn from(spec: &RuleSpec) -> Self {
        match *spec {
            RuleSpec::Ewmac { lfast, lslow } => TradingRule::ewmac(lfast, lslow),
            RuleSpec::Carry {
                smooth_days,
                vol_days,
            } => TradingRule::carry(CarryParams::new(smooth_days, vol_days)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub instruments: Vec<String>,
    /// Empty means equal split across `instruments`.
    pub instrument_weights: BTreeMap<String, f64>,
    pub instrument_div_multiplier: f64,
    pub trading_rules: BTreeMap<String, TradingRule>,
    /// Missing rules use a scalar of 1.0.
    pub forecast_scalars: BTreeMap<String, f64>,
    /// Empty means equal split across `trading_rules`.
    pub forecast_weights: BTreeMap<String, f64>,
    /// Per-instrument override of `forecast_weights`.
    pub instrument_forecast_weights: BTreeMap<String, BTreeMap<String, f64>>,
    pub forecast_div_multiplier: f64,
    pub forecast_cap: f64,
    pub percentage_vol_target: f64,
    pub notional_trading_capital: f64,
    pub base_currency: String,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub use_forecast_weight_estimates: bool,
    pub use_forecast_scale_estimates: bool,
}

impl Config {
    /// Every field at its default; no instruments, no rules.
    pub fn defaults() -> Self {
        Self {
            instruments: Vec::new(),
            instrument_weights: BTreeMap::new(),
            instrument_div_multiplier: 1.0,
            trading_rules: BTreeMap::new(),
            forecast_scalars: BTreeMap::new(),
            forecast_weights: BTreeMap::new(),
            instrument_forecast_weights: BTreeMap::new(),
            forecast_div_multiplier: 1.0,
            forecast_cap: DEFAULT_FORECAST_CAP,
            percentage_vol_target: DEFAULT_PERCENTAGE_VOL_TARGET,
            notional_trading_capital: DEFAULT_NOTIONAL_TRADING_CAPITAL,
            base_currency: DEFAULT_BASE_CURRENCY.to_string(),
            start_date: None,
            end_date: None,
            use_forecast_weight_estimates: false,
            use_forecast_scale_estimates: false,
        }
    }

    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::new()
    }

    pub fn rule(&self, name: &str) -> Option<&TradingRule> {
        self.trading_rules.get(name)
    }

    pub fn rule_names(&self) -> impl Iterator<Item = &str> {
        self.trading_rules.keys().map(String::as_str)
    }

    pub fn has_instrument(&self, code: &str) -> bool {
        self.instruments.iter().any(|c| c == code)
    }

    /// Fixed forecast scalar for `rule`.
    pub fn forecast_scalar(&self, rule: &str) -> f64 {
        self.forecast_scalars.get(rule).copied().unwrap_or(1.0)
    }

    /// Configured rule weights for an instrument, before renormalization:
    /// instrument override, then global weights, then equal split.
    pub fn forecast_weights_for(&self, instrument: &str) -> BTreeMap<String, f64> {
        if let Some(weights) = self.instrument_forecast_weights.get(instrument) {
            return weights.clone();
        }
        if !self.forecast_weights.is_empty() {
            return self.forecast_weights.clone();
        }
        equal_split(self.trading_rules.keys())
    }

    pub fn instrument_weight(&self, instrument: &str) -> f64 {
        if self.instrument_weights.is_empty() {
            if self.has_instrument(instrument) {
                1.0 / self.instruments.len() as f64
            } else {
                0.0
            }
        } else {
            self.instrument_weights
                .get(instrument)
                .copied()
                .unwrap_or(0.0)
        }
    }

    /// Check every cross-reference and numeric bound.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.instruments.is_empty() {
            return Err(ConfigError::MissingField("instruments".into()));
        }
        let mut seen = BTreeSet::new();
        for code in &self.instruments {
            if code.trim().is_empty() {
                return invalid("instruments", "instrument code must not be empty");
            }
            if !seen.insert(code.as_str()) {
                return invalid("instruments", format!("'{code}' listed twice"));
            }
        }

        if self.trading_rules.is_empty() {
            return Err(ConfigError::MissingField("trading_rules".into()));
        }
        for (name, rule) in &self.trading_rules {
            rule.validate()
                .or_else(|reason| invalid(&format!("trading_rules.{name}"), reason))?;
        }

        for (rule, scalar) in &self.forecast_scalars {
            self.check_rule("forecast_scalars", rule)?;
            if !(scalar.is_finite() && *scalar > 0.0) {
                return invalid(
                    &format!("forecast_scalars.{rule}"),
                    format!("{scalar} is not a positive number"),
                );
            }
        }

        self.check_weights("forecast_weights", &self.forecast_weights, |r| {
            self.check_rule("forecast_weights", r)
        })?;
        for (code, weights) in &self.instrument_forecast_weights {
            self.check_instrument("instrument_forecast_weights", code)?;
            let field = format!("instrument_forecast_weights.{code}");
            if weights.is_empty() {
                return invalid(&field, "no rules listed");
            }
            self.check_weights(&field, weights, |r| self.check_rule(&field, r))?;
        }

        if !self.instrument_weights.is_empty() {
            self.check_weights("instrument_weights", &self.instrument_weights, |c| {
                self.check_instrument("instrument_weights", c)
            })?;
            if let Some(code) = self
                .instruments
                .iter()
                .find(|c| !self.instrument_weights.contains_key(*c))
            {
                return Err(ConfigError::MissingField(format!("instrument_weights.{code}")));
            }
        }

        positive("instrument_div_multiplier", self.instrument_div_multiplier)?;
        positive("forecast_div_multiplier", self.forecast_div_multiplier)?;
        positive("forecast_cap", self.forecast_cap)?;
        positive("percentage_vol_target", self.percentage_vol_target)?;
        positive("notional_trading_capital", self.notional_trading_capital)?;
        if self.base_currency.trim().is_empty() {
            return invalid("base_currency", "must not be empty");
        }

        if let (Some(start), Some(end)) = (self.start_date, self.end_date) {
            if start > end {
                return invalid("start_date", format!("{start} is after end_date {end}"));
            }
        }

        Ok(())
    }

    fn check_rule(&self, field: &str, rule: &str) -> Result<(), ConfigError> {
        if self.trading_rules.contains_key(rule) {
            Ok(())
        } else {
            Err(ConfigError::UnknownRule {
                field: field.to_string(),
                rule: rule.to_string(),
            })
        }
    }

    fn check_instrument(&self, field: &str, code: &str) -> Result<(), ConfigError> {
        if self.has_instrument(code) {
            Ok(())
        } else {
            Err(ConfigError::UnknownInstrument {
                field: field.to_string(),
                instrument: code.to_string(),
            })
        }
    }

    fn check_weights(
        &self,
        field: &str,
        weights: &BTreeMap<String, f64>,
        check_key: impl Fn(&str) -> Result<(), ConfigError>,
    ) -> Result<(), ConfigError> {
        for (key, w) in weights {
            check_key(key)?;
            if !(w.is_finite() && *w >= 0.0) {
                return invalid(&format!("{field}.{key}"), format!("{w} is not a non-negative weight"));
            }
        }
        if !weights.is_empty() && weights.values().sum::<f64>() <= 0.0 {
            return invalid(field, "weights sum to zero");
        }
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::defaults()
    }
}

fn equal_split<'a>(keys: impl Iterator<Item = &'a String>) -> BTreeMap<String, f64> {
    let keys: Vec<&String> = keys.collect();
    let w = 1.0 / keys.len().max(1) as f64;
    keys.into_iter().map(|k| (k.clone(), w)).collect()
}

fn invalid<T>(field: &str, reason: impl Into<String>) -> Result<T, ConfigError> {
    Err(ConfigError::InvalidValue {
        field: field.to_string(),
        reason: reason.into(),
    })
}

fn positive(field: &str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        invalid(field, format!("{value} must be positive"))
    }
}

/// Fluent construction of a [`Config`] on top of [`Config::defaults`].
#[derive(Debug, Clone, Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: Config::defaults(),
        }
    }

    pub fn instrument(mut self, code: impl Into<String>) -> Self {
        self.config.instruments.push(code.into());
        self
    }

    pub fn instruments<I, S>(mut self, codes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.instruments.extend(codes.into_iter().map(Into::into));
        self
    }

    pub fn instrument_weight(mut self, code: impl Into<String>, weight: f64) -> Self {
        self.config.instrument_weights.insert(code.into(), weight);
        self
    }

    pub fn instrument_div_multiplier(mut self, idm: f64) -> Self {
        self.config.instrument_div_multiplier = idm;
        self
    }

    pub fn rule(mut self, name: impl Into<String>, rule: TradingRule) -> Self {
        self.config.trading_rules.insert(name.into(), rule);
        self
    }

    pub fn rule_spec(self, name: impl Into<String>, spec: &RuleSpec) -> Self {
        self.rule(name, TradingRule::from(spec))
    }

    pub fn forecast_scalar(mut self, rule: impl Into<String>, scalar: f64) -> Self {
        self.config.forecast_scalars.insert(rule.into(), scalar);
        self
    }

    pub fn forecast_weight(mut self, rule: impl Into<String>, weight: f64) -> Self {
        self.config.forecast_weights.insert(rule.into(), weight);
        self
    }

    pub fn instrument_forecast_weight(
        mut self,
        instrument: impl Into<String>,
        rule: impl Into<String>,
        weight: f64,
    ) -> Self {
        self.config
            .instrument_forecast_weights
            .entry(instrument.into())
            .or_default()
            .insert(rule.into(), weight);
        self
    }

    pub fn forecast_div_multiplier(mut self, fdm: f64) -> Self {
        self.config.forecast_div_multiplier = fdm;
        self
    }

    pub fn forecast_cap(mut self, cap: f64) -> Self {
        self.config.forecast_cap = cap;
        self
    }

    pub fn percentage_vol_target(mut self, target: f64) -> Self {
        self.config.percentage_vol_target = target;
        self
    }

    pub fn notional_trading_capital(mut self, capital: f64) -> Self {
        self.config.notional_trading_capital = capital;
        self
    }

    pub fn base_currency(mut self, currency: impl Into<String>) -> Self {
        self.config.base_currency = currency.into();
        self
    }

    pub fn start_date(mut self, date: NaiveDate) -> Self {
        self.config.start_date = Some(date);
        self
    }

    pub fn end_date(mut self, date: NaiveDate) -> Self {
        self.config.end_date = Some(date);
        self
    }

    pub fn use_forecast_weight_estimates(mut self, on: bool) -> Self {
        self.config.use_forecast_weight_estimates = on;
        self
    }

    pub fn use_forecast_scale_estimates(mut self, on: bool) -> Self {
        self.config.use_forecast_scale_estimates = on;
        self
    }

    /// Validate and return the finished configuration.
    pub fn build(self) -> Result<Config, ConfigError> {
        self.config.validate()?;
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> ConfigBuilder {
        Config::builder()
            .instrument("SOFR")
            .rule("ewmac8", TradingRule::ewmac(8, Some(32)))
            .rule("ewmac32", TradingRule::ewmac(32, Some(128)))
    }

    #[test]
    fn defaults_match_documented_values() {
        let config = base().build().unwrap();
        assert_eq!(config.percentage_vol_target, 16.0);
        assert_eq!(config.notional_trading_capital, 1_000_000.0);
        assert_eq!(config.base_currency, "USD");
        assert_eq!(config.forecast_cap, 20.0);
        assert_eq!(config.forecast_div_multiplier, 1.0);
        assert_eq!(config.instrument_div_multiplier, 1.0);
        assert_eq!(config.forecast_scalar("ewmac8"), 1.0);
        assert_eq!(config.instrument_weight("SOFR"), 1.0);
    }

    #[test]
    fn forecast_weights_fall_back_to_equal_split() {
        let config = base().build().unwrap();
        let w = config.forecast_weights_for("SOFR");
        assert_eq!(w.len(), 2);
        assert!(w.values().all(|v| (*v - 0.5).abs() < 1e-12));
    }

    #[test]
    fn instrument_override_wins() {
        let config = base()
            .forecast_weight("ewmac8", 0.3)
            .forecast_weight("ewmac32", 0.7)
            .instrument_forecast_weight("SOFR", "ewmac8", 1.0)
            .build()
            .unwrap();
        let w = config.forecast_weights_for("SOFR");
        assert_eq!(w.len(), 1);
        assert_eq!(w["ewmac8"], 1.0);
    }

    #[test]
    fn unknown_rule_reference_is_rejected() {
        let err = base().forecast_weight("carry", 0.5).build().unwrap_err();
        assert_eq!(
            err,
            ConfigError::UnknownRule {
                field: "forecast_weights".into(),
                rule: "carry".into()
            }
        );
    }

    #[test]
    fn unknown_instrument_reference_is_rejected() {
        let err = base().instrument_weight("ES", 1.0).build().unwrap_err();
        assert!(matches!(err, ConfigError::UnknownInstrument { .. }));
    }

    #[test]
    fn partial_instrument_weights_are_rejected() {
        let err = base()
            .instrument("ES")
            .instrument_weight("SOFR", 1.0)
            .build()
            .unwrap_err();
        assert_eq!(err, ConfigError::MissingField("instrument_weights.ES".into()));
    }

    #[test]
    fn missing_instruments_and_rules() {
        assert_eq!(
            Config::builder().build().unwrap_err(),
            ConfigError::MissingField("instruments".into())
        );
        assert_eq!(
            Config::builder().instrument("SOFR").build().unwrap_err(),
            ConfigError::MissingField("trading_rules".into())
        );
    }

    #[test]
    fn numeric_bounds() {
        assert!(base().notional_trading_capital(0.0).build().is_err());
        assert!(base().forecast_cap(f64::NAN).build().is_err());
        assert!(base().forecast_scalar("ewmac8", -1.0).build().is_err());
        assert!(base().instrument("SOFR").build().is_err());
    }

    #[test]
    fn rule_spec_deserializes_from_tagged_table() {
        let spec: RuleSpec = serde_json::from_str(r#"{"type":"ewmac","lfast":16}"#).unwrap();
        assert_eq!(spec, RuleSpec::Ewmac { lfast: 16, lslow: None });
        assert_eq!(TradingRule::from(&spec).describe(), "ewmac(16,64)");

        let carry: RuleSpec = serde_json::from_str(r#"{"type":"carry"}"#).unwrap();
        assert_eq!(
            carry,
            RuleSpec::Carry {
                smooth_days: 90,
                vol_days: 35
            }
        );
    }
}
