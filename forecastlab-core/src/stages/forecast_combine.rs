//! Weighted combination of scaled forecasts into one forecast per instrument.
//!
//! Weights are renormalized at every date over the rules that have a finite
//! forecast there, so a rule whose history starts late does not drag the
//! combination towards zero before it begins.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use tracing::warn;

use crate::cache::CacheKey;
use crate::error::PipelineError;
use crate::series::TimeSeries;
use crate::stage::{Stage, StageOutput};
use crate::system::System;

pub const NAME: &str = "forecast_combine";
pub const FORECAST_WEIGHTS: &str = "forecast_weights";
pub const COMBINED_FORECAST: &str = "combined_forecast";

const METHODS: &[&str] = &[FORECAST_WEIGHTS, COMBINED_FORECAST];

/// Source of forecast weights when `use_forecast_weight_estimates` is on.
pub trait ForecastWeightEstimator: Send + Sync {
    fn name(&self) -> &str;

    /// Raw (unnormalized) weight per rule, given each rule's scaled forecast.
    fn estimate(
        &self,
        instrument: &str,
        forecasts: &BTreeMap<String, Arc<TimeSeries>>,
    ) -> Result<BTreeMap<String, f64>, String>;
}

/// Splits weight equally over every rule that produced any finite forecast.
#[derive(Debug, Clone, Copy, Default)]
pub struct EqualWeightEstimator;

impl ForecastWeightEstimator for EqualWeightEstimator {
    fn name(&self) -> &str {
        "equal"
    }

    fn estimate(
        &self,
        _instrument: &str,
        forecasts: &BTreeMap<String, Arc<TimeSeries>>,
    ) -> Result<BTreeMap<String, f64>, String> {
        let live: Vec<&String> = forecasts
            .iter()
            .filter(|(_, f)| f.count_finite() > 0)
            .map(|(name, _)| name)
            .collect();
        if live.is_empty() {
            return Err("no rule has any forecast data".into());
        }
        let w = 1.0 / live.len() as f64;
        Ok(live.into_iter().map(|name| (name.clone(), w)).collect())
    }
}

#[derive(Clone)]
pub struct ForecastCombine {
    estimator: Arc<dyn ForecastWeightEstimator>,
}

impl Default for ForecastCombine {
    fn default() -> Self {
        Self {
            estimator: Arc::new(EqualWeightEstimator),
        }
    }
}

impl fmt::Debug for ForecastCombine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ForecastCombine")
            .field("estimator", &self.estimator.name())
            .finish()
    }
}

impl ForecastCombine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_estimator(estimator: Arc<dyn ForecastWeightEstimator>) -> Self {
        Self { estimator }
    }

    /// Raw per-rule weights for `instrument`, before date-wise renormalization.
    fn raw_weights(&self, system: &System, instrument: &str) -> Result<BTreeMap<String, f64>, PipelineError> {
        let config = system.config();
        let configured = config.forecast_weights_for(instrument);
        if !config.use_forecast_weight_estimates {
            return Ok(configured);
        }

        let mut forecasts = BTreeMap::new();
        for rule in config.rule_names() {
            forecasts.insert(rule.to_string(), system.scaled_forecast(instrument, rule)?);
        }

        let estimated = self
            .estimator
            .estimate(instrument, &forecasts)
            .and_then(|weights| check_estimate(weights, &forecasts));
        match estimated {
            Ok(weights) => Ok(weights),
            Err(reason) => {
                warn!(
                    instrument,
                    estimator = self.estimator.name(),
                    %reason,
                    "forecast weight estimate rejected, using configured weights"
                );
                Ok(configured)
            }
        }
    }

    /// Date-wise normalized weights on the price index, one series per rule.
    fn weights(&self, system: &System, instrument: &str) -> Result<BTreeMap<String, TimeSeries>, PipelineError> {
        let raw = self.raw_weights(system, instrument)?;
        let price = system.daily_prices(instrument)?;
        let n = price.len();

        let mut forecasts = Vec::with_capacity(raw.len());
        for (rule, w) in &raw {
            let f = if *w > 0.0 {
                Some(system.scaled_forecast(instrument, rule)?)
            } else {
                None
            };
            forecasts.push((rule, *w, f));
        }

        let mut totals = vec![0.0; n];
        for (_, w, f) in &forecasts {
            if let Some(f) = f {
                for (total, v) in totals.iter_mut().zip(f.values()) {
                    if v.is_finite() {
                        *total += w;
                    }
                }
            }
        }

        let frame = forecasts
            .iter()
            .map(|(rule, w, f)| {
                let values = (0..n)
                    .map(|t| {
                        if totals[t] <= 0.0 {
                            return f64::NAN;
                        }
                        match f {
                            Some(f) if f.values()[t].is_finite() => w / totals[t],
                            _ => 0.0,
                        }
                    })
                    .collect();
                ((*rule).clone(), price.with_values(values))
            })
            .collect();
        Ok(frame)
    }

    fn combined(&self, system: &System, instrument: &str) -> Result<TimeSeries, PipelineError> {
        let config = system.config();
        let weights = system.forecast_weights(instrument)?;
        let price = system.daily_prices(instrument)?;

        let mut sum = vec![f64::NAN; price.len()];
        for (rule, w) in weights.iter() {
            if !w.values().iter().any(|v| *v > 0.0) {
                continue;
            }
            let forecast = system.scaled_forecast(instrument, rule)?;
            for (t, (s, wt)) in sum.iter_mut().zip(w.values()).enumerate() {
                if wt.is_nan() {
                    continue;
                }
                let f = forecast.values()[t];
                if *wt > 0.0 && f.is_finite() {
                    *s = if s.is_nan() { wt * f } else { *s + wt * f };
                } else if s.is_nan() {
                    *s = 0.0;
                }
            }
        }

        let cap = config.forecast_cap;
        Ok(price
            .with_values(sum)
            .scale(config.forecast_div_multiplier)
            .clip(-cap, cap))
    }
}

/// Estimator output must name known rules with usable weights.
fn check_estimate(
    weights: BTreeMap<String, f64>,
    forecasts: &BTreeMap<String, Arc<TimeSeries>>,
) -> Result<BTreeMap<String, f64>, String> {
    for (rule, w) in &weights {
        if !forecasts.contains_key(rule) {
            return Err(format!("unknown rule '{rule}'"));
        }
        if !(w.is_finite() && *w >= 0.0) {
            return Err(format!("weight {w} for '{rule}' is not a non-negative number"));
        }
    }
    if weights.values().sum::<f64>() <= 0.0 {
        return Err("weights sum to zero".into());
    }
    Ok(weights)
}

impl Stage for ForecastCombine {
    fn name(&self) -> &'static str {
        NAME
    }

    fn methods(&self) -> &'static [&'static str] {
        METHODS
    }

    fn compute(&self, system: &System, key: &CacheKey) -> Result<StageOutput, PipelineError> {
        let instrument = key.require_instrument()?;
        match key.method.as_str() {
            FORECAST_WEIGHTS => Ok(StageOutput::frame(self.weights(system, instrument)?)),
            COMBINED_FORECAST => Ok(StageOutput::series(self.combined(system, instrument)?)),
            _ => Err(PipelineError::unknown_method(key)),
        }
    }
}
