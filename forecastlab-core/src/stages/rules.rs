//! Raw forecasts from the configured trading rules.

use tracing::warn;

use crate::cache::CacheKey;
use crate::config::ConfigError;
use crate::error::PipelineError;
use crate::rules::{RuleInput, RuleInputs, RuleOutcome};
use crate::series::TimeSeries;
use crate::stage::{Stage, StageOutput};
use crate::system::System;

pub const NAME: &str = "rules";
pub const RAW_FORECAST: &str = "raw_forecast";

const METHODS: &[&str] = &[RAW_FORECAST];

/// Evaluates rules and aligns the result to the instrument's price dates.
///
/// A rule that fails or reports degenerate input contributes a zero
/// forecast; the failure is logged and the rest of the pipeline carries on.
#[derive(Debug, Clone, Copy, Default)]
pub struct Rules;

impl Stage for Rules {
    fn name(&self) -> &'static str {
        NAME
    }

    fn methods(&self) -> &'static [&'static str] {
        METHODS
    }

    fn compute(&self, system: &System, key: &CacheKey) -> Result<StageOutput, PipelineError> {
        let instrument = key.require_instrument()?;
        let rule_name = key.require_rule()?;
        let rule = system
            .config()
            .rule(rule_name)
            .ok_or_else(|| ConfigError::UnknownRule {
                field: "trading_rules".into(),
                rule: rule_name.to_string(),
            })?;

        let price = system.daily_prices(instrument)?;
        let raw_carry = if rule.needs(RuleInput::RawCarry) {
            Some(system.raw_carry(instrument)?)
        } else {
            None
        };
        let inputs = RuleInputs {
            instrument,
            price: rule.needs(RuleInput::Price).then_some(price.as_ref()),
            raw_carry: raw_carry.as_deref(),
        };

        let forecast = match rule.evaluate(rule_name, &inputs) {
            Ok(RuleOutcome::Forecast(forecast)) => forecast.reindex_forward_fill(price.index()),
            Ok(RuleOutcome::Degenerate { reason, .. }) => {
                warn!(instrument, rule = rule_name, %reason, "degenerate rule input, using zero forecast");
                TimeSeries::constant(price.index(), 0.0)
            }
            Err(e) => {
                warn!(instrument, rule = rule_name, reason = %e.reason, "rule failed, using zero forecast");
                TimeSeries::constant(price.index(), 0.0)
            }
        };

        Ok(StageOutput::series(forecast))
    }
}
