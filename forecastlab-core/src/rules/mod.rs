//! Trading rules: pure functions from input series to a raw forecast.
//!
//! A [`TradingRule`] is a closed set of built-in kinds (EWMAC, carry) plus a
//! [`CustomRule`] escape hatch carrying a named closure. Rules hold no state;
//! building one never evaluates it.

pub mod carry;
pub mod ewmac;

use std::fmt;
use std::sync::Arc;

use thiserror::Error;

use crate::series::TimeSeries;

pub use carry::{carry_forecast, CarryError, CarryParams};
pub use ewmac::{ewmac_forecast, EwmacParams};

/// Signature of a user-supplied rule.
pub type RuleFn = dyn Fn(&RuleInputs<'_>) -> Result<TimeSeries, String> + Send + Sync;

/// A rule evaluation that could not produce any forecast.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("rule '{rule}' failed for {instrument}: {reason}")]
pub struct RuleComputationError {
    pub rule: String,
    pub instrument: String,
    pub reason: String,
}

/// Series a rule may ask the Rules stage to gather for it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RuleInput {
    Price,
    RawCarry,
}

/// Inputs handed to a rule. Only the declared inputs are populated.
#[derive(Debug, Clone, Copy)]
pub struct RuleInputs<'a> {
    pub instrument: &'a str,
    pub price: Option<&'a TimeSeries>,
    pub raw_carry: Option<&'a TimeSeries>,
}

impl<'a> RuleInputs<'a> {
    pub fn price(&self) -> Result<&'a TimeSeries, String> {
        self.price.ok_or_else(|| "price input not supplied".to_string())
    }

    pub fn raw_carry(&self) -> Result<&'a TimeSeries, String> {
        self.raw_carry
            .ok_or_else(|| "raw carry input not supplied".to_string())
    }
}

/// Result of a successful rule evaluation.
#[derive(Debug, Clone, PartialEq)]
pub enum RuleOutcome {
    Forecast(TimeSeries),
    /// The rule recognised bad input and fell back to a flat forecast.
    Degenerate { forecast: TimeSeries, reason: String },
}

impl RuleOutcome {
    pub fn series(&self) -> &TimeSeries {
        match self {
            RuleOutcome::Forecast(s) => s,
            RuleOutcome::Degenerate { forecast, .. } => forecast,
        }
    }

    pub fn is_degenerate(&self) -> bool {
        matches!(self, RuleOutcome::Degenerate { .. })
    }
}

/// Named closure rule.
#[derive(Clone)]
pub struct CustomRule {
    pub name: String,
    pub inputs: Vec<RuleInput>,
    pub func: Arc<RuleFn>,
}

impl fmt::Debug for CustomRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CustomRule")
            .field("name", &self.name)
            .field("inputs", &self.inputs)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone)]
pub enum RuleKind {
    Ewmac(EwmacParams),
    Carry(CarryParams),
    Custom(CustomRule),
}

/// A forecast rule together with the inputs it consumes.
#[derive(Debug, Clone)]
pub struct TradingRule {
    kind: RuleKind,
    inputs: Vec<RuleInput>,
}

impl TradingRule {
    /// EWMA crossover; `lslow` defaults to `4 * lfast`.
    pub fn ewmac(lfast: usize, lslow: Option<usize>) -> Self {
        Self {
            kind: RuleKind::Ewmac(EwmacParams::new(lfast, lslow)),
            inputs: vec![RuleInput::Price],
        }
    }

    pub fn carry(params: CarryParams) -> Self {
        Self {
            kind: RuleKind::Carry(params),
            inputs: vec![RuleInput::RawCarry],
        }
    }

    pub fn custom<F>(name: impl Into<String>, inputs: Vec<RuleInput>, func: F) -> Self
    where
        F: Fn(&RuleInputs<'_>) -> Result<TimeSeries, String> + Send + Sync + 'static,
    {
        Self {
            inputs: inputs.clone(),
            kind: RuleKind::Custom(CustomRule {
                name: name.into(),
                inputs,
                func: Arc::new(func),
            }),
        }
    }

    pub fn kind(&self) -> &RuleKind {
        &self.kind
    }

    pub fn inputs(&self) -> &[RuleInput] {
        &self.inputs
    }

    pub fn needs(&self, input: RuleInput) -> bool {
        self.inputs.contains(&input)
    }

    /// Short human label, e.g. `ewmac(8,32)`.
    pub fn describe(&self) -> String {
        match &self.kind {
            RuleKind::Ewmac(p) => format!("ewmac({},{})", p.lfast, p.lslow),
            RuleKind::Carry(p) => format!("carry({},{})", p.smooth_days, p.vol_days),
            RuleKind::Custom(c) => format!("custom({})", c.name),
        }
    }

    /// Reject parameter combinations that can never yield a forecast.
    pub fn validate(&self) -> Result<(), String> {
        match &self.kind {
            RuleKind::Ewmac(p) => p.validate(),
            RuleKind::Carry(p) => p.validate(),
            RuleKind::Custom(c) if c.name.trim().is_empty() => {
                Err("custom rule name must not be empty".into())
            }
            RuleKind::Custom(_) => Ok(()),
        }
    }

    /// Evaluate the rule for one instrument.
    pub fn evaluate(
        &self,
        rule_name: &str,
        inputs: &RuleInputs<'_>,
    ) -> Result<RuleOutcome, RuleComputationError> {
        let fail = |reason: String| RuleComputationError {
            rule: rule_name.to_string(),
            instrument: inputs.instrument.to_string(),
            reason,
        };

        match &self.kind {
            RuleKind::Ewmac(p) => {
                let price = inputs.price().map_err(fail)?;
                if price.is_empty() {
                    return Err(fail("empty price series".into()));
                }
                Ok(RuleOutcome::Forecast(ewmac_forecast(price, p)))
            }
            RuleKind::Carry(p) => {
                let raw = inputs.raw_carry().map_err(fail)?;
                match carry_forecast(raw, p) {
                    Ok(forecast) => Ok(RuleOutcome::Forecast(forecast)),
                    Err(e) => Ok(RuleOutcome::Degenerate {
                        forecast: TimeSeries::constant(raw.index(), 0.0),
                        reason: format!("{}: {e}", inputs.instrument),
                    }),
                }
            }
            RuleKind::Custom(c) => (c.func)(inputs).map(RuleOutcome::Forecast).map_err(fail),
        }
    }
}
