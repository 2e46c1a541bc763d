//! Account curves: daily P&L of a position held against a price.

use std::ops::Deref;

use thiserror::Error;

use crate::error::PipelineError;
use crate::series::TimeSeries;
use crate::stats::CurveStats;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum CurveError {
    #[error("{label}: price series is empty")]
    EmptyPrice { label: String },

    #[error("{label}: position and price are on different indices")]
    Misaligned { label: String },

    #[error("{label}: capital must be positive, got {capital}")]
    NonPositiveCapital { label: String, capital: f64 },
}

impl From<CurveError> for PipelineError {
    fn from(e: CurveError) -> Self {
        let context = match &e {
            CurveError::EmptyPrice { label }
            | CurveError::Misaligned { label }
            | CurveError::NonPositiveCapital { label, .. } => label.clone(),
        };
        PipelineError::NumericDegeneracy {
            context,
            reason: e.to_string(),
        }
    }
}

/// Daily P&L series with summary statistics.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PnlSeries(TimeSeries);

impl PnlSeries {
    pub fn new(series: TimeSeries) -> Self {
        Self(series)
    }

    pub fn series(&self) -> &TimeSeries {
        &self.0
    }

    pub fn into_inner(self) -> TimeSeries {
        self.0
    }

    /// Running total.
    pub fn cumulative(&self) -> TimeSeries {
        let mut total = 0.0;
        self.0.map(|v| {
            total += v;
            total
        })
    }

    pub fn stats(&self) -> CurveStats {
        CurveStats::compute(self.0.values())
    }
}

impl Deref for PnlSeries {
    type Target = TimeSeries;

    fn deref(&self) -> &TimeSeries {
        &self.0
    }
}

/// P&L in account currency and as a percentage of capital.
#[derive(Debug, Clone, PartialEq)]
pub struct AccountCurve {
    pub label: String,
    pub capital: f64,
    pub currency: PnlSeries,
    pub percent: PnlSeries,
}

impl AccountCurve {
    /// Build from a currency P&L series.
    pub fn from_currency(
        label: impl Into<String>,
        currency: TimeSeries,
        capital: f64,
    ) -> Result<Self, CurveError> {
        let label = label.into();
        if !(capital.is_finite() && capital > 0.0) {
            return Err(CurveError::NonPositiveCapital { label, capital });
        }
        let percent = currency.scale(100.0 / capital);
        Ok(Self {
            label,
            capital,
            currency: PnlSeries::new(currency),
            percent: PnlSeries::new(percent),
        })
    }
}

/// P&L of holding `position` (instrument units, same index as `price`).
///
/// `pnl[t] = position[t-1] * (price[t] - price[t-1])`; the first day and any
/// day with an undefined position or price move contribute 0.
pub fn pandl_for_position(
    label: impl Into<String>,
    position: &TimeSeries,
    price: &TimeSeries,
    capital: f64,
) -> Result<AccountCurve, CurveError> {
    let label = label.into();
    if price.is_empty() {
        return Err(CurveError::EmptyPrice { label });
    }
    if position.index() != price.index() {
        return Err(CurveError::Misaligned { label });
    }

    let pos = position.values();
    let px = price.values();
    let mut pnl = vec![0.0; px.len()];
    for t in 1..px.len() {
        let v = pos[t - 1] * (px[t] - px[t - 1]);
        if v.is_finite() {
            pnl[t] = v;
        }
    }

    AccountCurve::from_currency(label, price.with_values(pnl), capital)
}
