//! Summary statistics of daily P&L, as pure functions over value slices.
//!
//! P&L is additive (currency or percent of capital per day), so drawdown is
//! measured on the running sum rather than on a compounded equity curve.
//! NaN entries are ignored throughout.

use serde::{Deserialize, Serialize};

use crate::volatility::{BUSINESS_DAYS_IN_YEAR, ROOT_BDAYS_IN_YEAR};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurveStats {
    pub count: usize,
    pub total: f64,
    pub mean: f64,
    pub std: f64,
    pub ann_mean: f64,
    pub ann_std: f64,
    pub sharpe: f64,
    /// Most negative peak-to-trough move of the cumulative P&L (≤ 0).
    pub max_drawdown: f64,
    /// Fraction of non-zero days that were positive.
    pub hit_rate: f64,
    pub skew: f64,
}

impl CurveStats {
    pub fn compute(pnl: &[f64]) -> Self {
        let values = finite(pnl);
        let m = mean(&values);
        let s = std_dev(&values);
        let ann_mean = m * BUSINESS_DAYS_IN_YEAR;
        let ann_std = s * ROOT_BDAYS_IN_YEAR;
        Self {
            count: values.len(),
            total: values.iter().sum(),
            mean: m,
            std: s,
            ann_mean,
            ann_std,
            sharpe: sharpe(ann_mean, ann_std),
            max_drawdown: max_drawdown(&values),
            hit_rate: hit_rate(&values),
            skew: skew(&values),
        }
    }
}

// ─── Individual statistics ──────────────────────────────────────────

fn finite(pnl: &[f64]) -> Vec<f64> {
    pnl.iter().copied().filter(|v| v.is_finite()).collect()
}

pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Sample standard deviation (n - 1). 0.0 for fewer than two values.
pub fn std_dev(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let m = mean(values);
    let var = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    var.sqrt()
}

/// Annualised mean over annualised volatility; 0.0 when volatility is nil.
pub fn sharpe(ann_mean: f64, ann_std: f64) -> f64 {
    if ann_std < 1e-15 {
        return 0.0;
    }
    ann_mean / ann_std
}

pub fn max_drawdown(pnl: &[f64]) -> f64 {
    let mut cum = 0.0;
    let mut peak = 0.0_f64;
    let mut worst = 0.0_f64;
    for v in pnl {
        cum += v;
        peak = peak.max(cum);
        worst = worst.min(cum - peak);
    }
    worst
}

pub fn hit_rate(pnl: &[f64]) -> f64 {
    let traded = pnl.iter().filter(|v| **v != 0.0).count();
    if traded == 0 {
        return 0.0;
    }
    pnl.iter().filter(|v| **v > 0.0).count() as f64 / traded as f64
}

/// Population skewness; 0.0 when undefined.
pub fn skew(values: &[f64]) -> f64 {
    let n = values.len();
    if n < 3 {
        return 0.0;
    }
    let m = mean(values);
    let m2 = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / n as f64;
    if m2 < 1e-30 {
        return 0.0;
    }
    let m3 = values.iter().map(|v| (v - m).powi(3)).sum::<f64>() / n as f64;
    m3 / m2.powf(1.5)
}
