//! Date-indexed numeric series.
//!
//! A `TimeSeries` pairs a strictly increasing `NaiveDate` index with one
//! `f64` per date. `NaN` marks an absent value (warmup, history not yet
//! started, undefined ratio). Every pipeline quantity (prices, raw carry,
//! forecasts, positions, P&L) is a `TimeSeries`.
//!
//! Operations never mutate in place; each returns a new series.

pub mod calendar;
pub mod ewm;
pub mod rolling;

use chrono::NaiveDate;
use thiserror::Error;

pub use calendar::{is_business_day, next_business_day};

/// Errors from constructing or combining series.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SeriesError {
    #[error("index and values differ in length ({index} dates, {values} values)")]
    LengthMismatch { index: usize, values: usize },

    #[error("index is not strictly increasing at position {position} ({date})")]
    Unordered { position: usize, date: NaiveDate },

    #[error("series are on different indices ({left} vs {right} dates)")]
    IndexMismatch { left: usize, right: usize },
}

/// Time-ordered sequence of `(date, value)` observations.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TimeSeries {
    index: Vec<NaiveDate>,
    values: Vec<f64>,
}

impl TimeSeries {
    /// Build a series, validating equal lengths and a strictly increasing index.
    pub fn new(index: Vec<NaiveDate>, values: Vec<f64>) -> Result<Self, SeriesError> {
        if index.len() != values.len() {
            return Err(SeriesError::LengthMismatch {
                index: index.len(),
                values: values.len(),
            });
        }
        if let Some(position) = index.windows(2).position(|w| w[0] >= w[1]) {
            return Err(SeriesError::Unordered {
                position: position + 1,
                date: index[position + 1],
            });
        }
        Ok(Self { index, values })
    }

    /// Build a series from `(date, value)` pairs (must already be in date order).
    pub fn from_pairs(pairs: impl IntoIterator<Item = (NaiveDate, f64)>) -> Result<Self, SeriesError> {
        let (index, values): (Vec<NaiveDate>, Vec<f64>) = pairs.into_iter().unzip();
        Self::new(index, values)
    }

    pub fn empty() -> Self {
        Self::default()
    }

    /// A series holding `value` at every date of `index`.
    pub fn constant(index: &[NaiveDate], value: f64) -> Self {
        Self {
            index: index.to_vec(),
            values: vec![value; index.len()],
        }
    }

    /// Same index as `self`, new values. Caller guarantees the length.
    pub(crate) fn with_values(&self, values: Vec<f64>) -> Self {
        debug_assert_eq!(values.len(), self.index.len());
        Self {
            index: self.index.clone(),
            values,
        }
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn index(&self) -> &[NaiveDate] {
        &self.index
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn iter(&self) -> impl Iterator<Item = (NaiveDate, f64)> + '_ {
        self.index.iter().copied().zip(self.values.iter().copied())
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.index.first().copied()
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.index.last().copied()
    }

    /// Date of the first non-NaN value.
    pub fn first_valid_date(&self) -> Option<NaiveDate> {
        self.iter().find(|(_, v)| !v.is_nan()).map(|(d, _)| d)
    }

    /// Value stored at exactly `date`.
    pub fn get(&self, date: NaiveDate) -> Option<f64> {
        self.index
            .binary_search(&date)
            .ok()
            .map(|i| self.values[i])
    }

    pub fn last_value(&self) -> Option<f64> {
        self.values.last().copied()
    }

    /// Number of finite values.
    pub fn count_finite(&self) -> usize {
        self.values.iter().filter(|v| v.is_finite()).count()
    }

    /// Bitwise equality, treating identical NaN payloads as equal.
    pub fn bitwise_eq(&self, other: &TimeSeries) -> bool {
        self.index == other.index
            && self.values.len() == other.values.len()
            && self
                .values
                .iter()
                .zip(&other.values)
                .all(|(a, b)| a.to_bits() == b.to_bits())
    }

    // ─── Elementwise ─────────────────────────────────────────────────

    pub fn map(&self, mut f: impl FnMut(f64) -> f64) -> Self {
        self.with_values(self.values.iter().map(|&v| f(v)).collect())
    }

    pub fn scale(&self, factor: f64) -> Self {
        self.map(|v| v * factor)
    }

    pub fn abs(&self) -> Self {
        self.map(f64::abs)
    }

    /// Clamp to `[lo, hi]`; NaN stays NaN.
    pub fn clip(&self, lo: f64, hi: f64) -> Self {
        self.map(|v| if v.is_nan() { v } else { v.clamp(lo, hi) })
    }

    /// Replace NaN with `value`.
    pub fn fillna(&self, value: f64) -> Self {
        self.map(|v| if v.is_nan() { value } else { v })
    }

    /// Combine two series on an identical index.
    pub fn zip_with(
        &self,
        other: &TimeSeries,
        f: impl Fn(f64, f64) -> f64,
    ) -> Result<Self, SeriesError> {
        if self.index != other.index {
            return Err(SeriesError::IndexMismatch {
                left: self.len(),
                right: other.len(),
            });
        }
        Ok(self.with_values(
            self.values
                .iter()
                .zip(&other.values)
                .map(|(&a, &b)| f(a, b))
                .collect(),
        ))
    }

    /// First difference; the first value is NaN.
    pub fn diff(&self) -> Self {
        let mut out = vec![f64::NAN; self.len()];
        for i in 1..self.len() {
            out[i] = self.values[i] - self.values[i - 1];
        }
        self.with_values(out)
    }

    /// Lag values by `periods` observations, padding the front with NaN.
    pub fn shift(&self, periods: usize) -> Self {
        let n = self.len();
        let mut out = vec![f64::NAN; n];
        for i in periods..n {
            out[i] = self.values[i - periods];
        }
        self.with_values(out)
    }

    // ─── Alignment ───────────────────────────────────────────────────

    /// Restrict to `start..=end` (either bound optional).
    pub fn between(&self, start: Option<NaiveDate>, end: Option<NaiveDate>) -> Self {
        let (index, values): (Vec<NaiveDate>, Vec<f64>) = self
            .iter()
            .filter(|(d, _)| start.map_or(true, |s| *d >= s) && end.map_or(true, |e| *d <= e))
            .unzip();
        Self { index, values }
    }

    /// Move onto `target` taking the last non-NaN value dated on or before each
    /// target date. Target dates before the first observation stay NaN.
    pub fn reindex_forward_fill(&self, target: &[NaiveDate]) -> Self {
        let mut values = Vec::with_capacity(target.len());
        let mut j = 0;
        let mut last = f64::NAN;
        for &date in target {
            while j < self.index.len() && self.index[j] <= date {
                if !self.values[j].is_nan() {
                    last = self.values[j];
                }
                j += 1;
            }
            values.push(last);
        }
        Self {
            index: target.to_vec(),
            values,
        }
    }

    /// Move onto `target` by exact date match; unmatched dates get `fill`.
    pub fn reindex_exact(&self, target: &[NaiveDate], fill: f64) -> Self {
        let values = target
            .iter()
            .map(|d| self.get(*d).unwrap_or(fill))
            .collect();
        Self {
            index: target.to_vec(),
            values,
        }
    }

    /// Replace NaN with the previous non-NaN value (leading NaN stay).
    pub fn ffill(&self) -> Self {
        let mut last = f64::NAN;
        self.map(|v| {
            if !v.is_nan() {
                last = v;
            }
            last
        })
    }

    /// Replace leading NaN with the first non-NaN value.
    pub fn backfill_leading(&self) -> Self {
        let Some(first) = self.values.iter().copied().find(|v| !v.is_nan()) else {
            return self.clone();
        };
        let mut seen = false;
        self.map(|v| {
            if !v.is_nan() {
                seen = true;
            }
            if seen {
                v
            } else {
                first
            }
        })
    }

    /// Sorted union of the indices of `series`.
    pub fn union_index<'a>(series: impl IntoIterator<Item = &'a TimeSeries>) -> Vec<NaiveDate> {
        let mut dates: Vec<NaiveDate> = series
            .into_iter()
            .flat_map(|s| s.index.iter().copied())
            .collect();
        dates.sort_unstable();
        dates.dedup();
        dates
    }

    // ─── Calendar & window statistics ────────────────────────────────

    /// One value per business day between the first and last observation;
    /// see [`calendar::resample_to_business_days`].
    pub fn resample_to_business_days(&self) -> Self {
        let (index, values) = calendar::resample_to_business_days(&self.index, &self.values);
        Self { index, values }
    }

    /// Exponentially weighted moving average; see [`ewm::ewma`].
    pub fn ewma(&self, span: usize) -> Self {
        self.with_values(ewm::ewma(&self.values, span))
    }

    /// Exponentially weighted standard deviation; see [`ewm::ewm_std`].
    pub fn ewm_std(&self, span: usize, min_periods: usize) -> Self {
        self.with_values(ewm::ewm_std(&self.values, span, min_periods))
    }

    pub fn rolling_quantile(&self, window: usize, min_periods: usize, quantile: f64) -> Self {
        self.with_values(rolling::rolling_quantile(
            &self.values,
            window,
            min_periods,
            quantile,
        ))
    }

    pub fn expanding_mean(&self, min_periods: usize) -> Self {
        self.with_values(rolling::expanding_mean(&self.values, min_periods))
    }
}
