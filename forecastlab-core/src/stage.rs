//! The stage abstraction: a named group of cached computations.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::cache::CacheKey;
use crate::curve::AccountCurve;
use crate::error::PipelineError;
use crate::series::TimeSeries;
use crate::system::System;

/// Output of a stage method. Cheap to clone; the cache hands out shared
/// references to the same allocation.
#[derive(Debug, Clone)]
pub enum StageOutput {
    Series(Arc<TimeSeries>),
    /// Named series on a shared index, e.g. per-rule weights.
    Frame(Arc<BTreeMap<String, TimeSeries>>),
    Curve(Arc<AccountCurve>),
}

impl StageOutput {
    pub fn series(series: TimeSeries) -> Self {
        Self::Series(Arc::new(series))
    }

    pub fn frame(frame: BTreeMap<String, TimeSeries>) -> Self {
        Self::Frame(Arc::new(frame))
    }

    pub fn curve(curve: AccountCurve) -> Self {
        Self::Curve(Arc::new(curve))
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Series(_) => "series",
            Self::Frame(_) => "frame",
            Self::Curve(_) => "curve",
        }
    }

    pub fn into_series(self, key: &CacheKey) -> Result<Arc<TimeSeries>, PipelineError> {
        match self {
            Self::Series(s) => Ok(s),
            other => Err(other.mismatch(key, "series")),
        }
    }

    pub fn into_frame(self, key: &CacheKey) -> Result<Arc<BTreeMap<String, TimeSeries>>, PipelineError> {
        match self {
            Self::Frame(f) => Ok(f),
            other => Err(other.mismatch(key, "frame")),
        }
    }

    pub fn into_curve(self, key: &CacheKey) -> Result<Arc<AccountCurve>, PipelineError> {
        match self {
            Self::Curve(c) => Ok(c),
            other => Err(other.mismatch(key, "curve")),
        }
    }

    fn mismatch(&self, key: &CacheKey, expected: &'static str) -> PipelineError {
        PipelineError::UnexpectedOutput {
            key: key.to_string(),
            expected,
            found: self.kind(),
        }
    }
}

/// A pipeline step.
///
/// Stages never hold references to each other. Every cross-stage input is
/// requested through [`System::get`] (usually via its typed helpers), which
/// is what makes a stage replaceable by any other implementation that
/// registers under the same name and methods.
pub trait Stage: Send + Sync {
    /// Registry name, unique within a `System`.
    fn name(&self) -> &'static str;

    /// Method names this stage answers.
    fn methods(&self) -> &'static [&'static str];

    /// Compute `key.method` for the entity in `key`. Called at most once per
    /// key per `System` when it succeeds.
    fn compute(&self, system: &System, key: &CacheKey) -> Result<StageOutput, PipelineError>;
}
