//! Pipeline-level error type.

use thiserror::Error;

use crate::cache::CacheKey;
use crate::config::ConfigError;
use crate::rules::RuleComputationError;
use crate::series::SeriesError;

#[derive(Debug, Error)]
pub enum PipelineError {
    /// Missing or unreadable market data. Always propagated to the caller.
    #[error("data unavailable for {instrument}: {reason}")]
    DataUnavailable { instrument: String, reason: String },

    #[error(transparent)]
    RuleComputation(#[from] RuleComputationError),

    #[error("configuration error: {0}")]
    Configuration(#[from] ConfigError),

    #[error("numeric degeneracy in {context}: {reason}")]
    NumericDegeneracy { context: String, reason: String },

    #[error("unknown stage '{0}'")]
    UnknownStage(String),

    #[error("stage '{stage}' has no method '{method}'")]
    UnknownMethod { stage: String, method: String },

    #[error("stage '{0}' registered more than once")]
    DuplicateStage(String),

    #[error("request {key} is missing its {part}")]
    IncompleteKey { key: String, part: &'static str },

    #[error("{key} produced a {found}, expected a {expected}")]
    UnexpectedOutput {
        key: String,
        expected: &'static str,
        found: &'static str,
    },

    #[error(transparent)]
    Series(#[from] SeriesError),
}

impl PipelineError {
    pub fn data_unavailable(instrument: &str, reason: impl ToString) -> Self {
        Self::DataUnavailable {
            instrument: instrument.to_string(),
            reason: reason.to_string(),
        }
    }

    pub fn unknown_method(key: &CacheKey) -> Self {
        Self::UnknownMethod {
            stage: key.stage.clone(),
            method: key.method.clone(),
        }
    }
}
