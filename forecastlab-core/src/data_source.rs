//! Market data source trait and an in-memory implementation.
//!
//! The pipeline only ever reads through [`DataSource`], so CSV files,
//! synthetic generators and test fixtures are interchangeable.

use std::collections::BTreeMap;

use thiserror::Error;

use crate::series::TimeSeries;

#[derive(Debug, Error)]
pub enum DataError {
    #[error("unknown instrument: {0}")]
    UnknownInstrument(String),

    #[error("malformed data for {instrument}: {reason}")]
    Malformed { instrument: String, reason: String },

    #[error("I/O error reading {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Read-only provider of per-instrument series.
///
/// Unknown codes are an error; a known instrument without a given series
/// returns an empty one.
pub trait DataSource: Send + Sync {
    /// Short label for logs.
    fn name(&self) -> &str;

    fn instrument_codes(&self) -> Vec<String>;

    fn daily_prices(&self, code: &str) -> Result<TimeSeries, DataError>;

    fn get_instrument_raw_carry_data(&self, code: &str) -> Result<TimeSeries, DataError>;
}

#[derive(Debug, Clone, Default)]
struct InstrumentData {
    prices: TimeSeries,
    raw_carry: TimeSeries,
}

/// Series held in memory; used by tests and by the synthetic generator.
#[derive(Debug, Clone, Default)]
pub struct InMemoryData {
    instruments: BTreeMap<String, InstrumentData>,
}

impl InMemoryData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_prices(mut self, code: impl Into<String>, prices: TimeSeries) -> Self {
        self.instruments.entry(code.into()).or_default().prices = prices;
        self
    }

    pub fn with_carry(mut self, code: impl Into<String>, raw_carry: TimeSeries) -> Self {
        self.instruments.entry(code.into()).or_default().raw_carry = raw_carry;
        self
    }

    pub fn insert_prices(&mut self, code: impl Into<String>, prices: TimeSeries) {
        self.instruments.entry(code.into()).or_default().prices = prices;
    }

    pub fn insert_carry(&mut self, code: impl Into<String>, raw_carry: TimeSeries) {
        self.instruments.entry(code.into()).or_default().raw_carry = raw_carry;
    }

    fn lookup(&self, code: &str) -> Result<&InstrumentData, DataError> {
        self.instruments
            .get(code)
            .ok_or_else(|| DataError::UnknownInstrument(code.to_string()))
    }
}

impl DataSource for InMemoryData {
    fn name(&self) -> &str {
        "in-memory"
    }

    fn instrument_codes(&self) -> Vec<String> {
        self.instruments.keys().cloned().collect()
    }

    fn daily_prices(&self, code: &str) -> Result<TimeSeries, DataError> {
        Ok(self.lookup(code)?.prices.clone())
    }

    fn get_instrument_raw_carry_data(&self, code: &str) -> Result<TimeSeries, DataError> {
        Ok(self.lookup(code)?.raw_carry.clone())
    }
}
