//! ForecastLab Core: a staged, cached forecasting and backtest pipeline.
//!
//! Raw instrument prices and carry flow through named stages:
//! - RawData: bounded prices, returns, robust volatility
//! - Rules: trading-rule forecasts (EWMAC, carry, custom closures)
//! - ForecastScaleCap / ForecastCombine: scaled, capped, weighted forecasts
//! - PositionSizing / Portfolios: volatility-targeted positions
//! - Account: P&L curves per instrument, per rule and for the portfolio
//!
//! The [`System`] owns the configuration, data source, stage registry and
//! cache; every value is requested through it and computed at most once.

pub mod cache;
pub mod config;
pub mod curve;
pub mod data_source;
pub mod error;
pub mod rules;
pub mod series;
pub mod stage;
pub mod stages;
pub mod stats;
pub mod system;
pub mod volatility;

#[cfg(test)]
mod test_support;

pub use cache::{CacheKey, CacheStats};
pub use config::{Config, ConfigBuilder, ConfigError, RuleSpec};
pub use curve::{AccountCurve, PnlSeries};
pub use data_source::{DataError, DataSource, InMemoryData};
pub use error::PipelineError;
pub use rules::{RuleInput, RuleInputs, RuleOutcome, TradingRule};
pub use series::{SeriesError, TimeSeries};
pub use stage::{Stage, StageOutput};
pub use stages::standard_stages;
pub use stats::CurveStats;
pub use system::System;
