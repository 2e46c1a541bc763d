//! Runs a built [`System`] across its instruments and summarizes the result.
//!
//! Instruments are evaluated in parallel with rayon when asked to; the
//! shared stage cache makes the portfolio step that follows a pure lookup.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use chrono::NaiveDate;
use rayon::prelude::*;
use serde::Serialize;
use thiserror::Error;
use tracing::info;

use forecastlab_core::{CacheStats, CurveStats, DataSource, PipelineError, System};

use crate::builder::{BuildError, PipelineBuilder};
use crate::config_file::{ConfigFile, ConfigFileError};
use crate::fingerprint::{config_fingerprint, series_hash};

/// Current schema version of [`RunSummary`].
pub const SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Error)]
pub enum RunError {
    #[error("config file error: {0}")]
    ConfigFile(#[from] ConfigFileError),
    #[error("build error: {0}")]
    Build(#[from] BuildError),
    #[error("pipeline error: {0}")]
    Pipeline(#[from] PipelineError),
    #[error("summary serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Serialize)]
pub struct InstrumentSummary {
    pub instrument: String,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub observations: usize,
    /// BLAKE3 of the bounded price series.
    pub data_hash: String,
    pub instrument_weight: f64,
    pub final_combined_forecast: Option<f64>,
    pub final_position: Option<f64>,
    /// Percent-of-capital P&L of the weighted position.
    pub stats: CurveStats,
    /// Percent-of-capital P&L of each rule traded alone.
    pub rules: BTreeMap<String, CurveStats>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub schema_version: u32,
    pub config_fingerprint: String,
    pub data_source: String,
    pub base_currency: String,
    pub capital: f64,
    pub instruments: Vec<InstrumentSummary>,
    pub portfolio: CurveStats,
    pub cache: CacheStats,
}

impl RunSummary {
    pub fn to_json(&self) -> Result<String, RunError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

fn summarize_instrument(system: &System, code: &str) -> Result<InstrumentSummary, PipelineError> {
    let prices = system.daily_prices(code)?;
    let pandl = system.pandl_for_instrument(code)?;
    let combined = system.combined_forecast(code)?;
    let position = system.notional_position(code)?;

    let mut rules = BTreeMap::new();
    for rule in system.config().rule_names() {
        let curve = system.pandl_for_instrument_forecast(code, rule)?;
        rules.insert(rule.to_string(), curve.percent.stats());
    }

    let summary = InstrumentSummary {
        instrument: code.to_string(),
        start_date: prices.first_date(),
        end_date: prices.last_date(),
        observations: prices.len(),
        data_hash: series_hash(&prices),
        instrument_weight: system.config().instrument_weight(code),
        final_combined_forecast: combined.last_value().filter(|v| v.is_finite()),
        final_position: position.last_value().filter(|v| v.is_finite()),
        stats: pandl.percent.stats(),
        rules,
    };
    info!(
        instrument = code,
        observations = summary.observations,
        sharpe = summary.stats.sharpe,
        "instrument complete"
    );
    Ok(summary)
}

/// Evaluate every configured instrument, then the portfolio.
///
/// The first failing instrument aborts the run. Parallel and sequential
/// runs produce identical summaries.
pub fn run_instruments(system: &System, parallel: bool) -> Result<RunSummary, RunError> {
    let codes = system.instruments();
    info!(
        instruments = codes.len(),
        parallel,
        data = system.data().name(),
        "starting run"
    );

    let instruments: Vec<InstrumentSummary> = if parallel {
        codes
            .par_iter()
            .map(|code| summarize_instrument(system, code))
            .collect::<Result<Vec<_>, _>>()?
    } else {
        codes
            .iter()
            .map(|code| summarize_instrument(system, code))
            .collect::<Result<Vec<_>, _>>()?
    };

    let portfolio = system.portfolio_pandl()?.percent.stats();
    let config = system.config();
    let summary = RunSummary {
        schema_version: SCHEMA_VERSION,
        config_fingerprint: config_fingerprint(config),
        data_source: system.data().name().to_string(),
        base_currency: config.base_currency.clone(),
        capital: config.notional_trading_capital,
        instruments,
        portfolio,
        cache: system.cache_stats(),
    };
    info!(
        sharpe = summary.portfolio.sharpe,
        total_pct = summary.portfolio.total,
        cache_entries = summary.cache.entries,
        "run complete"
    );
    Ok(summary)
}

/// Load `config_path` and run it against `data`.
pub fn run_config_file(
    config_path: &Path,
    data: Arc<dyn DataSource>,
    parallel: bool,
) -> Result<RunSummary, RunError> {
    let file = ConfigFile::from_file(config_path)?;
    let system = PipelineBuilder::from_config_file(&file)
        .shared_data(data)
        .build()?;
    run_instruments(&system, parallel)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::synthetic::synthetic_data;
    use forecastlab_core::rules::CarryParams;
    use forecastlab_core::TradingRule;

    fn system() -> System {
        let codes: Vec<String> = ["SOFR", "US10", "BUND"].iter().map(|s| s.to_string()).collect();
        let start = NaiveDate::from_ymd_opt(2018, 1, 1).unwrap();
        let end = NaiveDate::from_ymd_opt(2021, 12, 31).unwrap();
        PipelineBuilder::new()
            .instruments(codes.clone())
            .rule("ewmac8", TradingRule::ewmac(8, Some(32)))
            .rule("carry", TradingRule::carry(CarryParams::default()))
            .forecast_scalar("ewmac8", 5.3)
            .forecast_scalar("carry", 30.0)
            .data(synthetic_data(&codes, start, end))
            .build()
            .unwrap()
    }

    #[test]
    fn summary_covers_every_instrument_and_rule() {
        let summary = run_instruments(&system(), false).unwrap();
        assert_eq!(summary.schema_version, SCHEMA_VERSION);
        let names: Vec<&str> = summary.instruments.iter().map(|i| i.instrument.as_str()).collect();
        assert_eq!(names, vec!["SOFR", "US10", "BUND"]);
        for inst in &summary.instruments {
            assert_eq!(inst.rules.len(), 2);
            assert!((inst.instrument_weight - 1.0 / 3.0).abs() < 1e-12);
            assert_eq!(inst.data_hash.len(), 64);
            assert!(inst.final_position.is_some());
        }
        assert!(summary.cache.entries > 0);
        assert_eq!(summary.data_source, "in-memory");
    }

    #[test]
    fn parallel_matches_sequential() {
        let seq = run_instruments(&system(), false).unwrap();
        let par = run_instruments(&system(), true).unwrap();
        assert_eq!(seq.config_fingerprint, par.config_fingerprint);
        for (a, b) in seq.instruments.iter().zip(&par.instruments) {
            assert_eq!(a.data_hash, b.data_hash);
            assert_eq!(a.stats.total.to_bits(), b.stats.total.to_bits());
            assert_eq!(a.final_position.map(f64::to_bits), b.final_position.map(f64::to_bits));
        }
        assert_eq!(seq.portfolio.total.to_bits(), par.portfolio.total.to_bits());
        assert_eq!(seq.cache.entries, par.cache.entries);
    }

    #[test]
    fn summary_serializes_to_json() {
        let json = run_instruments(&system(), true).unwrap().to_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["instruments"].as_array().unwrap().len(), 3);
        assert!(value["config_fingerprint"].is_string());
    }

    #[test]
    fn second_run_is_served_from_cache() {
        let system = system();
        run_instruments(&system, true).unwrap();
        let misses = system.cache_stats().misses;
        run_instruments(&system, false).unwrap();
        assert_eq!(system.cache_stats().misses, misses);
    }
}
