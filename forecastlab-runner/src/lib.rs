//! ForecastLab Runner: everything around the core pipeline needed to run it.
//!
//! This crate builds on `forecastlab-core` to provide:
//! - TOML configuration files
//! - CSV and seeded synthetic market data
//! - A pipeline builder wiring the standard stages
//! - Parallel per-instrument runs with serializable summaries
//! - BLAKE3 fingerprints of configurations and data

pub mod builder;
pub mod config_file;
pub mod csv_data;
pub mod fingerprint;
pub mod runner;
pub mod synthetic;

pub use builder::{BuildError, PipelineBuilder};
pub use config_file::{ConfigFile, ConfigFileError, SystemSection};
pub use csv_data::CsvDataSource;
pub use fingerprint::{config_fingerprint, series_hash};
pub use runner::{
    run_config_file, run_instruments, InstrumentSummary, RunError, RunSummary, SCHEMA_VERSION,
};
pub use synthetic::{synthetic_carry, synthetic_data, synthetic_prices};
