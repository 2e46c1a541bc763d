//! Runner integration: config file + CSV directory + parallel run.

use std::path::Path;
use std::sync::Arc;

use chrono::NaiveDate;
use forecastlab_core::PipelineError;
use forecastlab_runner::csv_data::write_series;
use forecastlab_runner::{
    run_config_file, run_instruments, synthetic_carry, synthetic_prices, BuildError,
    ConfigFile, CsvDataSource, PipelineBuilder, RunError,
};

const CONFIG: &str = r#"
[system]
instruments = ["SOFR", "US10"]
percentage_vol_target = 20.0
notional_trading_capital = 250000.0

[rules.ewmac16]
type = "ewmac"
lfast = 16

[rules.carry]
type = "carry"

[forecast_scalars]
ewmac16 = 3.75
carry = 30.0

[instrument_weights]
SOFR = 0.7
US10 = 0.3
"#;

fn d(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).unwrap()
}

/// Writes synthetic CSVs for `codes` into `dir`; only the first gets carry.
fn populate(dir: &Path, codes: &[&str]) {
    let (start, end) = (d(2017, 1, 1), d(2020, 12, 31));
    for (i, code) in codes.iter().enumerate() {
        write_series(
            &dir.join(format!("{code}_price.csv")),
            &synthetic_prices(code, start, end),
        )
        .unwrap();
        if i == 0 {
            write_series(
                &dir.join(format!("{code}_carry.csv")),
                &synthetic_carry(code, start, end),
            )
            .unwrap();
        }
    }
}

#[test]
fn config_file_and_csv_directory_run_end_to_end() {
    let dir = tempfile::tempdir().unwrap();
    populate(dir.path(), &["SOFR", "US10"]);
    let config_path = dir.path().join("system.toml");
    std::fs::write(&config_path, CONFIG).unwrap();

    let data = Arc::new(CsvDataSource::new(dir.path()));
    let summary = run_config_file(&config_path, data, true).unwrap();

    assert_eq!(summary.data_source, "csv");
    assert_eq!(summary.capital, 250_000.0);
    assert_eq!(summary.instruments.len(), 2);
    assert_eq!(summary.instruments[0].instrument_weight, 0.7);
    assert_eq!(summary.instruments[1].instrument_weight, 0.3);
    for inst in &summary.instruments {
        assert_eq!(inst.rules.len(), 2);
        assert!(inst.observations > 1000);
    }
}

#[test]
fn missing_carry_file_degrades_to_flat_carry() {
    let dir = tempfile::tempdir().unwrap();
    populate(dir.path(), &["SOFR", "US10"]);
    let file = ConfigFile::from_toml(CONFIG).unwrap();
    let system = PipelineBuilder::from_config_file(&file)
        .data(CsvDataSource::new(dir.path()))
        .build()
        .unwrap();

    let carry = system.raw_forecast("US10", "carry").unwrap();
    assert!(carry.values().iter().all(|v| *v == 0.0));
    let sofr_carry = system.raw_forecast("SOFR", "carry").unwrap();
    assert!(sofr_carry.values().iter().any(|v| *v != 0.0));

    // The zero forecast still takes its weight share.
    let weights = system.forecast_weights("US10").unwrap();
    let last = weights["carry"].len() - 1;
    assert_eq!(weights["carry"].values()[last], 0.5);
}

#[test]
fn missing_instrument_fails_the_run() {
    let dir = tempfile::tempdir().unwrap();
    populate(dir.path(), &["SOFR"]);
    let file = ConfigFile::from_toml(CONFIG).unwrap();
    let system = PipelineBuilder::from_config_file(&file)
        .data(CsvDataSource::new(dir.path()))
        .build()
        .unwrap();

    match run_instruments(&system, true) {
        Err(RunError::Pipeline(PipelineError::DataUnavailable { instrument, .. })) => {
            assert_eq!(instrument, "US10")
        }
        other => panic!("expected DataUnavailable for US10, got {other:?}"),
    }
}

#[test]
fn restricting_instruments_runs_a_subset() {
    let dir = tempfile::tempdir().unwrap();
    populate(dir.path(), &["SOFR"]);
    let mut file = ConfigFile::from_toml(CONFIG).unwrap();
    file.restrict_instruments(&["SOFR".to_string()]);
    let system = PipelineBuilder::from_config_file(&file)
        .data(CsvDataSource::new(dir.path()))
        .build()
        .unwrap();
    let summary = run_instruments(&system, false).unwrap();
    assert_eq!(summary.instruments.len(), 1);
    assert_eq!(summary.instruments[0].instrument_weight, 1.0);
}

#[test]
fn date_bounds_limit_observations() {
    let dir = tempfile::tempdir().unwrap();
    populate(dir.path(), &["SOFR", "US10"]);
    let file = ConfigFile::from_toml(CONFIG).unwrap();
    let system = PipelineBuilder::from_config_file(&file)
        .dates(Some(d(2019, 1, 1)), Some(d(2019, 12, 31)))
        .data(CsvDataSource::new(dir.path()))
        .build()
        .unwrap();
    let summary = run_instruments(&system, true).unwrap();
    for inst in &summary.instruments {
        assert_eq!(inst.start_date, Some(d(2019, 1, 1)));
        assert_eq!(inst.end_date, Some(d(2019, 12, 31)));
        assert_eq!(inst.observations, 261);
    }
}

#[test]
fn fingerprint_changes_with_config_not_with_run_mode() {
    let dir = tempfile::tempdir().unwrap();
    populate(dir.path(), &["SOFR", "US10"]);
    let data = Arc::new(CsvDataSource::new(dir.path()));
    let file = ConfigFile::from_toml(CONFIG).unwrap();

    let build = |file: &ConfigFile| {
        PipelineBuilder::from_config_file(file)
            .shared_data(data.clone())
            .build()
            .unwrap()
    };
    let a = run_instruments(&build(&file), true).unwrap();
    let b = run_instruments(&build(&file), false).unwrap();
    assert_eq!(a.config_fingerprint, b.config_fingerprint);

    let mut other = file.clone();
    other.system.percentage_vol_target = Some(25.0);
    let c = run_instruments(&build(&other), true).unwrap();
    assert_ne!(a.config_fingerprint, c.config_fingerprint);
}

#[test]
fn invalid_config_file_is_reported_before_any_data_is_read() {
    let dir = tempfile::tempdir().unwrap();
    let config_path = dir.path().join("bad.toml");
    std::fs::write(
        &config_path,
        "[system]\ninstruments = [\"SOFR\"]\n[rules.e]\ntype = \"ewmac\"\nlfast = 8\nlslow = 4\n",
    )
    .unwrap();
    let err = run_config_file(&config_path, Arc::new(CsvDataSource::new(dir.path())), true)
        .unwrap_err();
    assert!(matches!(err, RunError::Build(BuildError::Config(_))));
}
