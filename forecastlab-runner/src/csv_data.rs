//! CSV market data.
//!
//! A data directory holds one `<CODE>_price.csv` per instrument and an
//! optional `<CODE>_carry.csv`. Each file has a header row; the first column
//! is the date (`YYYY-MM-DD`, anything after the tenth character is
//! ignored so `DATETIME` stamps like `2020-01-02 00:00:00` load too) and the
//! second is the value. Blank values load as NaN.

use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use tracing::debug;

use forecastlab_core::data_source::{DataError, DataSource};
use forecastlab_core::series::TimeSeries;

pub const PRICE_SUFFIX: &str = "_price.csv";
pub const CARRY_SUFFIX: &str = "_carry.csv";

#[derive(Debug, Clone)]
pub struct CsvDataSource {
    dir: PathBuf,
}

impl CsvDataSource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn price_path(&self, code: &str) -> PathBuf {
        self.dir.join(format!("{code}{PRICE_SUFFIX}"))
    }

    fn carry_path(&self, code: &str) -> PathBuf {
        self.dir.join(format!("{code}{CARRY_SUFFIX}"))
    }
}

impl DataSource for CsvDataSource {
    fn name(&self) -> &str {
        "csv"
    }

    /// Codes with a price file, sorted. An unreadable directory lists nothing.
    fn instrument_codes(&self) -> Vec<String> {
        let Ok(entries) = std::fs::read_dir(&self.dir) else {
            return Vec::new();
        };
        let mut codes: Vec<String> = entries
            .filter_map(|e| e.ok())
            .filter_map(|e| {
                e.file_name()
                    .to_str()
                    .and_then(|name| name.strip_suffix(PRICE_SUFFIX))
                    .map(str::to_string)
            })
            .collect();
        codes.sort();
        codes
    }

    fn daily_prices(&self, code: &str) -> Result<TimeSeries, DataError> {
        let path = self.price_path(code);
        if !path.exists() {
            return Err(DataError::UnknownInstrument(code.to_string()));
        }
        read_series(code, &path)
    }

    fn get_instrument_raw_carry_data(&self, code: &str) -> Result<TimeSeries, DataError> {
        if !self.price_path(code).exists() {
            return Err(DataError::UnknownInstrument(code.to_string()));
        }
        let path = self.carry_path(code);
        if !path.exists() {
            return Ok(TimeSeries::empty());
        }
        read_series(code, &path)
    }
}

/// Read a two-column date/value file. Rows must be in ascending date order.
pub fn read_series(code: &str, path: &Path) -> Result<TimeSeries, DataError> {
    let malformed = |reason: String| DataError::Malformed {
        instrument: code.to_string(),
        reason: format!("{}: {reason}", path.display()),
    };

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(|e| match e.into_kind() {
            csv::ErrorKind::Io(source) => DataError::Io {
                path: path.display().to_string(),
                source,
            },
            other => malformed(format!("{other:?}")),
        })?;

    let mut pairs = Vec::new();
    for (row, record) in reader.records().enumerate() {
        let record = record.map_err(|e| malformed(format!("row {}: {e}", row + 1)))?;
        let (Some(date), Some(value)) = (record.get(0), record.get(1)) else {
            return Err(malformed(format!("row {}: expected two columns", row + 1)));
        };
        let date = parse_date(date)
            .ok_or_else(|| malformed(format!("row {}: bad date '{date}'", row + 1)))?;
        let value = if value.is_empty() {
            f64::NAN
        } else {
            value
                .parse::<f64>()
                .map_err(|_| malformed(format!("row {}: bad value '{value}'", row + 1)))?
        };
        pairs.push((date, value));
    }

    debug!(instrument = code, path = %path.display(), rows = pairs.len(), "loaded csv");
    TimeSeries::from_pairs(pairs).map_err(|e| malformed(e.to_string()))
}

fn parse_date(field: &str) -> Option<NaiveDate> {
    let day = field.get(..10)?;
    NaiveDate::parse_from_str(day, "%Y-%m-%d").ok()
}

/// Write a series in the format [`read_series`] expects.
pub fn write_series(path: &Path, series: &TimeSeries) -> Result<(), DataError> {
    let io_err = |source: std::io::Error| DataError::Io {
        path: path.display().to_string(),
        source,
    };
    let mut writer = csv::Writer::from_path(path).map_err(|e| io_err(e.into()))?;
    writer
        .write_record(["DATETIME", "value"])
        .map_err(|e| io_err(e.into()))?;
    for (date, value) in series.iter() {
        let value = if value.is_nan() {
            String::new()
        } else {
            value.to_string()
        };
        writer
            .write_record([date.format("%Y-%m-%d").to_string(), value])
            .map_err(|e| io_err(e.into()))?;
    }
    writer.flush().map_err(io_err)
}
