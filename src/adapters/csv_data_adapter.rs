//! CSV file market data adapter.
//!
//! One `<symbol>.csv` per asset under a base directory, columns
//! `timestamp,open,high,low,close,volume`. Timestamps accept either
//! `%Y-%m-%d %H:%M:%S` or a bare `%Y-%m-%d` (read as midnight).

use std::fs;
use std::path::PathBuf;

use chrono::{NaiveDate, NaiveDateTime};

use crate::domain::bar::Bar;
use crate::domain::error::CoinsimError;
use crate::ports::data_port::MarketDataPort;

pub struct CsvDataAdapter {
    base_path: PathBuf,
}

impl CsvDataAdapter {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    fn csv_path(&self, symbol: &str) -> PathBuf {
        self.base_path.join(format!("{symbol}.csv"))
    }

    fn parse_timestamp(value: &str) -> Result<NaiveDateTime, CoinsimError> {
        if let Ok(ts) = NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S") {
            return Ok(ts);
        }
        NaiveDate::parse_from_str(value, "%Y-%m-%d")
            .map(|d| d.and_hms_opt(0, 0, 0).unwrap_or_default())
            .map_err(|e| CoinsimError::DataSource {
                reason: format!("invalid timestamp '{value}': {e}"),
            })
    }

    fn parse_field(record: &csv::StringRecord, index: usize, name: &str) -> Result<f64, CoinsimError> {
        record
            .get(index)
            .ok_or_else(|| CoinsimError::DataSource {
                reason: format!("missing {name} column"),
            })?
            .parse()
            .map_err(|e| CoinsimError::DataSource {
                reason: format!("invalid {name} value: {e}"),
            })
    }
}

impl MarketDataPort for CsvDataAdapter {
    fn fetch_ohlcv(&self, symbol: &str) -> Result<Vec<Bar>, CoinsimError> {
        let path = self.csv_path(symbol);
        if !path.exists() {
            return Err(CoinsimError::NoData {
                symbol: symbol.to_string(),
            });
        }
        let content = fs::read_to_string(&path).map_err(|e| CoinsimError::DataSource {
            reason: format!("failed to read {}: {}", path.display(), e),
        })?;

        let mut rdr = csv::Reader::from_reader(content.as_bytes());
        let mut bars = Vec::new();

        for result in rdr.records() {
            let record = result.map_err(|e| CoinsimError::DataSource {
                reason: format!("CSV parse error: {e}"),
            })?;

            let timestamp_str = record.get(0).ok_or_else(|| CoinsimError::DataSource {
                reason: "missing timestamp column".into(),
            })?;
            let timestamp = Self::parse_timestamp(timestamp_str)?;

            bars.push(Bar {
                timestamp,
                open: Self::parse_field(&record, 1, "open")?,
                high: Self::parse_field(&record, 2, "high")?,
                low: Self::parse_field(&record, 3, "low")?,
                close: Self::parse_field(&record, 4, "close")?,
                volume: Self::parse_field(&record, 5, "volume")?,
            });
        }

        bars.sort_by_key(|b| b.timestamp);
        Ok(bars)
    }

    fn list_symbols(&self) -> Result<Vec<String>, CoinsimError> {
        let entries = fs::read_dir(&self.base_path).map_err(|e| CoinsimError::DataSource {
            reason: format!(
                "failed to read directory {}: {}",
                self.base_path.display(),
                e
            ),
        })?;

        let mut symbols = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| CoinsimError::DataSource {
                reason: format!("directory entry error: {e}"),
            })?;
            let name = entry.file_name();
            let name_str = name.to_string_lossy();
            if let Some(symbol) = name_str.strip_suffix(".csv") {
                symbols.push(symbol.to_string());
            }
        }

        symbols.sort();
        Ok(symbols)
    }
}
