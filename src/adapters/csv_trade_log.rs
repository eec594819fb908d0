//! CSV trade log adapter.
//!
//! Appends one row per fill to a CSV file, creating it with a header on
//! first use. Each append opens, writes and closes the file so a crash
//! between fills loses at most the in-flight row.

use std::fs::OpenOptions;
use std::path::{Path, PathBuf};

use crate::domain::error::CoinsimError;
use crate::domain::position::Trade;
use crate::ports::trade_log_port::TradeLogPort;

const HEADER: [&str; 6] = ["timestamp", "side", "symbol", "quantity", "price", "balance"];

pub struct CsvTradeLog {
    path: PathBuf,
}

impl CsvTradeLog {
    /// Open a trade log at `path`, writing the header row if the file does
    /// not exist yet. An existing log is appended to, never truncated.
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self, CoinsimError> {
        let path = path.as_ref().to_path_buf();
        if !path.exists() {
            let file = OpenOptions::new().create(true).append(true).open(&path)?;
            let mut writer = csv::Writer::from_writer(file);
            writer
                .write_record(HEADER)
                .map_err(|e| CoinsimError::DataSource {
                    reason: format!("failed to write trade log header: {e}"),
                })?;
            writer.flush()?;
        }
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl TradeLogPort for CsvTradeLog {
    fn append(&self, trade: &Trade) -> Result<(), CoinsimError> {
        let file = OpenOptions::new().append(true).open(&self.path)?;
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(file);
        writer
            .write_record(&[
                trade.timestamp.format("%Y-%m-%d %H:%M:%S").to_string(),
                trade.side_label(),
                trade.symbol.clone(),
                trade.quantity.to_string(),
                trade.price.to_string(),
                trade.balance.to_string(),
            ])
            .map_err(|e| CoinsimError::DataSource {
                reason: format!("failed to append trade: {e}"),
            })?;
        writer.flush()?;
        Ok(())
    }
}
