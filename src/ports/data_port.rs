//! Market data access port trait.

use crate::domain::bar::Bar;
use crate::domain::error::CoinsimError;

pub trait MarketDataPort {
    /// Full OHLCV history for one symbol, sorted ascending by timestamp.
    fn fetch_ohlcv(&self, symbol: &str) -> Result<Vec<Bar>, CoinsimError>;

    fn list_symbols(&self) -> Result<Vec<String>, CoinsimError>;
}
