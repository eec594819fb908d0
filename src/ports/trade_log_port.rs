//! Trade log persistence port trait.

use crate::domain::error::CoinsimError;
use crate::domain::position::Trade;

/// Durable append-only sink for executed trades.
pub trait TradeLogPort {
    fn append(&self, trade: &Trade) -> Result<(), CoinsimError>;
}
