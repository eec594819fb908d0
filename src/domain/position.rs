//! Position tracking and trade records.

use chrono::NaiveDateTime;
use std::fmt;

/// Fill direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Buy,
    Sell,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Buy => write!(f, "buy"),
            Side::Sell => write!(f, "sell"),
        }
    }
}

/// Which risk bound forced an exit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RiskTrigger {
    StopLoss,
    TakeProfit,
}

impl fmt::Display for RiskTrigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RiskTrigger::StopLoss => write!(f, "SL"),
            RiskTrigger::TakeProfit => write!(f, "TP"),
        }
    }
}

/// The currently held quantity of an asset plus its entry price and risk
/// bounds. At most one per broker instance at any time.
#[derive(Debug, Clone, PartialEq)]
pub struct Position {
    pub symbol: String,
    pub quantity: f64,
    pub entry_price: f64,
    pub stop_loss: Option<f64>,
    pub take_profit: Option<f64>,
}

impl Position {
    pub fn market_value(&self, price: f64) -> f64 {
        self.quantity * price
    }

    pub fn unrealized_pnl(&self, price: f64) -> f64 {
        (price - self.entry_price) * self.quantity
    }

    pub fn stop_loss_hit(&self, price: f64) -> bool {
        match self.stop_loss {
            Some(bound) => price <= bound,
            None => false,
        }
    }

    pub fn take_profit_hit(&self, price: f64) -> bool {
        match self.take_profit {
            Some(bound) => price >= bound,
            None => false,
        }
    }
}

/// A fill record. The trade log is append-only: records are never mutated
/// or reordered after being written.
#[derive(Debug, Clone, PartialEq)]
pub struct Trade {
    pub timestamp: NaiveDateTime,
    pub side: Side,
    /// Set only when the fill was forced by a stop-loss or take-profit.
    pub trigger: Option<RiskTrigger>,
    pub symbol: String,
    pub quantity: f64,
    pub price: f64,
    /// Cash balance immediately after the fill.
    pub balance: f64,
}

impl Trade {
    /// Label for display and the persisted trade log: `BUY`, `SELL`,
    /// `SELL (SL)` or `SELL (TP)`.
    pub fn side_label(&self) -> String {
        match (self.side, self.trigger) {
            (Side::Buy, _) => "BUY".to_string(),
            (Side::Sell, None) => "SELL".to_string(),
            (Side::Sell, Some(trigger)) => format!("SELL ({trigger})"),
        }
    }
}
