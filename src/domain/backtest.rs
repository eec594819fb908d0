//! Vectorized single-asset backtest engine.
//!
//! A lightweight ledger (cash balance plus an optional open lot) rather
//! than a full [`super::broker::PaperBroker`]; the broker exists for
//! event-driven simulation, this engine replays a finished signal series
//! over closes as fast as possible.

use chrono::NaiveDateTime;

use super::bar::Bar;
use super::error::CoinsimError;
use super::metrics;
use super::position::{RiskTrigger, Side, Trade};
use super::signal::Signal;

/// Whether risk bounds or the strategy's exit signal win when both fire on
/// the same bar. Trend-following setups cut losses first; mean-reversion
/// setups honor the signal first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitPriority {
    RiskFirst,
    SignalFirst,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BacktestParams {
    pub symbol: String,
    pub initial_balance: f64,
    /// Fractional stop-loss below entry. 0.0 disables the check.
    pub stop_loss_pct: f64,
    /// Fractional take-profit above entry. 0.0 disables the check.
    pub take_profit_pct: f64,
    pub exit_priority: ExitPriority,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EquityPoint {
    pub timestamp: NaiveDateTime,
    pub equity: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BacktestResult {
    pub trades: Vec<Trade>,
    pub pnl: f64,
    /// Cash if flat at the end, otherwise the open lot marked at the last
    /// close.
    pub final_value: f64,
    pub equity: Vec<EquityPoint>,
    pub drawdown: Vec<f64>,
}

struct Ledger {
    balance: f64,
    lot: Option<Lot>,
    trades: Vec<Trade>,
    symbol: String,
}

struct Lot {
    quantity: f64,
    entry_price: f64,
}

impl Ledger {
    fn buy(&mut self, price: f64, timestamp: NaiveDateTime) {
        let quantity = self.balance / price;
        self.lot = Some(Lot {
            quantity,
            entry_price: price,
        });
        self.balance = 0.0;
        self.record(Side::Buy, None, quantity, price, timestamp);
    }

    fn sell(&mut self, price: f64, trigger: Option<RiskTrigger>, timestamp: NaiveDateTime) {
        if let Some(lot) = self.lot.take() {
            self.balance += lot.quantity * price;
            self.record(Side::Sell, trigger, lot.quantity, price, timestamp);
        }
    }

    fn record(
        &mut self,
        side: Side,
        trigger: Option<RiskTrigger>,
        quantity: f64,
        price: f64,
        timestamp: NaiveDateTime,
    ) {
        self.trades.push(Trade {
            timestamp,
            side,
            trigger,
            symbol: self.symbol.clone(),
            quantity,
            price,
            balance: self.balance,
        });
    }

    fn equity(&self, price: f64) -> f64 {
        match &self.lot {
            Some(lot) => lot.quantity * price,
            None => self.balance,
        }
    }
}

/// Replay `signals` over `bars` with full-balance reinvestment sizing.
///
/// Bar 0 never trades; each later bar is processed in a fixed order
/// determined by `params.exit_priority`, with at most one fill per bar,
/// always at that bar's close.
pub fn run_backtest(
    bars: &[Bar],
    signals: &[Signal],
    params: &BacktestParams,
) -> Result<BacktestResult, CoinsimError> {
    if bars.len() != signals.len() {
        return Err(CoinsimError::SignalMismatch {
            bars: bars.len(),
            signals: signals.len(),
        });
    }
    if bars.is_empty() {
        return Ok(BacktestResult {
            trades: Vec::new(),
            pnl: 0.0,
            final_value: params.initial_balance,
            equity: Vec::new(),
            drawdown: Vec::new(),
        });
    }

    let mut ledger = Ledger {
        balance: params.initial_balance,
        lot: None,
        trades: Vec::new(),
        symbol: params.symbol.clone(),
    };
    let mut equity = Vec::with_capacity(bars.len());
    equity.push(EquityPoint {
        timestamp: bars[0].timestamp,
        equity: params.initial_balance,
    });

    for i in 1..bars.len() {
        let price = bars[i].close;
        let timestamp = bars[i].timestamp;
        let signal = signals[i];

        let take_profit_hit = ledger.lot.as_ref().is_some_and(|lot| {
            params.take_profit_pct > 0.0
                && price >= lot.entry_price * (1.0 + params.take_profit_pct)
        });
        let stop_loss_hit = ledger.lot.as_ref().is_some_and(|lot| {
            params.stop_loss_pct > 0.0
                && price <= lot.entry_price * (1.0 - params.stop_loss_pct)
        });
        let can_enter =
            ledger.lot.is_none() && signal == Signal::EnterLong && ledger.balance > 0.0;
        let can_exit = ledger.lot.is_some() && signal == Signal::Exit;

        match params.exit_priority {
            ExitPriority::RiskFirst => {
                if take_profit_hit {
                    ledger.sell(price, Some(RiskTrigger::TakeProfit), timestamp);
                } else if stop_loss_hit {
                    ledger.sell(price, Some(RiskTrigger::StopLoss), timestamp);
                } else if can_enter {
                    ledger.buy(price, timestamp);
                } else if can_exit {
                    ledger.sell(price, None, timestamp);
                }
            }
            ExitPriority::SignalFirst => {
                if can_enter {
                    ledger.buy(price, timestamp);
                } else if can_exit {
                    ledger.sell(price, None, timestamp);
                } else if take_profit_hit {
                    ledger.sell(price, Some(RiskTrigger::TakeProfit), timestamp);
                } else if stop_loss_hit {
                    ledger.sell(price, Some(RiskTrigger::StopLoss), timestamp);
                }
            }
        }

        equity.push(EquityPoint {
            timestamp,
            equity: ledger.equity(price),
        });
    }

    let final_value = ledger.equity(bars[bars.len() - 1].close);
    let curve: Vec<f64> = equity.iter().map(|p| p.equity).collect();
    Ok(BacktestResult {
        pnl: final_value - params.initial_balance,
        final_value,
        drawdown: metrics::drawdown_series(&curve),
        trades: ledger.trades,
        equity,
    })
}
