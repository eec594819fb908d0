//! Paper broker: the mutable account-state machine.
//!
//! One instance per simulation run or trading session, exclusively owned by
//! its caller. Rejections (insufficient funds, no open position) are
//! expected outcomes returned as values, not errors.

use chrono::NaiveDateTime;

use super::order::{LimitOrder, OrderStatus};
use super::position::{Position, RiskTrigger, Side, Trade};

/// Why a buy or sell was refused. Account state is unchanged on rejection.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum Rejection {
    #[error("insufficient funds: need {required:.2}, have {available:.2}")]
    InsufficientFunds { required: f64, available: f64 },

    #[error("position already open in {symbol}")]
    PositionAlreadyOpen { symbol: String },

    #[error("no open position in {symbol} to sell")]
    NoOpenPosition { symbol: String },
}

/// A forced exit produced by [`PaperBroker::check_stop_loss_take_profit`].
#[derive(Debug, Clone, PartialEq)]
pub struct RiskExit {
    pub trigger: RiskTrigger,
    pub trade: Trade,
}

/// Outcome of one limit order crossing during [`PaperBroker::check_orders`].
#[derive(Debug, Clone, PartialEq)]
pub struct FillReport {
    pub symbol: String,
    pub side: Side,
    pub outcome: Result<Trade, Rejection>,
}

/// Paper trading account: cash balance, at most one open position, pending
/// limit orders and an append-only trade log.
#[derive(Debug, Clone)]
pub struct PaperBroker {
    initial_balance: f64,
    balance: f64,
    position: Option<Position>,
    open_orders: Vec<LimitOrder>,
    trades: Vec<Trade>,
}

impl PaperBroker {
    pub fn new(initial_balance: f64) -> Self {
        PaperBroker {
            initial_balance,
            balance: initial_balance,
            position: None,
            open_orders: Vec::new(),
            trades: Vec::new(),
        }
    }

    /// Open a long position. Rejected if a position is already open (the
    /// broker never stacks positions) or if `quantity * price` exceeds the
    /// cash balance.
    pub fn buy(
        &mut self,
        symbol: &str,
        quantity: f64,
        price: f64,
        stop_loss: Option<f64>,
        take_profit: Option<f64>,
        timestamp: NaiveDateTime,
    ) -> Result<Trade, Rejection> {
        if let Some(pos) = &self.position {
            return Err(Rejection::PositionAlreadyOpen {
                symbol: pos.symbol.clone(),
            });
        }

        let cost = quantity * price;
        if cost > self.balance {
            return Err(Rejection::InsufficientFunds {
                required: cost,
                available: self.balance,
            });
        }

        self.balance -= cost;
        self.position = Some(Position {
            symbol: symbol.to_string(),
            quantity,
            entry_price: price,
            stop_loss,
            take_profit,
        });

        Ok(self.record_fill(symbol, Side::Buy, None, quantity, price, timestamp))
    }

    /// Close the open position at `price`. Rejected if there is no open
    /// position for `symbol`.
    pub fn sell(
        &mut self,
        symbol: &str,
        price: f64,
        timestamp: NaiveDateTime,
    ) -> Result<Trade, Rejection> {
        self.close_position(symbol, price, timestamp, None)
    }

    fn close_position(
        &mut self,
        symbol: &str,
        price: f64,
        timestamp: NaiveDateTime,
        trigger: Option<RiskTrigger>,
    ) -> Result<Trade, Rejection> {
        let position = match self.position.take() {
            Some(pos) if pos.symbol == symbol => pos,
            other => {
                self.position = other;
                return Err(Rejection::NoOpenPosition {
                    symbol: symbol.to_string(),
                });
            }
        };

        self.balance += position.quantity * price;
        Ok(self.record_fill(symbol, Side::Sell, trigger, position.quantity, price, timestamp))
    }

    /// Place a limit order. Always succeeds: the balance is checked at fill
    /// time via the normal `buy`/`sell` path, not at placement. Returns the
    /// order's index for later cancellation.
    pub fn place_limit_order(
        &mut self,
        symbol: &str,
        quantity: f64,
        limit_price: f64,
        side: Side,
        created_at: NaiveDateTime,
    ) -> usize {
        self.open_orders.push(LimitOrder {
            symbol: symbol.to_string(),
            quantity,
            limit_price,
            side,
            status: OrderStatus::Open,
            created_at,
        });
        self.open_orders.len() - 1
    }

    /// Cancel an open order by index. Returns false if the index is out of
    /// range or the order is no longer open.
    pub fn cancel_order(&mut self, index: usize) -> bool {
        match self.open_orders.get_mut(index) {
            Some(order) if order.status == OrderStatus::Open => {
                order.status = OrderStatus::Cancelled;
                true
            }
            _ => false,
        }
    }

    /// Evaluate every open order against `current_price` in insertion
    /// order. A crossing order is attempted through `buy`/`sell` at the
    /// current price and marked filled whether or not the fill was
    /// rejected; orders interact only through the shared cash/position
    /// state.
    pub fn check_orders(&mut self, current_price: f64, timestamp: NaiveDateTime) -> Vec<FillReport> {
        let mut fills = Vec::new();

        for i in 0..self.open_orders.len() {
            let order = &self.open_orders[i];
            if order.status != OrderStatus::Open || !order.crosses(current_price) {
                continue;
            }

            let symbol = order.symbol.clone();
            let quantity = order.quantity;
            let side = order.side;

            let outcome = match side {
                Side::Buy => self.buy(&symbol, quantity, current_price, None, None, timestamp),
                Side::Sell => self.sell(&symbol, current_price, timestamp),
            };

            self.open_orders[i].status = OrderStatus::Filled;
            fills.push(FillReport {
                symbol,
                side,
                outcome,
            });
        }

        fills
    }

    /// Force-sell if the open position's stop-loss or take-profit bound is
    /// crossed at `current_price`. Stop-loss is checked first. Must be
    /// invoked once per bar before any new entry signal is processed.
    pub fn check_stop_loss_take_profit(
        &mut self,
        current_price: f64,
        timestamp: NaiveDateTime,
    ) -> Option<RiskExit> {
        let (symbol, trigger) = {
            let position = self.position.as_ref()?;
            let trigger = if position.stop_loss_hit(current_price) {
                RiskTrigger::StopLoss
            } else if position.take_profit_hit(current_price) {
                RiskTrigger::TakeProfit
            } else {
                return None;
            };
            (position.symbol.clone(), trigger)
        };

        self.close_position(&symbol, current_price, timestamp, Some(trigger))
            .ok()
            .map(|trade| RiskExit { trigger, trade })
    }

    fn record_fill(
        &mut self,
        symbol: &str,
        side: Side,
        trigger: Option<RiskTrigger>,
        quantity: f64,
        price: f64,
        timestamp: NaiveDateTime,
    ) -> Trade {
        let trade = Trade {
            timestamp,
            side,
            trigger,
            symbol: symbol.to_string(),
            quantity,
            price,
            balance: self.balance,
        };
        self.trades.push(trade.clone());
        trade
    }

    pub fn balance(&self) -> f64 {
        self.balance
    }

    pub fn initial_balance(&self) -> f64 {
        self.initial_balance
    }

    pub fn open_position(&self) -> Option<&Position> {
        self.position.as_ref()
    }

    pub fn trade_log(&self) -> &[Trade] {
        &self.trades
    }

    pub fn open_orders(&self) -> &[LimitOrder] {
        &self.open_orders
    }

    pub fn unrealized_pnl(&self, current_price: f64) -> f64 {
        self.position
            .as_ref()
            .map(|pos| pos.unrealized_pnl(current_price))
            .unwrap_or(0.0)
    }

    /// `cash + position value`: holds immediately after any state
    /// transition.
    pub fn total_equity(&self, current_price: f64) -> f64 {
        let position_value = self
            .position
            .as_ref()
            .map(|pos| pos.market_value(current_price))
            .unwrap_or(0.0);
        self.balance + position_value
    }
}
