//! Event-driven simulation: drives a [`PaperBroker`] bar by bar.
//!
//! Same signal contract as the vectorized engine, but every fill goes
//! through the broker so limit orders, rejections and the append-only
//! trade log all behave exactly as they would in a live paper session.

use super::backtest::EquityPoint;
use super::bar::Bar;
use super::broker::PaperBroker;
use super::error::CoinsimError;
use super::signal::Signal;

#[derive(Debug, Clone, PartialEq)]
pub struct SimulatorConfig {
    pub symbol: String,
    /// Fraction of the cash balance committed per entry, in (0, 1].
    pub size_fraction: f64,
    /// Fractional distance of the stop-loss below entry. None disables it.
    pub stop_loss_pct: Option<f64>,
    /// Fractional distance of the take-profit above entry. None disables it.
    pub take_profit_pct: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SimulationOutcome {
    pub trades: Vec<super::position::Trade>,
    pub equity: Vec<EquityPoint>,
    pub final_value: f64,
}

/// Replay `signals` over `bars` through `broker`.
///
/// Per-bar order is fixed: risk exits, then resting limit orders, then the
/// bar's signal. Bar 0 only seeds the equity curve.
pub fn simulate(
    bars: &[Bar],
    signals: &[Signal],
    broker: &mut PaperBroker,
    config: &SimulatorConfig,
) -> Result<SimulationOutcome, CoinsimError> {
    if bars.len() != signals.len() {
        return Err(CoinsimError::SignalMismatch {
            bars: bars.len(),
            signals: signals.len(),
        });
    }

    let mut equity = Vec::with_capacity(bars.len());
    if let Some(first) = bars.first() {
        equity.push(EquityPoint {
            timestamp: first.timestamp,
            equity: broker.total_equity(first.close),
        });
    }

    for i in 1..bars.len() {
        let price = bars[i].close;
        let timestamp = bars[i].timestamp;

        broker.check_stop_loss_take_profit(price, timestamp);
        broker.check_orders(price, timestamp);

        match signals[i] {
            Signal::EnterLong if broker.open_position().is_none() => {
                let budget = broker.balance() * config.size_fraction;
                if budget > 0.0 {
                    // budget / price can round up one ulp past what the
                    // balance covers; step down so the fill cost never
                    // exceeds the cash balance.
                    let mut quantity = budget / price;
                    while quantity * price > broker.balance() {
                        quantity = quantity.next_down();
                    }
                    let stop_loss = config.stop_loss_pct.map(|pct| price * (1.0 - pct));
                    let take_profit = config.take_profit_pct.map(|pct| price * (1.0 + pct));
                    if let Err(rejection) = broker.buy(
                        &config.symbol,
                        quantity,
                        price,
                        stop_loss,
                        take_profit,
                        timestamp,
                    ) {
                        log::warn!("entry rejected at {price}: {rejection}");
                    }
                }
            }
            Signal::Exit if broker.open_position().is_some() => {
                if let Err(rejection) = broker.sell(&config.symbol, price, timestamp) {
                    log::warn!("exit rejected at {price}: {rejection}");
                }
            }
            _ => {}
        }

        let point = broker.total_equity(price);
        equity.push(EquityPoint {
            timestamp,
            equity: point,
        });
    }

    let final_value = bars
        .last()
        .map(|bar| broker.total_equity(bar.close))
        .unwrap_or_else(|| broker.balance());

    Ok(SimulationOutcome {
        trades: broker.trade_log().to_vec(),
        equity,
        final_value,
    })
}
