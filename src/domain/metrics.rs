//! Performance metrics over trade logs and equity curves.
//!
//! Every function here is pure and total: degenerate inputs (no trades, no
//! sells, flat or too-short equity curves) produce zeros rather than errors.

use super::position::{Side, Trade};

/// Annualization factor for daily bars.
const PERIODS_PER_YEAR: f64 = 365.0;

/// Pair each sell with the buy that preceded it, in log order.
fn round_trips(trades: &[Trade]) -> Vec<(&Trade, &Trade)> {
    let buys: Vec<&Trade> = trades.iter().filter(|t| t.side == Side::Buy).collect();
    let sells: Vec<&Trade> = trades.iter().filter(|t| t.side == Side::Sell).collect();
    buys.into_iter().zip(sells).collect()
}

/// Percentage of round trips closed above their entry price. 0.0 when no
/// round trip completed.
pub fn win_rate(trades: &[Trade]) -> f64 {
    let pairs = round_trips(trades);
    if pairs.is_empty() {
        return 0.0;
    }
    let wins = pairs
        .iter()
        .filter(|(buy, sell)| sell.price > buy.price)
        .count();
    wins as f64 / pairs.len() as f64 * 100.0
}

/// Realized profit of each completed round trip.
pub fn round_trip_pnls(trades: &[Trade]) -> Vec<f64> {
    round_trips(trades)
        .iter()
        .map(|(buy, sell)| (sell.price - buy.price) * sell.quantity)
        .collect()
}

/// Mean profit of winning round trips and mean loss of losing ones.
/// The loss component is <= 0.0. Either is 0.0 when its side is empty.
pub fn average_win_loss(trades: &[Trade]) -> (f64, f64) {
    let pnls = round_trip_pnls(trades);
    let wins: Vec<f64> = pnls.iter().copied().filter(|p| *p > 0.0).collect();
    let losses: Vec<f64> = pnls.iter().copied().filter(|p| *p <= 0.0).collect();

    let avg = |v: &[f64]| {
        if v.is_empty() {
            0.0
        } else {
            v.iter().sum::<f64>() / v.len() as f64
        }
    };
    (avg(&wins), avg(&losses))
}

/// Annualized Sharpe ratio of an equity curve: mean per-period return over
/// its sample standard deviation, scaled by sqrt(365). 0.0 when fewer than
/// two returns exist or the return series has zero variance.
pub fn sharpe_ratio(equity: &[f64]) -> f64 {
    let returns: Vec<f64> = equity
        .windows(2)
        .map(|w| if w[0] > 0.0 { w[1] / w[0] - 1.0 } else { 0.0 })
        .collect();
    if returns.len() < 2 {
        return 0.0;
    }

    let mean = returns.iter().sum::<f64>() / returns.len() as f64;
    let variance = returns
        .iter()
        .map(|r| (r - mean).powi(2))
        .sum::<f64>()
        / (returns.len() - 1) as f64;
    let std = variance.sqrt();
    if std == 0.0 {
        return 0.0;
    }
    mean / std * PERIODS_PER_YEAR.sqrt()
}

/// Per-point drawdown relative to the running equity peak, each value in
/// `[-1, 0]`.
pub fn drawdown_series(equity: &[f64]) -> Vec<f64> {
    let mut peak = f64::NEG_INFINITY;
    equity
        .iter()
        .map(|&e| {
            peak = peak.max(e);
            if peak > 0.0 { e / peak - 1.0 } else { 0.0 }
        })
        .collect()
}

/// Largest peak-to-trough decline as a percentage, <= 0.0. 0.0 for empty or
/// monotonically rising curves.
pub fn max_drawdown(equity: &[f64]) -> f64 {
    drawdown_series(equity)
        .into_iter()
        .fold(0.0_f64, f64::min)
        * 100.0
}

/// One-shot summary of a completed run, for reporting.
#[derive(Debug, Clone, PartialEq)]
pub struct PerformanceSummary {
    pub pnl: f64,
    pub return_pct: f64,
    pub total_trades: usize,
    pub win_rate: f64,
    pub avg_win: f64,
    pub avg_loss: f64,
    pub sharpe_ratio: f64,
    pub max_drawdown: f64,
}

impl PerformanceSummary {
    pub fn compute(
        trades: &[Trade],
        equity: &[f64],
        initial_balance: f64,
        final_value: f64,
    ) -> Self {
        let pnl = final_value - initial_balance;
        let return_pct = if initial_balance > 0.0 {
            pnl / initial_balance * 100.0
        } else {
            0.0
        };
        let (avg_win, avg_loss) = average_win_loss(trades);
        PerformanceSummary {
            pnl,
            return_pct,
            total_trades: trades.len(),
            win_rate: win_rate(trades),
            avg_win,
            avg_loss,
            sharpe_ratio: sharpe_ratio(equity),
            max_drawdown: max_drawdown(equity),
        }
    }
}
