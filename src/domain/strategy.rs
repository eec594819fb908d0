//! Signal-generating strategies.
//!
//! Each strategy computes a raw per-bar signal from indicator state and
//! then shifts the series forward one bar, so a decision made on bar `i`'s
//! close can only act on bar `i + 1`. Bars inside an indicator's warm-up
//! window emit `Hold`.

use super::backtest::ExitPriority;
use super::bar::{closes, Bar};
use super::indicator::{ema, rolling_max, rolling_std, rsi, sma};
use super::signal::Signal;

#[derive(Debug, Clone, PartialEq)]
pub enum StrategyKind {
    /// Fast/slow EMA trend filter gated by RSI to avoid chasing overbought
    /// entries.
    EmaCross {
        fast: usize,
        slow: usize,
        rsi_period: usize,
        rsi_threshold: f64,
    },
    /// Buy oversold, sell overbought.
    RsiReversion {
        period: usize,
        buy_below: f64,
        sell_above: f64,
    },
    /// Enter on a close above the rolling high of the preceding window.
    /// Exits are left entirely to stop-loss and take-profit bounds.
    Breakout { window: usize },
    MacdCross {
        fast: usize,
        slow: usize,
        signal: usize,
    },
    /// Mean reversion against Bollinger bands around an SMA.
    Bollinger { window: usize, num_std: f64 },
}

impl StrategyKind {
    pub fn name(&self) -> &'static str {
        match self {
            StrategyKind::EmaCross { .. } => "ema",
            StrategyKind::RsiReversion { .. } => "rsi",
            StrategyKind::Breakout { .. } => "breakout",
            StrategyKind::MacdCross { .. } => "macd",
            StrategyKind::Bollinger { .. } => "bollinger",
        }
    }

    /// Trend followers cut losses before honoring their own exit signal;
    /// mean-reversion and breakout styles let the signal speak first.
    pub fn exit_priority(&self) -> ExitPriority {
        match self {
            StrategyKind::EmaCross { .. } | StrategyKind::MacdCross { .. } => {
                ExitPriority::RiskFirst
            }
            StrategyKind::RsiReversion { .. }
            | StrategyKind::Breakout { .. }
            | StrategyKind::Bollinger { .. } => ExitPriority::SignalFirst,
        }
    }

    /// One signal per bar, shifted forward so no bar acts on its own close.
    pub fn signals(&self, bars: &[Bar]) -> Vec<Signal> {
        let raw = self.raw_signals(&closes(bars));
        shift_one(&raw)
    }

    fn raw_signals(&self, prices: &[f64]) -> Vec<Signal> {
        match *self {
            StrategyKind::EmaCross {
                fast,
                slow,
                rsi_period,
                rsi_threshold,
            } => {
                let fast_ema = ema(prices, fast);
                let slow_ema = ema(prices, slow);
                let rsi_series = rsi(prices, rsi_period);
                (0..prices.len())
                    .map(|i| {
                        if fast_ema[i] > slow_ema[i] {
                            match rsi_series[i] {
                                Some(r) if r < rsi_threshold => Signal::EnterLong,
                                _ => Signal::Hold,
                            }
                        } else if fast_ema[i] < slow_ema[i] {
                            Signal::Exit
                        } else {
                            Signal::Hold
                        }
                    })
                    .collect()
            }
            StrategyKind::RsiReversion {
                period,
                buy_below,
                sell_above,
            } => rsi(prices, period)
                .into_iter()
                .map(|value| match value {
                    Some(r) if r < buy_below => Signal::EnterLong,
                    Some(r) if r > sell_above => Signal::Exit,
                    _ => Signal::Hold,
                })
                .collect(),
            StrategyKind::Breakout { window } => {
                let highs = rolling_max(prices, window);
                (0..prices.len())
                    .map(|i| {
                        // Compare against the high of the window ending on
                        // the previous bar, not one including this close.
                        if i == 0 {
                            return Signal::Hold;
                        }
                        match highs[i - 1] {
                            Some(high) if prices[i] > high => Signal::EnterLong,
                            _ => Signal::Hold,
                        }
                    })
                    .collect()
            }
            StrategyKind::MacdCross { fast, slow, signal } => {
                let fast_ema = ema(prices, fast);
                let slow_ema = ema(prices, slow);
                let macd: Vec<f64> = fast_ema
                    .iter()
                    .zip(&slow_ema)
                    .map(|(f, s)| f - s)
                    .collect();
                let signal_line = ema(&macd, signal);
                macd.iter()
                    .zip(&signal_line)
                    .map(|(m, s)| {
                        if m > s {
                            Signal::EnterLong
                        } else if m < s {
                            Signal::Exit
                        } else {
                            Signal::Hold
                        }
                    })
                    .collect()
            }
            StrategyKind::Bollinger { window, num_std } => {
                let mid = sma(prices, window);
                let std = rolling_std(prices, window);
                (0..prices.len())
                    .map(|i| match (mid[i], std[i]) {
                        (Some(mid), Some(std)) => {
                            if prices[i] < mid - num_std * std {
                                Signal::EnterLong
                            } else if prices[i] > mid + num_std * std {
                                Signal::Exit
                            } else {
                                Signal::Hold
                            }
                        }
                        _ => Signal::Hold,
                    })
                    .collect()
            }
        }
    }
}

fn shift_one(raw: &[Signal]) -> Vec<Signal> {
    if raw.is_empty() {
        return Vec::new();
    }
    let mut out = Vec::with_capacity(raw.len());
    out.push(Signal::Hold);
    out.extend_from_slice(&raw[..raw.len() - 1]);
    out
}
