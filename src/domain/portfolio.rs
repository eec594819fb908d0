//! Multi-asset portfolio orchestration.
//!
//! Fetches each symbol's history, aligns every series to the shared
//! timestamp axis, then runs one independent backtest per asset on its
//! capital slice. Per-asset failures degrade to a skip, never abort the
//! portfolio.

use std::collections::BTreeSet;

use chrono::NaiveDateTime;
use rayon::prelude::*;

use super::backtest::{run_backtest, BacktestParams};
use super::bar::Bar;
use super::metrics;
use super::strategy::StrategyKind;
use crate::ports::data_port::MarketDataPort;

#[derive(Debug, Clone, PartialEq)]
pub struct PortfolioParams {
    pub initial_balance: f64,
    /// Fraction of the portfolio balance allocated to each asset.
    pub position_size: f64,
    pub stop_loss_pct: f64,
    pub take_profit_pct: f64,
    /// Accepted for config compatibility; periodic rebalancing is not yet
    /// applied to the run.
    pub rebalance_days: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AssetReport {
    pub symbol: String,
    pub total_trades: usize,
    pub pnl: f64,
    pub final_value: f64,
    pub win_rate: f64,
    pub sharpe_ratio: f64,
    pub equity: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SkippedAsset {
    pub symbol: String,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct PortfolioResult {
    /// Shared axis: timestamps present in every included asset's history.
    pub timestamps: Vec<NaiveDateTime>,
    pub total_equity: Vec<f64>,
    pub drawdown: Vec<f64>,
    pub assets: Vec<AssetReport>,
    pub skipped: Vec<SkippedAsset>,
}

/// Run `strategy` over every symbol on the intersected timestamp axis.
///
/// Infallible by design: data errors and empty histories become
/// [`SkippedAsset`] entries, and an empty intersection yields an empty
/// result with every symbol skipped.
pub fn run_portfolio(
    data: &dyn MarketDataPort,
    symbols: &[String],
    strategy: &StrategyKind,
    params: &PortfolioParams,
) -> PortfolioResult {
    let mut histories: Vec<(String, Vec<Bar>)> = Vec::new();
    let mut skipped = Vec::new();

    for symbol in symbols {
        match data.fetch_ohlcv(symbol) {
            Ok(bars) if bars.is_empty() => {
                log::warn!("skipping {symbol}: no data");
                skipped.push(SkippedAsset {
                    symbol: symbol.clone(),
                    reason: "no data".into(),
                });
            }
            Ok(bars) => histories.push((symbol.clone(), bars)),
            Err(err) => {
                log::warn!("skipping {symbol}: {err}");
                skipped.push(SkippedAsset {
                    symbol: symbol.clone(),
                    reason: err.to_string(),
                });
            }
        }
    }

    if histories.is_empty() {
        return PortfolioResult {
            skipped,
            ..PortfolioResult::default()
        };
    }

    let axis = shared_axis(&histories);
    if axis.is_empty() {
        log::warn!("timestamp intersection across {} assets is empty", histories.len());
        skipped.extend(histories.into_iter().map(|(symbol, _)| SkippedAsset {
            symbol,
            reason: "no overlapping timestamps".into(),
        }));
        return PortfolioResult {
            skipped,
            ..PortfolioResult::default()
        };
    }

    let timestamps: Vec<NaiveDateTime> = axis.iter().copied().collect();
    let allocation = params.initial_balance * params.position_size;

    let aligned: Vec<(String, Vec<Bar>)> = histories
        .into_iter()
        .map(|(symbol, bars)| {
            // Keep the first bar per axis instant: duplicated timestamps
            // would otherwise leave the series longer than the axis.
            let mut seen = BTreeSet::new();
            let filtered = bars
                .into_iter()
                .filter(|bar| axis.contains(&bar.timestamp) && seen.insert(bar.timestamp))
                .collect();
            (symbol, filtered)
        })
        .collect();

    let mut assets: Vec<AssetReport> = aligned
        .par_iter()
        .filter_map(|(symbol, bars)| {
            let signals = strategy.signals(bars);
            let asset_params = BacktestParams {
                symbol: symbol.clone(),
                initial_balance: allocation,
                stop_loss_pct: params.stop_loss_pct,
                take_profit_pct: params.take_profit_pct,
                exit_priority: strategy.exit_priority(),
            };
            // Lengths match by construction; a mismatch here is a bug.
            let result = run_backtest(bars, &signals, &asset_params).ok()?;
            let equity: Vec<f64> = result.equity.iter().map(|p| p.equity).collect();
            Some(AssetReport {
                symbol: symbol.clone(),
                total_trades: result.trades.len(),
                pnl: result.pnl,
                final_value: result.final_value,
                win_rate: metrics::win_rate(&result.trades),
                sharpe_ratio: metrics::sharpe_ratio(&equity),
                equity,
            })
        })
        .collect();
    // Parallel map preserves input order, but keep reports sorted by
    // symbol for stable output regardless of config ordering.
    assets.sort_by(|a, b| a.symbol.cmp(&b.symbol));

    let mut total_equity = vec![0.0; timestamps.len()];
    for asset in &assets {
        for (total, value) in total_equity.iter_mut().zip(&asset.equity) {
            *total += value;
        }
    }

    PortfolioResult {
        drawdown: metrics::drawdown_series(&total_equity),
        timestamps,
        total_equity,
        assets,
        skipped,
    }
}

fn shared_axis(histories: &[(String, Vec<Bar>)]) -> BTreeSet<NaiveDateTime> {
    let mut iter = histories.iter();
    let mut axis: BTreeSet<NaiveDateTime> = match iter.next() {
        Some((_, bars)) => bars.iter().map(|b| b.timestamp).collect(),
        None => return BTreeSet::new(),
    };
    for (_, bars) in iter {
        let timestamps: BTreeSet<NaiveDateTime> = bars.iter().map(|b| b.timestamp).collect();
        axis = axis.intersection(&timestamps).copied().collect();
        if axis.is_empty() {
            break;
        }
    }
    axis
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::error::CoinsimError;
    use chrono::NaiveDate;
    use std::collections::HashMap;

    struct FixtureData {
        bars: HashMap<String, Vec<Bar>>,
        failing: Vec<String>,
    }

    impl MarketDataPort for FixtureData {
        fn fetch_ohlcv(&self, symbol: &str) -> Result<Vec<Bar>, CoinsimError> {
            if self.failing.iter().any(|s| s == symbol) {
                return Err(CoinsimError::DataSource {
                    reason: format!("fixture failure for {symbol}"),
                });
            }
            self.bars
                .get(symbol)
                .cloned()
                .ok_or_else(|| CoinsimError::NoData {
                    symbol: symbol.to_string(),
                })
        }

        fn list_symbols(&self) -> Result<Vec<String>, CoinsimError> {
            Ok(self.bars.keys().cloned().collect())
        }
    }

    fn make_bars(start_day: u32, closes: &[f64]) -> Vec<Bar> {
        closes
            .iter()
            .enumerate()
            .map(|(i, &close)| Bar {
                timestamp: NaiveDate::from_ymd_opt(2024, 1, start_day)
                    .unwrap()
                    .and_hms_opt(0, 0, 0)
                    .unwrap()
                    + chrono::Duration::days(i as i64),
                open: close,
                high: close,
                low: close,
                close,
                volume: 1_000.0,
            })
            .collect()
    }

    fn params() -> PortfolioParams {
        PortfolioParams {
            initial_balance: 10_000.0,
            position_size: 0.5,
            stop_loss_pct: 0.10,
            take_profit_pct: 0.0,
            rebalance_days: 30,
        }
    }

    fn strategy() -> StrategyKind {
        StrategyKind::Breakout { window: 2 }
    }

    #[test]
    fn total_equity_is_sum_of_asset_curves() {
        let mut bars = HashMap::new();
        bars.insert("bitcoin".into(), make_bars(1, &[100.0, 100.0, 110.0, 120.0, 130.0]));
        bars.insert("ethereum".into(), make_bars(1, &[50.0, 50.0, 55.0, 60.0, 65.0]));
        let data = FixtureData { bars, failing: vec![] };
        let symbols = vec!["bitcoin".to_string(), "ethereum".to_string()];

        let result = run_portfolio(&data, &symbols, &strategy(), &params());

        assert_eq!(result.assets.len(), 2);
        assert!(result.skipped.is_empty());
        assert_eq!(result.timestamps.len(), 5);
        for i in 0..result.timestamps.len() {
            let sum: f64 = result.assets.iter().map(|a| a.equity[i]).sum();
            assert!((result.total_equity[i] - sum).abs() < 1e-9);
        }
        // Each asset starts with its capital slice.
        assert!((result.total_equity[0] - 10_000.0).abs() < 1e-9);
    }

    #[test]
    fn failing_asset_is_skipped_not_fatal() {
        let mut bars = HashMap::new();
        bars.insert("bitcoin".into(), make_bars(1, &[100.0, 100.0, 110.0, 120.0]));
        let data = FixtureData {
            bars,
            failing: vec!["doge".into()],
        };
        let symbols = vec!["bitcoin".to_string(), "doge".to_string()];

        let result = run_portfolio(&data, &symbols, &strategy(), &params());

        assert_eq!(result.assets.len(), 1);
        assert_eq!(result.skipped.len(), 1);
        assert_eq!(result.skipped[0].symbol, "doge");
        assert!(result.skipped[0].reason.contains("fixture failure"));
    }

    #[test]
    fn empty_history_is_skipped() {
        let mut bars = HashMap::new();
        bars.insert("bitcoin".into(), make_bars(1, &[100.0, 110.0, 120.0]));
        bars.insert("ethereum".into(), Vec::new());
        let data = FixtureData { bars, failing: vec![] };
        let symbols = vec!["bitcoin".to_string(), "ethereum".to_string()];

        let result = run_portfolio(&data, &symbols, &strategy(), &params());

        assert_eq!(result.assets.len(), 1);
        assert_eq!(result.skipped.len(), 1);
        assert_eq!(result.skipped[0].reason, "no data");
    }

    #[test]
    fn misaligned_series_intersect_to_common_days() {
        let mut bars = HashMap::new();
        // Days 1..=6 and days 3..=8 share days 3..=6.
        bars.insert("bitcoin".into(), make_bars(1, &[100.0; 6]));
        bars.insert("ethereum".into(), make_bars(3, &[50.0; 6]));
        let data = FixtureData { bars, failing: vec![] };
        let symbols = vec!["bitcoin".to_string(), "ethereum".to_string()];

        let result = run_portfolio(&data, &symbols, &strategy(), &params());

        assert_eq!(result.timestamps.len(), 4);
        assert_eq!(
            result.timestamps[0],
            NaiveDate::from_ymd_opt(2024, 1, 3)
                .unwrap()
                .and_hms_opt(0, 0, 0)
                .unwrap()
        );
        for asset in &result.assets {
            assert_eq!(asset.equity.len(), 4);
        }
    }

    #[test]
    fn duplicated_timestamps_keep_first_bar() {
        let mut btc = make_bars(1, &[100.0, 100.0, 110.0, 120.0]);
        // A second bar on day 2: only the first may survive alignment.
        let mut dup = btc[1].clone();
        dup.close = 999.0;
        btc.insert(2, dup);

        let mut bars = HashMap::new();
        bars.insert("bitcoin".into(), btc);
        bars.insert("ethereum".into(), make_bars(1, &[50.0, 50.0, 55.0, 60.0]));
        let data = FixtureData { bars, failing: vec![] };
        let symbols = vec!["bitcoin".to_string(), "ethereum".to_string()];

        let result = run_portfolio(&data, &symbols, &strategy(), &params());

        assert_eq!(result.timestamps.len(), 4);
        for asset in &result.assets {
            assert_eq!(asset.equity.len(), result.timestamps.len());
        }
        for i in 0..result.timestamps.len() {
            let sum: f64 = result.assets.iter().map(|a| a.equity[i]).sum();
            assert!((result.total_equity[i] - sum).abs() < 1e-9);
        }
    }

    #[test]
    fn disjoint_series_skip_everything() {
        let mut bars = HashMap::new();
        bars.insert("bitcoin".into(), make_bars(1, &[100.0, 100.0]));
        bars.insert("ethereum".into(), make_bars(20, &[50.0, 50.0]));
        let data = FixtureData { bars, failing: vec![] };
        let symbols = vec!["bitcoin".to_string(), "ethereum".to_string()];

        let result = run_portfolio(&data, &symbols, &strategy(), &params());

        assert!(result.assets.is_empty());
        assert!(result.timestamps.is_empty());
        assert!(result.total_equity.is_empty());
        assert_eq!(result.skipped.len(), 2);
        assert!(result
            .skipped
            .iter()
            .all(|s| s.reason == "no overlapping timestamps"));
    }

    #[test]
    fn all_symbols_failing_yields_empty_result() {
        let data = FixtureData {
            bars: HashMap::new(),
            failing: vec![],
        };
        let symbols = vec!["bitcoin".to_string()];
        let result = run_portfolio(&data, &symbols, &strategy(), &params());

        assert!(result.assets.is_empty());
        assert_eq!(result.skipped.len(), 1);
    }

    #[test]
    fn reports_sorted_by_symbol() {
        let mut bars = HashMap::new();
        bars.insert("zcash".into(), make_bars(1, &[10.0, 10.0, 11.0]));
        bars.insert("bitcoin".into(), make_bars(1, &[100.0, 100.0, 110.0]));
        let data = FixtureData { bars, failing: vec![] };
        let symbols = vec!["zcash".to_string(), "bitcoin".to_string()];

        let result = run_portfolio(&data, &symbols, &strategy(), &params());

        assert_eq!(result.assets[0].symbol, "bitcoin");
        assert_eq!(result.assets[1].symbol, "zcash");
    }
}
