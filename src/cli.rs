//! CLI definition and dispatch.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;

use crate::adapters::csv_data_adapter::CsvDataAdapter;
use crate::adapters::csv_trade_log::CsvTradeLog;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::domain::backtest::{run_backtest, BacktestParams};
use crate::domain::error::CoinsimError;
use crate::domain::metrics::PerformanceSummary;
use crate::domain::portfolio::{run_portfolio, PortfolioParams};
use crate::domain::strategy::StrategyKind;
use crate::ports::config_port::ConfigPort;
use crate::ports::data_port::MarketDataPort;
use crate::ports::trade_log_port::TradeLogPort;

#[derive(Parser, Debug)]
#[command(name = "coinsim", about = "Crypto strategy backtester and paper trading simulator")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Backtest one symbol
    Backtest {
        #[arg(short, long)]
        config: PathBuf,
        /// Override the configured symbol
        #[arg(long)]
        symbol: Option<String>,
        /// Append executed trades to this CSV file
        #[arg(long)]
        trade_log: Option<PathBuf>,
    },
    /// Backtest every configured symbol as a portfolio
    Portfolio {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// List symbols available in the data directory
    ListSymbols {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Validate a configuration file without running anything
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
}

pub fn run(cli: Cli) -> ExitCode {
    match cli.command {
        Command::Backtest {
            config,
            symbol,
            trade_log,
        } => run_backtest_command(&config, symbol.as_deref(), trade_log.as_ref()),
        Command::Portfolio { config } => run_portfolio_command(&config),
        Command::ListSymbols { config } => run_list_symbols(&config),
        Command::Validate { config } => run_validate(&config),
    }
}

pub fn load_config(path: &PathBuf) -> Result<FileConfigAdapter, ExitCode> {
    FileConfigAdapter::from_file(path).map_err(|e| {
        let err = CoinsimError::ConfigParse {
            file: path.display().to_string(),
            reason: e.to_string(),
        };
        eprintln!("error: {err}");
        ExitCode::from(&err)
    })
}

fn run_backtest_command(
    config_path: &PathBuf,
    symbol_override: Option<&str>,
    trade_log_path: Option<&PathBuf>,
) -> ExitCode {
    eprintln!("Loading config from {}", config_path.display());
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };

    let strategy = match build_strategy(&adapter) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };
    let params = match build_backtest_params(&adapter, symbol_override, &strategy) {
        Ok(p) => p,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };

    let data = match data_adapter(&adapter) {
        Ok(d) => d,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };

    eprintln!("Fetching {} history...", params.symbol);
    let bars = match data.fetch_ohlcv(&params.symbol) {
        Ok(bars) => bars,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };

    eprintln!(
        "Running {} strategy over {} bars",
        strategy.name(),
        bars.len()
    );
    let signals = strategy.signals(&bars);
    let result = match run_backtest(&bars, &signals, &params) {
        Ok(r) => r,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };

    if let Some(path) = trade_log_path {
        let log = match CsvTradeLog::create(path) {
            Ok(l) => l,
            Err(e) => {
                eprintln!("error: {e}");
                return (&e).into();
            }
        };
        for trade in &result.trades {
            if let Err(e) = log.append(trade) {
                eprintln!("error: {e}");
                return (&e).into();
            }
        }
        eprintln!("Trade log written to: {}", path.display());
    }

    let curve: Vec<f64> = result.equity.iter().map(|p| p.equity).collect();
    let summary = PerformanceSummary::compute(
        &result.trades,
        &curve,
        params.initial_balance,
        result.final_value,
    );
    print_summary(&params.symbol, &summary, result.final_value);
    ExitCode::SUCCESS
}

fn print_summary(symbol: &str, summary: &PerformanceSummary, final_value: f64) {
    eprintln!("\n=== {symbol} Results ===");
    eprintln!("Final Value:      ${final_value:.2}");
    let sign = if summary.pnl >= 0.0 { "+" } else { "" };
    eprintln!("PnL:              {}{:.2} ({}{:.2}%)", sign, summary.pnl, sign, summary.return_pct);
    eprintln!("Total Trades:     {}", summary.total_trades);
    eprintln!("Win Rate:         {:.1}%", summary.win_rate);
    eprintln!("Avg Win:          {:.2}", summary.avg_win);
    eprintln!("Avg Loss:         {:.2}", summary.avg_loss);
    eprintln!("Sharpe Ratio:     {:.2}", summary.sharpe_ratio);
    eprintln!("Max Drawdown:     {:.1}%", summary.max_drawdown);
}

fn run_portfolio_command(config_path: &PathBuf) -> ExitCode {
    eprintln!("Loading config from {}", config_path.display());
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };

    let strategy = match build_strategy(&adapter) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };
    let params = match build_portfolio_params(&adapter) {
        Ok(p) => p,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };
    let symbols = match configured_symbols(&adapter) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };
    let data = match data_adapter(&adapter) {
        Ok(d) => d,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };

    eprintln!(
        "Running {} strategy over {} symbols",
        strategy.name(),
        symbols.len()
    );
    let result = run_portfolio(&data, &symbols, &strategy, &params);

    eprintln!("\n=== Portfolio Results ===");
    if let (Some(first), Some(last)) = (result.total_equity.first(), result.total_equity.last()) {
        eprintln!("Initial Equity:   ${first:.2}");
        eprintln!("Final Equity:     ${last:.2}");
        let dd = result.drawdown.iter().copied().fold(0.0_f64, f64::min);
        eprintln!("Max Drawdown:     {:.1}%", dd * 100.0);
        eprintln!("Common Bars:      {}", result.timestamps.len());
    } else {
        eprintln!("No overlapping data across the configured symbols");
    }

    if !result.assets.is_empty() {
        eprintln!("\n=== Per-Asset Summary ===");
        for asset in &result.assets {
            let sign = if asset.pnl >= 0.0 { "+" } else { "" };
            eprintln!(
                "  {}:  {} trades, {:.1}% win rate, sharpe {:.2}, {}${:.2}",
                asset.symbol,
                asset.total_trades,
                asset.win_rate,
                asset.sharpe_ratio,
                sign,
                asset.pnl,
            );
        }
    }
    for skipped in &result.skipped {
        eprintln!("warning: skipped {} ({})", skipped.symbol, skipped.reason);
    }
    ExitCode::SUCCESS
}

fn run_list_symbols(config_path: &PathBuf) -> ExitCode {
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };
    let data = match data_adapter(&adapter) {
        Ok(d) => d,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };
    match data.list_symbols() {
        Ok(symbols) => {
            for symbol in symbols {
                println!("{symbol}");
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("error: {e}");
            (&e).into()
        }
    }
}

fn run_validate(config_path: &PathBuf) -> ExitCode {
    eprintln!("Loading config from {}", config_path.display());
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };

    let strategy = match build_strategy(&adapter) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };
    if let Err(e) = build_backtest_params(&adapter, None, &strategy) {
        eprintln!("error: {e}");
        return (&e).into();
    }
    if let Err(e) = build_portfolio_params(&adapter) {
        eprintln!("error: {e}");
        return (&e).into();
    }
    if let Err(e) = configured_symbols(&adapter) {
        eprintln!("error: {e}");
        return (&e).into();
    }
    eprintln!("Config validated successfully");
    ExitCode::SUCCESS
}

fn data_adapter(adapter: &dyn ConfigPort) -> Result<CsvDataAdapter, CoinsimError> {
    let csv_dir = adapter
        .get_string("data", "csv_dir")
        .ok_or_else(|| CoinsimError::ConfigMissing {
            section: "data".into(),
            key: "csv_dir".into(),
        })?;
    Ok(CsvDataAdapter::new(PathBuf::from(csv_dir)))
}

pub fn configured_symbols(adapter: &dyn ConfigPort) -> Result<Vec<String>, CoinsimError> {
    let raw = adapter
        .get_string("data", "symbols")
        .ok_or_else(|| CoinsimError::ConfigMissing {
            section: "data".into(),
            key: "symbols".into(),
        })?;
    let symbols: Vec<String> = raw
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect();
    if symbols.is_empty() {
        return Err(CoinsimError::ConfigInvalid {
            section: "data".into(),
            key: "symbols".into(),
            reason: "no symbols configured".into(),
        });
    }
    Ok(symbols)
}

fn fraction(
    adapter: &dyn ConfigPort,
    section: &str,
    key: &str,
    default: f64,
) -> Result<f64, CoinsimError> {
    let value = adapter.get_double(section, key, default);
    if !(0.0..1.0).contains(&value) {
        return Err(CoinsimError::ConfigInvalid {
            section: section.into(),
            key: key.into(),
            reason: format!("must be in [0, 1), got {value}"),
        });
    }
    Ok(value)
}

pub fn build_backtest_params(
    adapter: &dyn ConfigPort,
    symbol_override: Option<&str>,
    strategy: &StrategyKind,
) -> Result<BacktestParams, CoinsimError> {
    let symbol = match symbol_override {
        Some(s) => s.to_string(),
        None => adapter
            .get_string("backtest", "symbol")
            .ok_or_else(|| CoinsimError::ConfigMissing {
                section: "backtest".into(),
                key: "symbol".into(),
            })?,
    };

    let initial_balance = adapter.get_double("backtest", "initial_balance", 10_000.0);
    if initial_balance <= 0.0 {
        return Err(CoinsimError::ConfigInvalid {
            section: "backtest".into(),
            key: "initial_balance".into(),
            reason: format!("must be positive, got {initial_balance}"),
        });
    }

    Ok(BacktestParams {
        symbol,
        initial_balance,
        stop_loss_pct: fraction(adapter, "backtest", "stop_loss_pct", 0.0)?,
        take_profit_pct: fraction(adapter, "backtest", "take_profit_pct", 0.0)?,
        exit_priority: strategy.exit_priority(),
    })
}

pub fn build_portfolio_params(adapter: &dyn ConfigPort) -> Result<PortfolioParams, CoinsimError> {
    let initial_balance = adapter.get_double("backtest", "initial_balance", 10_000.0);
    if initial_balance <= 0.0 {
        return Err(CoinsimError::ConfigInvalid {
            section: "backtest".into(),
            key: "initial_balance".into(),
            reason: format!("must be positive, got {initial_balance}"),
        });
    }

    let position_size = adapter.get_double("portfolio", "position_size", 0.25);
    if !(position_size > 0.0 && position_size <= 1.0) {
        return Err(CoinsimError::ConfigInvalid {
            section: "portfolio".into(),
            key: "position_size".into(),
            reason: format!("must be in (0, 1], got {position_size}"),
        });
    }

    let rebalance_days = adapter.get_int("portfolio", "rebalance_days", 30);
    if rebalance_days <= 0 {
        return Err(CoinsimError::ConfigInvalid {
            section: "portfolio".into(),
            key: "rebalance_days".into(),
            reason: format!("must be positive, got {rebalance_days}"),
        });
    }

    Ok(PortfolioParams {
        initial_balance,
        position_size,
        stop_loss_pct: fraction(adapter, "backtest", "stop_loss_pct", 0.0)?,
        take_profit_pct: fraction(adapter, "backtest", "take_profit_pct", 0.0)?,
        rebalance_days: rebalance_days as u32,
    })
}

fn window(
    adapter: &dyn ConfigPort,
    key: &str,
    default: i64,
) -> Result<usize, CoinsimError> {
    let value = adapter.get_int("strategy", key, default);
    if value <= 0 {
        return Err(CoinsimError::ConfigInvalid {
            section: "strategy".into(),
            key: key.into(),
            reason: format!("must be positive, got {value}"),
        });
    }
    Ok(value as usize)
}

pub fn build_strategy(adapter: &dyn ConfigPort) -> Result<StrategyKind, CoinsimError> {
    let name = adapter
        .get_string("strategy", "name")
        .ok_or_else(|| CoinsimError::ConfigMissing {
            section: "strategy".into(),
            key: "name".into(),
        })?;

    let strategy = match name.as_str() {
        "ema" => {
            let fast = window(adapter, "fast", 9)?;
            let slow = window(adapter, "slow", 21)?;
            if fast >= slow {
                return Err(CoinsimError::ConfigInvalid {
                    section: "strategy".into(),
                    key: "fast".into(),
                    reason: format!("fast ({fast}) must be less than slow ({slow})"),
                });
            }
            StrategyKind::EmaCross {
                fast,
                slow,
                rsi_period: window(adapter, "rsi_period", 14)?,
                // Oversold gate: only enter an uptrend while RSI < 30.
                rsi_threshold: adapter.get_double("strategy", "rsi_threshold", 30.0),
            }
        }
        "rsi" => StrategyKind::RsiReversion {
            period: window(adapter, "period", 14)?,
            buy_below: adapter.get_double("strategy", "buy_below", 30.0),
            sell_above: adapter.get_double("strategy", "sell_above", 70.0),
        },
        "breakout" => StrategyKind::Breakout {
            window: window(adapter, "window", 20)?,
        },
        "macd" => {
            let fast = window(adapter, "fast", 12)?;
            let slow = window(adapter, "slow", 26)?;
            if fast >= slow {
                return Err(CoinsimError::ConfigInvalid {
                    section: "strategy".into(),
                    key: "fast".into(),
                    reason: format!("fast ({fast}) must be less than slow ({slow})"),
                });
            }
            StrategyKind::MacdCross {
                fast,
                slow,
                signal: window(adapter, "signal", 9)?,
            }
        }
        "bollinger" => {
            let num_std = adapter.get_double("strategy", "num_std", 2.0);
            if num_std <= 0.0 {
                return Err(CoinsimError::ConfigInvalid {
                    section: "strategy".into(),
                    key: "num_std".into(),
                    reason: format!("must be positive, got {num_std}"),
                });
            }
            StrategyKind::Bollinger {
                window: window(adapter, "window", 20)?,
                num_std,
            }
        }
        other => {
            return Err(CoinsimError::ConfigInvalid {
                section: "strategy".into(),
                key: "name".into(),
                reason: format!(
                    "unknown strategy '{other}' (expected ema, rsi, breakout, macd or bollinger)"
                ),
            });
        }
    };
    Ok(strategy)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::backtest::ExitPriority;

    const SAMPLE: &str = "\
[data]
csv_dir = ./data
symbols = bitcoin, ethereum

[backtest]
symbol = bitcoin
initial_balance = 5000.0
stop_loss_pct = 0.10
take_profit_pct = 0.05

[portfolio]
position_size = 0.5
rebalance_days = 30

[strategy]
name = ema
fast = 9
slow = 21
rsi_period = 14
rsi_threshold = 70.0
";

    fn config(content: &str) -> FileConfigAdapter {
        FileConfigAdapter::from_string(content).unwrap()
    }

    #[test]
    fn build_strategy_from_config() {
        let strategy = build_strategy(&config(SAMPLE)).unwrap();
        assert_eq!(
            strategy,
            StrategyKind::EmaCross {
                fast: 9,
                slow: 21,
                rsi_period: 14,
                rsi_threshold: 70.0,
            }
        );
    }

    #[test]
    fn build_strategy_unknown_name() {
        let err = build_strategy(&config("[strategy]\nname = magic\n")).unwrap_err();
        assert!(matches!(err, CoinsimError::ConfigInvalid { .. }));
        assert!(err.to_string().contains("magic"));
    }

    #[test]
    fn build_strategy_requires_name() {
        let err = build_strategy(&config("[strategy]\nfast = 9\n")).unwrap_err();
        assert!(matches!(err, CoinsimError::ConfigMissing { .. }));
    }

    #[test]
    fn build_strategy_rejects_inverted_emas() {
        let err =
            build_strategy(&config("[strategy]\nname = ema\nfast = 30\nslow = 10\n")).unwrap_err();
        assert!(err.to_string().contains("fast"));
    }

    #[test]
    fn build_strategy_defaults() {
        let strategy = build_strategy(&config("[strategy]\nname = breakout\n")).unwrap();
        assert_eq!(strategy, StrategyKind::Breakout { window: 20 });
    }

    #[test]
    fn ema_default_rsi_gate_is_oversold() {
        let strategy = build_strategy(&config("[strategy]\nname = ema\n")).unwrap();
        assert_eq!(
            strategy,
            StrategyKind::EmaCross {
                fast: 9,
                slow: 21,
                rsi_period: 14,
                rsi_threshold: 30.0,
            }
        );
    }

    #[test]
    fn backtest_params_from_config() {
        let adapter = config(SAMPLE);
        let strategy = build_strategy(&adapter).unwrap();
        let params = build_backtest_params(&adapter, None, &strategy).unwrap();

        assert_eq!(params.symbol, "bitcoin");
        assert!((params.initial_balance - 5_000.0).abs() < f64::EPSILON);
        assert!((params.stop_loss_pct - 0.10).abs() < f64::EPSILON);
        assert!((params.take_profit_pct - 0.05).abs() < f64::EPSILON);
        assert_eq!(params.exit_priority, ExitPriority::RiskFirst);
    }

    #[test]
    fn backtest_params_symbol_override() {
        let adapter = config(SAMPLE);
        let strategy = build_strategy(&adapter).unwrap();
        let params = build_backtest_params(&adapter, Some("solana"), &strategy).unwrap();
        assert_eq!(params.symbol, "solana");
    }

    #[test]
    fn backtest_params_rejects_bad_fractions() {
        let adapter = config(
            "[backtest]\nsymbol = bitcoin\ninitial_balance = 1000\nstop_loss_pct = 1.5\n\n[strategy]\nname = breakout\n",
        );
        let strategy = build_strategy(&adapter).unwrap();
        let err = build_backtest_params(&adapter, None, &strategy).unwrap_err();
        assert!(matches!(err, CoinsimError::ConfigInvalid { .. }));
    }

    #[test]
    fn backtest_params_rejects_non_positive_balance() {
        let adapter = config(
            "[backtest]\nsymbol = bitcoin\ninitial_balance = -5\n\n[strategy]\nname = breakout\n",
        );
        let strategy = build_strategy(&adapter).unwrap();
        let err = build_backtest_params(&adapter, None, &strategy).unwrap_err();
        assert!(err.to_string().contains("initial_balance"));
    }

    #[test]
    fn portfolio_params_from_config() {
        let params = build_portfolio_params(&config(SAMPLE)).unwrap();
        assert!((params.initial_balance - 5_000.0).abs() < f64::EPSILON);
        assert!((params.position_size - 0.5).abs() < f64::EPSILON);
        assert_eq!(params.rebalance_days, 30);
    }

    #[test]
    fn portfolio_params_rejects_oversized_position() {
        let err = build_portfolio_params(&config("[portfolio]\nposition_size = 1.5\n")).unwrap_err();
        assert!(err.to_string().contains("position_size"));
    }

    #[test]
    fn configured_symbols_trims_and_splits() {
        let symbols = configured_symbols(&config(SAMPLE)).unwrap();
        assert_eq!(symbols, vec!["bitcoin", "ethereum"]);
    }

    #[test]
    fn configured_symbols_rejects_empty_list() {
        let err = configured_symbols(&config("[data]\nsymbols = , ,\n")).unwrap_err();
        assert!(matches!(err, CoinsimError::ConfigInvalid { .. }));
    }

    #[test]
    fn configured_symbols_missing_key() {
        let err = configured_symbols(&config("[data]\ncsv_dir = ./data\n")).unwrap_err();
        assert!(matches!(err, CoinsimError::ConfigMissing { .. }));
    }
}
