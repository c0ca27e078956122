//! Backtest driver.
//!
//! [`run_backtest`] folds a validated bar series through the strategy engine
//! in a fixed per-bar order:
//!
//! 1. ATR over the current window (warm-up bars are skipped outright)
//! 2. equity point and per-bar return
//! 3. stop-loss, then exit signal, for the open position
//! 4. entries when flat and margin allows, systems in configured order
//! 5. otherwise a pyramid check
//!
//! Whatever is still open after the last bar is closed as `BACKTEST_END`.

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, info, info_span};

use super::error::TurtleError;
use super::metrics::{drawdown_curve, monthly_returns, DrawdownPoint, PerformanceReport, ReportParams};
use super::ohlcv::{validate_series, PriceBar};
use super::portfolio::{Account, EquityPoint};
use super::position::{Direction, ExitReason, System, TradeResult};
use super::strategy::{MarketContext, StrategyParams, TurtleStrategy};
use super::timeframe::Timeframe;
use crate::ports::journal_port::JournalPort;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestConfig {
    pub symbol: String,
    pub timeframe: Timeframe,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub initial_balance: f64,
    pub commission_rate: f64,
    pub leverage: f64,
    /// Evaluated in this order; the first system that fires wins the bar.
    pub systems: Vec<System>,
    pub risk_free_rate: f64,
    /// Bars consumed before any trading decision is made.
    pub warmup_bars: usize,
    pub strategy: StrategyParams,
}

impl BacktestConfig {
    /// Config for `symbol`/`timeframe` over the given window with every other
    /// field at its default.
    pub fn new(
        symbol: impl Into<String>,
        timeframe: Timeframe,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Self {
        BacktestConfig {
            symbol: symbol.into(),
            timeframe,
            start_date,
            end_date,
            initial_balance: 10_000.0,
            commission_rate: 0.0004,
            leverage: 1.0,
            systems: vec![System::One, System::Two],
            risk_free_rate: 0.02,
            warmup_bars: timeframe.atr_period(),
            strategy: StrategyParams::default(),
        }
    }

    pub fn span_days(&self) -> i64 {
        (self.end_date - self.start_date).num_days()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestResults {
    pub config: BacktestConfig,
    /// Timestamp of the first bar in the series.
    pub start: NaiveDateTime,
    /// Timestamp of the last bar in the series.
    pub end: NaiveDateTime,
    pub initial_balance: f64,
    pub final_balance: f64,
    pub total_commission: f64,
    pub report: PerformanceReport,
    pub trades: Vec<TradeResult>,
    pub equity_curve: Vec<EquityPoint>,
    pub bar_returns: Vec<f64>,
    pub drawdown_curve: Vec<DrawdownPoint>,
    pub monthly_returns: BTreeMap<String, f64>,
}

/// Refuses series that are too short, windows that are too narrow, and
/// malformed input, before a single bar is simulated.
pub fn check_history(bars: &[PriceBar], config: &BacktestConfig) -> Result<(), TurtleError> {
    validate_series(bars)?;

    let timeframe = config.timeframe;
    let minimum = timeframe.min_history_bars();
    if bars.len() < minimum {
        return Err(TurtleError::InsufficientHistory {
            timeframe: timeframe.to_string(),
            bars: bars.len(),
            minimum,
        });
    }

    let days = config.span_days();
    if days < timeframe.min_span_days() {
        return Err(TurtleError::InsufficientSpan {
            timeframe: timeframe.to_string(),
            days,
            minimum: timeframe.min_span_days(),
        });
    }

    Ok(())
}

pub fn run_backtest(
    bars: &[PriceBar],
    config: &BacktestConfig,
    journal: Box<dyn JournalPort>,
) -> Result<BacktestResults, TurtleError> {
    let span = info_span!("backtest", symbol = %config.symbol, timeframe = %config.timeframe);
    let _guard = span.enter();

    check_history(bars, config)?;

    let mut strategy = TurtleStrategy::new(config.strategy.clone(), config.timeframe, journal);
    let mut account = Account::new(config.initial_balance, config.commission_rate);
    let warmup = config.warmup_bars.max(strategy.atr_period());
    let symbol = config.symbol.as_str();
    let leverage = config.leverage;

    info!(bars = bars.len(), warmup, "starting backtest");

    for i in 0..bars.len() {
        let window = &bars[..=i];
        let bar = &bars[i];
        if i < warmup {
            debug!(index = i, "warm-up bar");
            continue;
        }

        let atr = strategy.atr(window)?;
        let price = bar.close;
        account.record_equity(bar.timestamp, strategy.unrealized_pnl(symbol, price));

        let ctx = |account: &Account| MarketContext {
            price,
            timestamp: bar.timestamp,
            balance: account.balance,
            leverage,
        };

        let exit_reason = strategy.position(symbol).and_then(|position| {
            if strategy.check_stop_loss(symbol, price) {
                Some(ExitReason::StopLoss)
            } else if strategy.check_exit_signal(position, window) {
                Some(ExitReason::Signal)
            } else {
                None
            }
        });
        if let Some(reason) = exit_reason {
            if let Some(trade) = strategy.execute_exit(symbol, reason, &ctx(&account)) {
                settle_exit(&mut account, &trade);
            }
        }

        if atr <= 0.0 {
            debug!(index = i, "flat window, no entries");
            continue;
        }

        match strategy.position(symbol) {
            None => {
                let used = Account::used_margin(
                    strategy.positions().values(),
                    config.strategy.margin_fraction,
                    leverage,
                );
                if !account.has_margin_headroom(used, config.strategy.margin_threshold) {
                    debug!(index = i, used, balance = account.balance, "margin exhausted");
                    continue;
                }
                'systems: for &system in &config.systems {
                    for direction in [Direction::Long, Direction::Short] {
                        if !strategy.check_entry_signal(symbol, window, system, direction) {
                            continue;
                        }
                        if let Some(unit) =
                            strategy.execute_entry(symbol, direction, system, atr, &ctx(&account))
                        {
                            account.charge_commission(unit.size * unit.entry_price);
                            break 'systems;
                        }
                    }
                }
            }
            Some(position) => {
                let direction = position.direction();
                let system = position.system();
                if strategy.check_pyramid_signal(symbol, price, atr) {
                    if let Some(unit) =
                        strategy.execute_entry(symbol, direction, system, atr, &ctx(&account))
                    {
                        account.charge_commission(unit.size * unit.entry_price);
                    }
                }
            }
        }
    }

    let (first, last) = match (bars.first(), bars.last()) {
        (Some(first), Some(last)) => (first, last),
        _ => {
            return Err(TurtleError::InvalidSeries {
                index: 0,
                reason: "empty price series".into(),
            });
        }
    };

    let open: Vec<String> = strategy.positions().keys().cloned().collect();
    for open_symbol in open {
        let ctx = MarketContext {
            price: last.close,
            timestamp: last.timestamp,
            balance: account.balance,
            leverage,
        };
        if let Some(trade) = strategy.execute_exit(&open_symbol, ExitReason::BacktestEnd, &ctx) {
            settle_exit(&mut account, &trade);
        }
    }

    let trades = strategy.trade_history().to_vec();
    let report = PerformanceReport::compute(
        &trades,
        &account,
        ReportParams {
            span_days: config.span_days() as f64,
            risk_free_rate: config.risk_free_rate,
            periods_per_year: config.timeframe.periods_per_year(),
        },
    );

    info!(
        trades = trades.len(),
        final_balance = account.balance,
        total_return = report.total_return,
        "backtest complete"
    );

    Ok(BacktestResults {
        config: config.clone(),
        start: first.timestamp,
        end: last.timestamp,
        initial_balance: account.initial_balance,
        final_balance: account.balance,
        total_commission: account.total_commission,
        drawdown_curve: drawdown_curve(&account.equity_curve),
        monthly_returns: monthly_returns(&account.equity_curve),
        report,
        trades,
        equity_curve: account.equity_curve,
        bar_returns: account.bar_returns,
    })
}

fn settle_exit(account: &mut Account, trade: &TradeResult) {
    account.realize(trade.pnl);
    account.charge_commission(trade.size * trade.exit_price);
}
