//! Performance metrics derived from a finished backtest.

use chrono::{Datelike, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::portfolio::{Account, EquityPoint};
use super::position::{Direction, System, TradeResult};

const DAYS_PER_YEAR: f64 = 365.25;

/// Win/loss ratios over a subset of trades (one direction or one system).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SubsetStats {
    pub trades: usize,
    pub winning_trades: usize,
    pub losing_trades: usize,
    pub win_rate: f64,
    #[serde(with = "infinite_f64")]
    pub profit_factor: f64,
    pub total_pnl: f64,
    pub avg_win: f64,
    pub avg_loss: f64,
}

impl SubsetStats {
    pub fn compute<'a>(trades: impl IntoIterator<Item = &'a TradeResult>) -> Self {
        let mut stats = SubsetStats::default();
        let mut gross_profit = 0.0_f64;
        let mut gross_loss = 0.0_f64;

        for trade in trades {
            stats.trades += 1;
            stats.total_pnl += trade.pnl;
            if trade.pnl > 0.0 {
                stats.winning_trades += 1;
                gross_profit += trade.pnl;
            } else {
                // breakeven counts as a loss but adds nothing to gross loss
                stats.losing_trades += 1;
                gross_loss += trade.pnl.abs();
            }
        }

        stats.win_rate = ratio(stats.winning_trades as f64, stats.trades as f64);
        stats.profit_factor = profit_factor(gross_profit, gross_loss);
        stats.avg_win = ratio(gross_profit, stats.winning_trades as f64);
        stats.avg_loss = ratio(gross_loss, stats.losing_trades as f64);
        stats
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DrawdownPoint {
    pub timestamp: NaiveDateTime,
    pub drawdown: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PerformanceReport {
    pub total_return: f64,
    pub annualized_return: f64,
    pub max_drawdown: f64,
    /// Longest run of bars spent below a previous equity peak.
    pub max_drawdown_duration: usize,
    pub sharpe_ratio: f64,
    pub sortino_ratio: f64,
    pub total_trades: usize,
    pub winning_trades: usize,
    pub losing_trades: usize,
    pub win_rate: f64,
    /// `f64::INFINITY` when there are winners and no losses.
    #[serde(with = "infinite_f64")]
    pub profit_factor: f64,
    pub total_pnl: f64,
    /// Mean winning pnl.
    pub avg_win: f64,
    /// Mean losing pnl, as a positive magnitude.
    pub avg_loss: f64,
    pub largest_win: f64,
    pub largest_loss: f64,
    /// Mean holding time in days.
    pub avg_trade_duration: f64,
    pub max_consecutive_wins: usize,
    pub max_consecutive_losses: usize,
    pub long: SubsetStats,
    pub short: SubsetStats,
    pub system_1: SubsetStats,
    pub system_2: SubsetStats,
}

/// Annualisation and risk-free inputs for [`PerformanceReport::compute`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReportParams {
    /// Calendar days covered by the run.
    pub span_days: f64,
    pub risk_free_rate: f64,
    pub periods_per_year: f64,
}

impl PerformanceReport {
    pub fn compute(trades: &[TradeResult], account: &Account, params: ReportParams) -> Self {
        let initial = account.initial_balance;
        let final_balance = account.balance;

        let total_return = ratio(final_balance - initial, initial);
        let annualized_return = annualize(initial, final_balance, params.span_days);

        let (max_drawdown, max_drawdown_duration) = compute_drawdown(&account.equity_curve);
        let rf_per_bar = if params.periods_per_year > 0.0 {
            params.risk_free_rate / params.periods_per_year
        } else {
            0.0
        };
        let (sharpe_ratio, sortino_ratio) =
            compute_risk_adjusted(&account.bar_returns, rf_per_bar, params.periods_per_year);

        let all = SubsetStats::compute(trades);
        let largest_win = trades.iter().map(|t| t.pnl).fold(0.0_f64, f64::max);
        let largest_loss = trades.iter().map(|t| -t.pnl).fold(0.0_f64, f64::max);
        let avg_trade_duration = ratio(
            trades.iter().map(TradeResult::duration_days).sum(),
            trades.len() as f64,
        );
        let (max_consecutive_wins, max_consecutive_losses) = compute_streaks(trades);

        PerformanceReport {
            total_return,
            annualized_return,
            max_drawdown,
            max_drawdown_duration,
            sharpe_ratio,
            sortino_ratio,
            total_trades: all.trades,
            winning_trades: all.winning_trades,
            losing_trades: all.losing_trades,
            win_rate: all.win_rate,
            profit_factor: all.profit_factor,
            total_pnl: all.total_pnl,
            avg_win: all.avg_win,
            avg_loss: all.avg_loss,
            largest_win,
            largest_loss,
            avg_trade_duration,
            max_consecutive_wins,
            max_consecutive_losses,
            long: SubsetStats::compute(trades.iter().filter(|t| t.direction == Direction::Long)),
            short: SubsetStats::compute(trades.iter().filter(|t| t.direction == Direction::Short)),
            system_1: SubsetStats::compute(trades.iter().filter(|t| t.system == System::One)),
            system_2: SubsetStats::compute(trades.iter().filter(|t| t.system == System::Two)),
        }
    }
}

fn ratio(numerator: f64, denominator: f64) -> f64 {
    if denominator != 0.0 {
        numerator / denominator
    } else {
        0.0
    }
}

fn profit_factor(gross_profit: f64, gross_loss: f64) -> f64 {
    if gross_loss > 0.0 {
        gross_profit / gross_loss
    } else if gross_profit > 0.0 {
        f64::INFINITY
    } else {
        0.0
    }
}

/// `(final / initial)^(365.25 / days) - 1`
fn annualize(initial: f64, final_balance: f64, days: f64) -> f64 {
    if initial <= 0.0 || days <= 0.0 {
        return 0.0;
    }
    let growth = final_balance / initial;
    if growth <= 0.0 {
        return -1.0;
    }
    let annualized = growth.powf(DAYS_PER_YEAR / days) - 1.0;
    if annualized.is_finite() { annualized } else { 0.0 }
}

/// (max drawdown fraction, longest underwater run in bars)
fn compute_drawdown(equity_curve: &[EquityPoint]) -> (f64, usize) {
    let mut peak = f64::NEG_INFINITY;
    let mut max_dd = 0.0_f64;
    let mut underwater = 0usize;
    let mut max_underwater = 0usize;

    for point in equity_curve {
        if point.equity >= peak {
            peak = point.equity;
            underwater = 0;
            continue;
        }
        if peak > 0.0 {
            max_dd = max_dd.max((peak - point.equity) / peak);
        }
        underwater += 1;
        max_underwater = max_underwater.max(underwater);
    }

    (max_dd, max_underwater)
}

/// Drawdown from the running peak at every equity point.
pub fn drawdown_curve(equity_curve: &[EquityPoint]) -> Vec<DrawdownPoint> {
    let mut peak = f64::NEG_INFINITY;
    equity_curve
        .iter()
        .map(|point| {
            peak = peak.max(point.equity);
            let drawdown = if peak > 0.0 {
                (peak - point.equity) / peak
            } else {
                0.0
            };
            DrawdownPoint {
                timestamp: point.timestamp,
                drawdown,
            }
        })
        .collect()
}

/// Return per calendar month keyed `YYYY-MM`: (last - first) / first of the
/// equity points falling in that month.
pub fn monthly_returns(equity_curve: &[EquityPoint]) -> BTreeMap<String, f64> {
    let mut buckets: BTreeMap<String, (f64, f64)> = BTreeMap::new();
    for point in equity_curve {
        let key = format!("{:04}-{:02}", point.timestamp.year(), point.timestamp.month());
        buckets
            .entry(key)
            .and_modify(|(_, last)| *last = point.equity)
            .or_insert((point.equity, point.equity));
    }
    buckets
        .into_iter()
        .map(|(month, (first, last))| (month, ratio(last - first, first)))
        .collect()
}

/// (sharpe, sortino), annualised by `sqrt(periods_per_year)`. Both are 0 with
/// fewer than two returns or a zero deviation.
fn compute_risk_adjusted(returns: &[f64], rf_per_bar: f64, periods_per_year: f64) -> (f64, f64) {
    if returns.len() < 2 {
        return (0.0, 0.0);
    }

    let n = returns.len() as f64;
    let mean = returns.iter().sum::<f64>() / n;
    let variance = returns.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / n;
    let stddev = variance.sqrt();
    let excess_return = mean - rf_per_bar;
    let scale = periods_per_year.max(0.0).sqrt();

    let sharpe = if stddev > 0.0 {
        excess_return / stddev * scale
    } else {
        0.0
    };

    let downside_variance = returns
        .iter()
        .filter(|&&r| r < rf_per_bar)
        .map(|&r| (r - rf_per_bar).powi(2))
        .sum::<f64>()
        / n;
    let downside_stddev = downside_variance.sqrt();

    let sortino = if downside_stddev > 0.0 {
        excess_return / downside_stddev * scale
    } else {
        0.0
    };

    (sharpe, sortino)
}

/// Longest winning and losing runs in trade order; `pnl <= 0` is a loss.
fn compute_streaks(trades: &[TradeResult]) -> (usize, usize) {
    let mut wins = 0usize;
    let mut losses = 0usize;
    let mut max_wins = 0usize;
    let mut max_losses = 0usize;

    for trade in trades {
        if trade.pnl > 0.0 {
            wins += 1;
            losses = 0;
            max_wins = max_wins.max(wins);
        } else {
            losses += 1;
            wins = 0;
            max_losses = max_losses.max(losses);
        }
    }

    (max_wins, max_losses)
}

/// Serializes infinities as the strings `"Infinity"` / `"-Infinity"`, which
/// plain JSON numbers cannot carry.
pub mod infinite_f64 {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
        if value.is_infinite() {
            let text = if *value > 0.0 { "Infinity" } else { "-Infinity" };
            serializer.serialize_str(text)
        } else {
            serializer.serialize_f64(*value)
        }
    }

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Repr {
        Number(f64),
        Text(String),
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
        match Repr::deserialize(deserializer)? {
            Repr::Number(value) => Ok(value),
            Repr::Text(text) => match text.as_str() {
                "Infinity" | "inf" => Ok(f64::INFINITY),
                "-Infinity" | "-inf" => Ok(f64::NEG_INFINITY),
                other => Err(serde::de::Error::custom(format!(
                    "expected a number or \"Infinity\", got {other:?}"
                ))),
            },
        }
    }
}
