//! Account state and equity tracking for a backtest run.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use super::position::Position;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EquityPoint {
    pub timestamp: NaiveDateTime,
    pub equity: f64,
}

/// Running balance plus the per-bar equity and return series.
///
/// The balance moves only on realized pnl and commission; equity points add
/// the unrealized pnl of whatever is open at the time they are recorded.
#[derive(Debug, Clone, PartialEq)]
pub struct Account {
    pub initial_balance: f64,
    pub balance: f64,
    pub commission_rate: f64,
    pub total_commission: f64,
    pub equity_curve: Vec<EquityPoint>,
    pub bar_returns: Vec<f64>,
}

impl Account {
    pub fn new(initial_balance: f64, commission_rate: f64) -> Self {
        Account {
            initial_balance,
            balance: initial_balance,
            commission_rate,
            total_commission: 0.0,
            equity_curve: Vec::new(),
            bar_returns: Vec::new(),
        }
    }

    /// Appends `balance + unrealized` to the curve along with its return
    /// against the previous point (the initial balance for the first one).
    pub fn record_equity(&mut self, timestamp: NaiveDateTime, unrealized: f64) -> f64 {
        let equity = self.balance + unrealized;
        let previous = self
            .equity_curve
            .last()
            .map_or(self.initial_balance, |p| p.equity);
        let bar_return = if previous != 0.0 {
            (equity - previous) / previous
        } else {
            0.0
        };
        self.bar_returns.push(bar_return);
        self.equity_curve.push(EquityPoint { timestamp, equity });
        equity
    }

    /// Deducts commission on `notional` and returns the fee.
    pub fn charge_commission(&mut self, notional: f64) -> f64 {
        let fee = notional.abs() * self.commission_rate;
        self.balance -= fee;
        self.total_commission += fee;
        fee
    }

    pub fn realize(&mut self, pnl: f64) {
        self.balance += pnl;
    }

    /// Margin tied up by open positions: `notional * margin_fraction / leverage`.
    pub fn used_margin<'a>(
        positions: impl IntoIterator<Item = &'a Position>,
        margin_fraction: f64,
        leverage: f64,
    ) -> f64 {
        positions
            .into_iter()
            .map(|p| p.notional() * margin_fraction / leverage)
            .sum()
    }

    /// True while `used_margin / balance` stays under `threshold`.
    /// An exhausted balance can never open anything.
    pub fn has_margin_headroom(&self, used_margin: f64, threshold: f64) -> bool {
        if self.balance <= 0.0 {
            return false;
        }
        used_margin / self.balance < threshold
    }
}
