//! Trading units, open positions and closed trade results.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Direction {
    Long,
    Short,
}

impl Direction {
    pub fn opposite(self) -> Self {
        match self {
            Direction::Long => Direction::Short,
            Direction::Short => Direction::Long,
        }
    }

    /// +1 for LONG, -1 for SHORT.
    pub fn sign(self) -> f64 {
        match self {
            Direction::Long => 1.0,
            Direction::Short => -1.0,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Direction::Long => "LONG",
            Direction::Short => "SHORT",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Breakout rule-set. Serialized as the integers 1 and 2.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum System {
    One,
    Two,
}

impl System {
    pub fn number(self) -> u8 {
        match self {
            System::One => 1,
            System::Two => 2,
        }
    }
}

impl From<System> for u8 {
    fn from(system: System) -> u8 {
        system.number()
    }
}

impl TryFrom<u8> for System {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(System::One),
            2 => Ok(System::Two),
            other => Err(format!("unknown system {other}, expected 1 or 2")),
        }
    }
}

impl fmt::Display for System {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.number())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExitReason {
    Signal,
    StopLoss,
    BacktestEnd,
}

impl fmt::Display for ExitReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ExitReason::Signal => "SIGNAL",
            ExitReason::StopLoss => "STOP_LOSS",
            ExitReason::BacktestEnd => "BACKTEST_END",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradingUnit {
    pub entry_price: f64,
    pub entry_time: NaiveDateTime,
    pub size: f64,
    pub stop_loss: f64,
    pub system: System,
    /// 1-based position of this unit within its position.
    pub unit_number: usize,
}

impl TradingUnit {
    /// Moves the stop toward `new_stop` only if that is more favourable.
    /// Returns whether the stop changed.
    pub fn tighten_stop(&mut self, new_stop: f64, direction: Direction) -> bool {
        let tightened = match direction {
            Direction::Long => self.stop_loss.max(new_stop),
            Direction::Short => self.stop_loss.min(new_stop),
        };
        let changed = tightened != self.stop_loss;
        self.stop_loss = tightened;
        changed
    }

    pub fn is_stopped(&self, price: f64, direction: Direction) -> bool {
        match direction {
            Direction::Long => price <= self.stop_loss,
            Direction::Short => price >= self.stop_loss,
        }
    }
}

/// An open position: one or more units in a single direction.
///
/// `total_size` and `average_price` are kept in step with `units`; the only
/// way to change the unit list is [`Position::add_unit`].
#[derive(Debug, Clone, PartialEq)]
pub struct Position {
    symbol: String,
    direction: Direction,
    units: Vec<TradingUnit>,
    total_size: f64,
    average_price: f64,
}

impl Position {
    pub fn open(symbol: impl Into<String>, direction: Direction, unit: TradingUnit) -> Self {
        Position {
            symbol: symbol.into(),
            direction,
            total_size: unit.size,
            average_price: unit.entry_price,
            units: vec![unit],
        }
    }

    pub fn add_unit(&mut self, unit: TradingUnit) {
        let notional = self.average_price * self.total_size + unit.entry_price * unit.size;
        self.total_size += unit.size;
        self.average_price = notional / self.total_size;
        self.units.push(unit);
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn units(&self) -> &[TradingUnit] {
        &self.units
    }

    pub fn unit_count(&self) -> usize {
        self.units.len()
    }

    pub fn total_size(&self) -> f64 {
        self.total_size
    }

    pub fn average_price(&self) -> f64 {
        self.average_price
    }

    fn first_unit(&self) -> &TradingUnit {
        // open() always seeds one unit and units are never removed
        &self.units[0]
    }

    pub fn first_entry_price(&self) -> f64 {
        self.first_unit().entry_price
    }

    pub fn entry_time(&self) -> NaiveDateTime {
        self.first_unit().entry_time
    }

    /// The system that opened the position; it also selects the exit period.
    pub fn system(&self) -> System {
        self.first_unit().system
    }

    pub fn notional(&self) -> f64 {
        self.total_size * self.average_price
    }

    pub fn unrealized_pnl(&self, price: f64) -> f64 {
        self.direction.sign() * (price - self.average_price) * self.total_size
    }

    /// True once any single unit's stop has been crossed.
    pub fn should_stop_loss(&self, price: f64) -> bool {
        self.units
            .iter()
            .any(|unit| unit.is_stopped(price, self.direction))
    }

    /// Applies `new_stop` to every unit, never loosening. Returns whether any
    /// stop moved.
    pub fn tighten_stops(&mut self, new_stop: f64) -> bool {
        let direction = self.direction;
        self.units
            .iter_mut()
            .fold(false, |moved, unit| unit.tighten_stop(new_stop, direction) || moved)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeResult {
    pub symbol: String,
    pub direction: Direction,
    /// Size-weighted average entry price of the closed position.
    pub entry_price: f64,
    pub exit_price: f64,
    pub entry_time: NaiveDateTime,
    pub exit_time: NaiveDateTime,
    pub size: f64,
    pub pnl: f64,
    pub system: System,
    pub exit_reason: ExitReason,
    pub units: usize,
}

impl TradeResult {
    pub fn is_win(&self) -> bool {
        self.pnl > 0.0
    }

    pub fn duration_days(&self) -> f64 {
        (self.exit_time - self.entry_time).num_seconds() as f64 / 86_400.0
    }
}
