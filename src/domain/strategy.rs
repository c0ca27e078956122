//! Turtle strategy engine.
//!
//! [`TurtleStrategy`] owns every open position and the closed-trade history.
//! It answers signal questions for the backtest driver (entry, exit,
//! stop-loss, pyramid) and executes entries and exits, reporting each one to
//! the journal port.
//!
//! Per-symbol lifecycle: no position → open (1 unit) → pyramided (2..=max
//! units) → closed. A closed position is removed from the map immediately.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, info, warn};

use super::error::TurtleError;
use super::indicator::{average_true_range, check_breakout};
use super::ohlcv::PriceBar;
use super::position::{Direction, ExitReason, Position, System, TradeResult, TradingUnit};
use super::timeframe::Timeframe;
use crate::ports::journal_port::{ExitEvent, JournalEvent, JournalPort};

const SYSTEM_1_ENTRY: usize = 20;
const SYSTEM_1_EXIT: usize = 10;
const SYSTEM_2_ENTRY: usize = 55;
const SYSTEM_2_EXIT: usize = 20;
const MIN_PERIOD: usize = 2;
const MAX_SYSTEM_1_PERIOD: usize = 100;
const MAX_SYSTEM_2_ENTRY_PERIOD: usize = 200;
const MAX_EXIT_PERIOD: usize = 100;

/// Strategy constants. Defaults are the classic turtle values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategyParams {
    /// Fraction of the balance risked per unit.
    pub risk_per_trade: f64,
    /// Stop distance in ATRs.
    pub stop_multiplier: f64,
    /// Favourable move, in ATRs per held unit, needed to add a unit.
    pub pyramid_multiplier: f64,
    pub max_units_per_market: usize,
    /// New positions are refused once used margin / balance reaches this.
    pub margin_threshold: f64,
    /// Share of notional held as margin (before dividing by leverage).
    pub margin_fraction: f64,
    pub min_unit_size: f64,
    /// Pull earlier units' stops up to the newest unit's stop when pyramiding.
    pub trail_stops_on_pyramid: bool,
}

impl Default for StrategyParams {
    fn default() -> Self {
        StrategyParams {
            risk_per_trade: 0.01,
            stop_multiplier: 2.0,
            pyramid_multiplier: 0.5,
            max_units_per_market: 4,
            margin_threshold: 0.8,
            margin_fraction: 0.1,
            min_unit_size: 0.001,
            trail_stops_on_pyramid: true,
        }
    }
}

/// Market state an entry or exit is filled against.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MarketContext {
    pub price: f64,
    pub timestamp: NaiveDateTime,
    pub balance: f64,
    pub leverage: f64,
}

pub struct TurtleStrategy {
    params: StrategyParams,
    timeframe: Timeframe,
    positions: BTreeMap<String, Position>,
    trade_history: Vec<TradeResult>,
    last_trade_loss: HashMap<String, bool>,
    trade_ids: HashMap<String, String>,
    journal: Box<dyn JournalPort>,
}

impl TurtleStrategy {
    pub fn new(params: StrategyParams, timeframe: Timeframe, journal: Box<dyn JournalPort>) -> Self {
        TurtleStrategy {
            params,
            timeframe,
            positions: BTreeMap::new(),
            trade_history: Vec::new(),
            last_trade_loss: HashMap::new(),
            trade_ids: HashMap::new(),
            journal,
        }
    }

    pub fn params(&self) -> &StrategyParams {
        &self.params
    }

    pub fn timeframe(&self) -> Timeframe {
        self.timeframe
    }

    pub fn entry_period(&self, system: System) -> usize {
        let multiplier = self.timeframe.breakout_multiplier();
        match system {
            System::One => (SYSTEM_1_ENTRY * multiplier).clamp(MIN_PERIOD, MAX_SYSTEM_1_PERIOD),
            System::Two => {
                (SYSTEM_2_ENTRY * multiplier).clamp(MIN_PERIOD, MAX_SYSTEM_2_ENTRY_PERIOD)
            }
        }
    }

    pub fn exit_period(&self, system: System) -> usize {
        let base = match system {
            System::One => SYSTEM_1_EXIT,
            System::Two => SYSTEM_2_EXIT,
        };
        (base * self.timeframe.breakout_multiplier()).clamp(MIN_PERIOD, MAX_EXIT_PERIOD)
    }

    pub fn atr_period(&self) -> usize {
        self.timeframe.atr_period()
    }

    /// ATR over the timeframe's period, ending at the last bar.
    pub fn atr(&self, bars: &[PriceBar]) -> Result<f64, TurtleError> {
        average_true_range(bars, self.atr_period())
    }

    /// `max(min_unit_size, balance * risk_per_trade / atr * leverage)`
    pub fn calculate_unit_size(
        &self,
        balance: f64,
        atr: f64,
        leverage: f64,
    ) -> Result<f64, TurtleError> {
        if !atr.is_finite() || atr <= 0.0 {
            return Err(TurtleError::InvalidAtr { atr });
        }
        let risk_amount = balance * self.params.risk_per_trade;
        Ok((risk_amount / atr * leverage).max(self.params.min_unit_size))
    }

    pub fn calculate_stop_loss(&self, entry_price: f64, atr: f64, direction: Direction) -> f64 {
        entry_price - direction.sign() * self.params.stop_multiplier * atr
    }

    /// System 1 is blocked while the symbol's last closed trade was a loss.
    pub fn check_entry_signal(
        &self,
        symbol: &str,
        bars: &[PriceBar],
        system: System,
        direction: Direction,
    ) -> bool {
        let breakout = check_breakout(bars, self.entry_period(system), direction);
        let signal = match system {
            System::One => breakout && !self.last_trade_was_loss(symbol),
            System::Two => breakout,
        };
        if breakout {
            debug!(symbol, %system, %direction, signal, "entry breakout");
        }
        signal
    }

    /// Opposite-direction breakout over the opening system's exit period.
    pub fn check_exit_signal(&self, position: &Position, bars: &[PriceBar]) -> bool {
        let period = self.exit_period(position.system());
        check_breakout(bars, period, position.direction().opposite())
    }

    pub fn check_stop_loss(&self, symbol: &str, price: f64) -> bool {
        self.positions
            .get(symbol)
            .is_some_and(|position| position.should_stop_loss(price))
    }

    /// Needs `pyramid_multiplier * atr * units` of favourable move from the
    /// first unit's entry, and room under the unit cap.
    pub fn check_pyramid_signal(&self, symbol: &str, price: f64, atr: f64) -> bool {
        let Some(position) = self.positions.get(symbol) else {
            return false;
        };
        if position.unit_count() >= self.params.max_units_per_market {
            return false;
        }
        let moved = position.direction().sign() * (price - position.first_entry_price());
        let required = self.params.pyramid_multiplier * atr * position.unit_count() as f64;
        moved >= required
    }

    /// Trails every unit's stop toward `new_stop`; stops never loosen.
    pub fn update_stop_losses(&mut self, symbol: &str, new_stop: f64) -> bool {
        match self.positions.get_mut(symbol) {
            Some(position) => position.tighten_stops(new_stop),
            None => false,
        }
    }

    /// Opens a position or adds a unit to it.
    ///
    /// Returns `None` without touching state when the entry is not allowed:
    /// non-positive ATR, an open position in the other direction, or the unit
    /// cap already reached.
    pub fn execute_entry(
        &mut self,
        symbol: &str,
        direction: Direction,
        system: System,
        atr: f64,
        ctx: &MarketContext,
    ) -> Option<TradingUnit> {
        let size = match self.calculate_unit_size(ctx.balance, atr, ctx.leverage) {
            Ok(size) => size,
            Err(e) => {
                warn!(symbol, %direction, "entry refused: {e}");
                return None;
            }
        };

        let unit_number = match self.positions.get(symbol) {
            Some(existing) if existing.direction() != direction => {
                warn!(
                    symbol,
                    %direction,
                    open = %existing.direction(),
                    "entry refused: opposite position open"
                );
                return None;
            }
            Some(existing) if existing.unit_count() >= self.params.max_units_per_market => {
                warn!(symbol, units = existing.unit_count(), "entry refused: unit cap reached");
                return None;
            }
            Some(existing) => existing.unit_count() + 1,
            None => 1,
        };

        let stop_loss = self.calculate_stop_loss(ctx.price, atr, direction);
        let unit = TradingUnit {
            entry_price: ctx.price,
            entry_time: ctx.timestamp,
            size,
            stop_loss,
            system,
            unit_number,
        };

        let event = JournalEvent {
            timestamp: ctx.timestamp,
            symbol: symbol.to_string(),
            direction,
            price: ctx.price,
            size,
            stop_loss,
            atr,
            leverage: ctx.leverage,
            balance: ctx.balance,
            system,
            unit_number,
            notes: String::new(),
        };

        match self.positions.get_mut(symbol) {
            Some(position) => {
                position.add_unit(unit.clone());
                if self.params.trail_stops_on_pyramid {
                    position.tighten_stops(stop_loss);
                }
                info!(
                    symbol,
                    %direction,
                    unit = unit_number,
                    size,
                    price = ctx.price,
                    stop = stop_loss,
                    "pyramid"
                );
                if let Some(trade_id) = self.trade_ids.get(symbol) {
                    let event = JournalEvent {
                        notes: format!("unit {unit_number} pyramid"),
                        ..event
                    };
                    if let Err(e) = self.journal.log_pyramid(trade_id, &event) {
                        warn!(symbol, "journal pyramid failed: {e}");
                    }
                }
            }
            None => {
                self.positions.insert(
                    symbol.to_string(),
                    Position::open(symbol, direction, unit.clone()),
                );
                info!(
                    symbol,
                    %direction,
                    %system,
                    size,
                    price = ctx.price,
                    stop = stop_loss,
                    leverage = ctx.leverage,
                    "entry"
                );
                let event = JournalEvent {
                    notes: format!("system {system} entry"),
                    ..event
                };
                match self.journal.log_entry(&event) {
                    Ok(trade_id) => {
                        self.trade_ids.insert(symbol.to_string(), trade_id);
                    }
                    Err(e) => warn!(symbol, "journal entry failed: {e}"),
                }
            }
        }

        Some(unit)
    }

    /// Closes the whole position at `ctx.price`. `None` if nothing is open.
    pub fn execute_exit(
        &mut self,
        symbol: &str,
        reason: ExitReason,
        ctx: &MarketContext,
    ) -> Option<TradeResult> {
        let Some(position) = self.positions.remove(symbol) else {
            debug!(symbol, %reason, "exit ignored: no open position");
            return None;
        };

        let pnl = position.unrealized_pnl(ctx.price);
        let trade = TradeResult {
            symbol: symbol.to_string(),
            direction: position.direction(),
            entry_price: position.average_price(),
            exit_price: ctx.price,
            entry_time: position.entry_time(),
            exit_time: ctx.timestamp,
            size: position.total_size(),
            pnl,
            system: position.system(),
            exit_reason: reason,
            units: position.unit_count(),
        };

        self.last_trade_loss.insert(symbol.to_string(), pnl < 0.0);

        if let Some(trade_id) = self.trade_ids.remove(symbol) {
            let event = ExitEvent {
                timestamp: ctx.timestamp,
                symbol: symbol.to_string(),
                direction: position.direction(),
                entry_price: position.average_price(),
                exit_price: ctx.price,
                size: position.total_size(),
                pnl,
                balance: ctx.balance,
                reason,
                leverage: ctx.leverage,
                notes: format!("closed {} units", position.unit_count()),
            };
            if let Err(e) = self.journal.log_exit(&trade_id, &event) {
                warn!(symbol, "journal exit failed: {e}");
            }
        }

        info!(
            symbol,
            direction = %position.direction(),
            size = position.total_size(),
            price = ctx.price,
            pnl,
            %reason,
            "exit"
        );

        self.trade_history.push(trade.clone());
        Some(trade)
    }

    pub fn unrealized_pnl(&self, symbol: &str, price: f64) -> f64 {
        self.positions
            .get(symbol)
            .map_or(0.0, |position| position.unrealized_pnl(price))
    }

    pub fn positions(&self) -> &BTreeMap<String, Position> {
        &self.positions
    }

    pub fn position(&self, symbol: &str) -> Option<&Position> {
        self.positions.get(symbol)
    }

    pub fn has_position(&self, symbol: &str) -> bool {
        self.positions.contains_key(symbol)
    }

    pub fn trade_history(&self) -> &[TradeResult] {
        &self.trade_history
    }

    pub fn last_trade_was_loss(&self, symbol: &str) -> bool {
        self.last_trade_loss.get(symbol).copied().unwrap_or(false)
    }

    /// Forgets positions, history, loss flags and trade ids.
    pub fn reset(&mut self) {
        self.positions.clear();
        self.trade_history.clear();
        self.last_trade_loss.clear();
        self.trade_ids.clear();
    }
}
