//! Trade journal port trait.
//!
//! The strategy engine reports every entry, pyramid and exit here. It keeps
//! the trade id returned by [`JournalPort::log_entry`] to match the later
//! pyramid and exit events and ignores everything else the journal does.

use chrono::NaiveDateTime;

use crate::domain::error::TurtleError;
use crate::domain::position::{Direction, ExitReason, System};

/// Payload of an entry or pyramid event.
#[derive(Debug, Clone, PartialEq)]
pub struct JournalEvent {
    pub timestamp: NaiveDateTime,
    pub symbol: String,
    pub direction: Direction,
    pub price: f64,
    pub size: f64,
    pub stop_loss: f64,
    pub atr: f64,
    pub leverage: f64,
    pub balance: f64,
    pub system: System,
    pub unit_number: usize,
    pub notes: String,
}

/// Payload of an exit event.
#[derive(Debug, Clone, PartialEq)]
pub struct ExitEvent {
    pub timestamp: NaiveDateTime,
    pub symbol: String,
    pub direction: Direction,
    pub entry_price: f64,
    pub exit_price: f64,
    pub size: f64,
    pub pnl: f64,
    pub balance: f64,
    pub reason: ExitReason,
    pub leverage: f64,
    pub notes: String,
}

pub trait JournalPort {
    /// Records a new position and returns its trade id.
    fn log_entry(&mut self, event: &JournalEvent) -> Result<String, TurtleError>;

    fn log_pyramid(&mut self, trade_id: &str, event: &JournalEvent) -> Result<(), TurtleError>;

    fn log_exit(&mut self, trade_id: &str, event: &ExitEvent) -> Result<(), TurtleError>;
}
