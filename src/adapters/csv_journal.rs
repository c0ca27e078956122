//! CSV trade journal adapter.
//!
//! One row per ENTRY, PYRAMID and EXIT event, flushed as it is written, with a
//! running cumulative pnl over the exits seen so far.

use serde::Serialize;
use std::fs::File;
use std::path::Path;

use super::tracing_journal::TradeIdSequence;
use crate::domain::error::TurtleError;
use crate::domain::position::{Direction, System};
use crate::ports::journal_port::{ExitEvent, JournalEvent, JournalPort};

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
enum Action {
    Entry,
    Pyramid,
    Exit,
}

#[derive(Debug, Serialize)]
struct JournalRow<'a> {
    timestamp: String,
    trade_id: &'a str,
    trading_mode: &'static str,
    symbol: &'a str,
    direction: Direction,
    action: Action,
    system: Option<System>,
    unit_number: Option<usize>,
    entry_price: f64,
    exit_price: Option<f64>,
    size: f64,
    stop_loss: Option<f64>,
    atr: Option<f64>,
    leverage: f64,
    pnl: Option<f64>,
    cumulative_pnl: f64,
    account_balance: f64,
    reason: String,
    notes: &'a str,
}

pub struct CsvJournal {
    writer: csv::Writer<File>,
    ids: TradeIdSequence,
    cumulative_pnl: f64,
}

impl CsvJournal {
    /// Creates (or truncates) the journal file; the header is written with
    /// the first row.
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self, TurtleError> {
        if let Some(parent) = path.as_ref().parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        Ok(Self {
            writer: csv::Writer::from_path(path)?,
            ids: TradeIdSequence::default(),
            cumulative_pnl: 0.0,
        })
    }

    pub fn cumulative_pnl(&self) -> f64 {
        self.cumulative_pnl
    }

    fn write(&mut self, row: &JournalRow<'_>) -> Result<(), TurtleError> {
        self.writer.serialize(row)?;
        self.writer.flush()?;
        Ok(())
    }

    fn open_row<'a>(
        &self,
        trade_id: &'a str,
        event: &'a JournalEvent,
        action: Action,
    ) -> JournalRow<'a> {
        JournalRow {
            timestamp: event.timestamp.format(TIMESTAMP_FORMAT).to_string(),
            trade_id,
            trading_mode: "backtest",
            symbol: &event.symbol,
            direction: event.direction,
            action,
            system: Some(event.system),
            unit_number: Some(event.unit_number),
            entry_price: event.price,
            exit_price: None,
            size: event.size,
            stop_loss: Some(event.stop_loss),
            atr: Some(event.atr),
            leverage: event.leverage,
            pnl: None,
            cumulative_pnl: self.cumulative_pnl,
            account_balance: event.balance,
            reason: match action {
                Action::Pyramid => "PYRAMID".to_string(),
                _ => "SIGNAL".to_string(),
            },
            notes: &event.notes,
        }
    }
}

impl JournalPort for CsvJournal {
    fn log_entry(&mut self, event: &JournalEvent) -> Result<String, TurtleError> {
        let trade_id = self.ids.next_id(event);
        let row = self.open_row(&trade_id, event, Action::Entry);
        self.write(&row)?;
        Ok(trade_id)
    }

    fn log_pyramid(&mut self, trade_id: &str, event: &JournalEvent) -> Result<(), TurtleError> {
        let row = self.open_row(trade_id, event, Action::Pyramid);
        self.write(&row)
    }

    fn log_exit(&mut self, trade_id: &str, event: &ExitEvent) -> Result<(), TurtleError> {
        self.cumulative_pnl += event.pnl;
        let row = JournalRow {
            timestamp: event.timestamp.format(TIMESTAMP_FORMAT).to_string(),
            trade_id,
            trading_mode: "backtest",
            symbol: &event.symbol,
            direction: event.direction,
            action: Action::Exit,
            system: None,
            unit_number: None,
            entry_price: event.entry_price,
            exit_price: Some(event.exit_price),
            size: event.size,
            stop_loss: None,
            atr: None,
            leverage: event.leverage,
            pnl: Some(event.pnl),
            cumulative_pnl: self.cumulative_pnl,
            account_balance: event.balance,
            reason: event.reason.to_string(),
            notes: &event.notes,
        };
        self.write(&row)
    }
}
