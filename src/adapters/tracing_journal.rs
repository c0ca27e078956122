//! Journal adapter that emits each trade event through `tracing`.

use tracing::info;

use crate::domain::error::TurtleError;
use crate::ports::journal_port::{ExitEvent, JournalEvent, JournalPort};

/// Issues trade ids of the form `{symbol}_{direction}_{n}` with `n` counting
/// from 1 across the journal's lifetime.
#[derive(Debug, Default)]
pub struct TradeIdSequence {
    next: u64,
}

impl TradeIdSequence {
    pub fn next_id(&mut self, event: &JournalEvent) -> String {
        self.next += 1;
        format!("{}_{}_{}", event.symbol, event.direction, self.next)
    }
}

#[derive(Debug, Default)]
pub struct TracingJournal {
    ids: TradeIdSequence,
}

impl TracingJournal {
    pub fn new() -> Self {
        Self::default()
    }
}

impl JournalPort for TracingJournal {
    fn log_entry(&mut self, event: &JournalEvent) -> Result<String, TurtleError> {
        let trade_id = self.ids.next_id(event);
        info!(
            target: "journal",
            trade_id = %trade_id,
            at = %event.timestamp,
            symbol = %event.symbol,
            direction = %event.direction,
            system = %event.system,
            price = event.price,
            size = event.size,
            stop = event.stop_loss,
            atr = event.atr,
            leverage = event.leverage,
            balance = event.balance,
            "ENTRY"
        );
        Ok(trade_id)
    }

    fn log_pyramid(&mut self, trade_id: &str, event: &JournalEvent) -> Result<(), TurtleError> {
        info!(
            target: "journal",
            trade_id,
            at = %event.timestamp,
            symbol = %event.symbol,
            direction = %event.direction,
            unit = event.unit_number,
            price = event.price,
            size = event.size,
            stop = event.stop_loss,
            "PYRAMID"
        );
        Ok(())
    }

    fn log_exit(&mut self, trade_id: &str, event: &ExitEvent) -> Result<(), TurtleError> {
        info!(
            target: "journal",
            trade_id,
            at = %event.timestamp,
            symbol = %event.symbol,
            direction = %event.direction,
            entry = event.entry_price,
            exit = event.exit_price,
            size = event.size,
            pnl = event.pnl,
            balance = event.balance,
            reason = %event.reason,
            "EXIT"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::position::{Direction, System};
    use chrono::NaiveDate;

    fn event(symbol: &str, direction: Direction) -> JournalEvent {
        JournalEvent {
            timestamp: NaiveDate::from_ymd_opt(2024, 1, 1)
                .unwrap()
                .and_hms_opt(0, 0, 0)
                .unwrap(),
            symbol: symbol.into(),
            direction,
            price: 100.0,
            size: 1.0,
            stop_loss: 96.0,
            atr: 2.0,
            leverage: 1.0,
            balance: 10_000.0,
            system: System::One,
            unit_number: 1,
            notes: String::new(),
        }
    }

    #[test]
    fn ids_count_up_per_journal() {
        let mut journal = TracingJournal::new();
        assert_eq!(
            journal.log_entry(&event("BTCUSDT", Direction::Long)).unwrap(),
            "BTCUSDT_LONG_1"
        );
        assert_eq!(
            journal.log_entry(&event("ETHUSDT", Direction::Short)).unwrap(),
            "ETHUSDT_SHORT_2"
        );
    }
}
