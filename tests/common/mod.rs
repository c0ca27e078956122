#![allow(dead_code)]

use chrono::{Duration, NaiveDate, NaiveDateTime};
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use turtletrader::domain::backtest::BacktestConfig;
use turtletrader::domain::error::TurtleError;
pub use turtletrader::domain::ohlcv::PriceBar;
use turtletrader::domain::timeframe::Timeframe;
use turtletrader::ports::data_port::DataPort;
use turtletrader::ports::journal_port::{ExitEvent, JournalEvent, JournalPort};

pub const SYMBOL: &str = "BTCUSDT";

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn day(offset: i64) -> NaiveDateTime {
    date(2024, 1, 1).and_hms_opt(0, 0, 0).unwrap() + Duration::days(offset)
}

/// Bar closing at `close` with a one-point range on either side.
pub fn make_bar(offset: i64, close: f64) -> PriceBar {
    PriceBar {
        symbol: SYMBOL.to_string(),
        timestamp: day(offset),
        open: close,
        high: close + 1.0,
        low: close - 1.0,
        close,
        volume: 1_000.0,
    }
}

/// Bar with high == low == close.
pub fn flat_bar(offset: i64, price: f64) -> PriceBar {
    PriceBar {
        symbol: SYMBOL.to_string(),
        timestamp: day(offset),
        open: price,
        high: price,
        low: price,
        close: price,
        volume: 1_000.0,
    }
}

pub fn daily_bars(closes: &[f64]) -> Vec<PriceBar> {
    closes
        .iter()
        .enumerate()
        .map(|(i, &c)| make_bar(i as i64, c))
        .collect()
}

/// Flat at 100 for `flat` bars, then climbing by `step` a bar, then falling
/// back below the start.
pub fn breakout_series(flat: usize, rise: usize, fall: usize, step: f64) -> Vec<PriceBar> {
    let mut closes = vec![100.0; flat];
    let mut price = 100.0;
    for _ in 0..rise {
        price += step;
        closes.push(price);
    }
    for _ in 0..fall {
        price -= step * 1.5;
        closes.push(price.max(1.0));
    }
    daily_bars(&closes)
}

/// Mirror of [`breakout_series`]: flat at 200, sliding by `step` a bar, then
/// recovering above the start.
pub fn breakdown_series(flat: usize, fall: usize, rise: usize, step: f64) -> Vec<PriceBar> {
    let mut closes = vec![200.0; flat];
    let mut price = 200.0;
    for _ in 0..fall {
        price -= step;
        closes.push(price);
    }
    for _ in 0..rise {
        price += step * 1.5;
        closes.push(price);
    }
    daily_bars(&closes)
}

/// Daily config whose window matches `bars`.
pub fn config_for(bars: &[PriceBar]) -> BacktestConfig {
    let start = bars.first().map(|b| b.timestamp.date()).unwrap_or(date(2024, 1, 1));
    let end = bars.last().map(|b| b.timestamp.date()).unwrap_or(date(2024, 1, 1));
    BacktestConfig::new(SYMBOL, Timeframe::D1, start, end)
}

pub struct MockDataPort {
    pub data: HashMap<String, Vec<PriceBar>>,
    pub errors: HashMap<String, String>,
}

impl MockDataPort {
    pub fn new() -> Self {
        Self {
            data: HashMap::new(),
            errors: HashMap::new(),
        }
    }

    pub fn with_bars(mut self, symbol: &str, bars: Vec<PriceBar>) -> Self {
        self.data.insert(symbol.to_string(), bars);
        self
    }

    pub fn with_error(mut self, symbol: &str, reason: &str) -> Self {
        self.errors.insert(symbol.to_string(), reason.to_string());
        self
    }
}

impl DataPort for MockDataPort {
    fn fetch_bars(
        &self,
        symbol: &str,
        _timeframe: Timeframe,
        _start: NaiveDate,
        _end: NaiveDate,
    ) -> Result<Vec<PriceBar>, TurtleError> {
        if let Some(reason) = self.errors.get(symbol) {
            return Err(TurtleError::DataSource {
                reason: reason.clone(),
            });
        }
        Ok(self.data.get(symbol).cloned().unwrap_or_default())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Logged {
    Entry(JournalEvent),
    Pyramid(String, JournalEvent),
    Exit(String, ExitEvent),
}

/// Journal that keeps every event in a shared buffer the test can inspect
/// after the engine has taken ownership of the journal.
#[derive(Clone, Default)]
pub struct RecordingJournal {
    pub events: Rc<RefCell<Vec<Logged>>>,
    next_id: Rc<RefCell<usize>>,
}

impl RecordingJournal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> usize {
        self.count(|e| matches!(e, Logged::Entry(_)))
    }

    pub fn pyramids(&self) -> usize {
        self.count(|e| matches!(e, Logged::Pyramid(..)))
    }

    pub fn exits(&self) -> usize {
        self.count(|e| matches!(e, Logged::Exit(..)))
    }

    fn count(&self, f: impl Fn(&Logged) -> bool) -> usize {
        self.events.borrow().iter().filter(|e| f(e)).count()
    }
}

impl JournalPort for RecordingJournal {
    fn log_entry(&mut self, event: &JournalEvent) -> Result<String, TurtleError> {
        let mut next = self.next_id.borrow_mut();
        *next += 1;
        self.events.borrow_mut().push(Logged::Entry(event.clone()));
        Ok(format!("T{}", *next))
    }

    fn log_pyramid(&mut self, trade_id: &str, event: &JournalEvent) -> Result<(), TurtleError> {
        self.events
            .borrow_mut()
            .push(Logged::Pyramid(trade_id.to_string(), event.clone()));
        Ok(())
    }

    fn log_exit(&mut self, trade_id: &str, event: &ExitEvent) -> Result<(), TurtleError> {
        self.events
            .borrow_mut()
            .push(Logged::Exit(trade_id.to_string(), event.clone()));
        Ok(())
    }
}

/// Journal whose every call fails.
pub struct BrokenJournal;

impl JournalPort for BrokenJournal {
    fn log_entry(&mut self, _event: &JournalEvent) -> Result<String, TurtleError> {
        Err(TurtleError::DataSource {
            reason: "journal offline".into(),
        })
    }

    fn log_pyramid(&mut self, _trade_id: &str, _event: &JournalEvent) -> Result<(), TurtleError> {
        Err(TurtleError::DataSource {
            reason: "journal offline".into(),
        })
    }

    fn log_exit(&mut self, _trade_id: &str, _event: &ExitEvent) -> Result<(), TurtleError> {
        Err(TurtleError::DataSource {
            reason: "journal offline".into(),
        })
    }
}
