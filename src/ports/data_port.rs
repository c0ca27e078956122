//! Price data access port trait.

use crate::domain::error::TurtleError;
use crate::domain::ohlcv::PriceBar;
use crate::domain::timeframe::Timeframe;
use chrono::NaiveDate;

pub trait DataPort {
    /// Bars for `symbol` at `timeframe` dated from `start` through `end`,
    /// oldest first. Both ends are inclusive and `end` covers the whole day:
    /// a 1h fetch ending 2024-01-03 may return a bar at 2024-01-03 23:00.
    fn fetch_bars(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<PriceBar>, TurtleError>;
}
