//! CSV file price data adapter.
//!
//! Reads `<dir>/<SYMBOL>_<timeframe>.csv` with the header
//! `timestamp,open,high,low,close,volume`. Rows are returned in file order;
//! ordering problems are left for series validation to report.

use crate::domain::error::TurtleError;
use crate::domain::ohlcv::PriceBar;
use crate::domain::timeframe::Timeframe;
use crate::ports::data_port::DataPort;
use chrono::{NaiveDate, NaiveDateTime};
use std::path::PathBuf;

pub struct CsvBarAdapter {
    base_path: PathBuf,
}

impl CsvBarAdapter {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    pub fn csv_path(&self, symbol: &str, timeframe: Timeframe) -> PathBuf {
        self.base_path.join(format!("{symbol}_{timeframe}.csv"))
    }
}

/// Accepts `YYYY-MM-DD` (midnight) or `YYYY-MM-DD HH:MM:SS`.
pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S")
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S"))
        .ok()
        .or_else(|| {
            NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

fn parse_field(record: &csv::StringRecord, index: usize, name: &str, row: usize) -> Result<f64, TurtleError> {
    let raw = record.get(index).ok_or_else(|| TurtleError::DataSource {
        reason: format!("row {row}: missing {name} column"),
    })?;
    raw.trim().parse().map_err(|e| TurtleError::DataSource {
        reason: format!("row {row}: invalid {name} value '{raw}': {e}"),
    })
}

impl DataPort for CsvBarAdapter {
    fn fetch_bars(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<PriceBar>, TurtleError> {
        let path = self.csv_path(symbol, timeframe);
        let mut rdr = csv::Reader::from_path(&path).map_err(|e| TurtleError::DataSource {
            reason: format!("failed to open {}: {}", path.display(), e),
        })?;

        let mut bars = Vec::new();
        for (i, result) in rdr.records().enumerate() {
            let row = i + 2;
            let record = result.map_err(|e| TurtleError::DataSource {
                reason: format!("CSV parse error in {}: {}", path.display(), e),
            })?;

            let raw_ts = record.get(0).unwrap_or_default();
            let timestamp = parse_timestamp(raw_ts).ok_or_else(|| TurtleError::DataSource {
                reason: format!("row {row}: invalid timestamp '{raw_ts}'"),
            })?;

            let date = timestamp.date();
            if date < start || date > end {
                continue;
            }

            bars.push(PriceBar {
                symbol: symbol.to_string(),
                timestamp,
                open: parse_field(&record, 1, "open", row)?,
                high: parse_field(&record, 2, "high", row)?,
                low: parse_field(&record, 3, "low", row)?,
                close: parse_field(&record, 4, "close", row)?,
                volume: parse_field(&record, 5, "volume", row)?,
            });
        }

        tracing::debug!(symbol, %timeframe, bars = bars.len(), path = %path.display(), "loaded bars");
        Ok(bars)
    }
}
