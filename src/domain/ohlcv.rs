//! Price bar representation and series validation.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use super::error::TurtleError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceBar {
    pub symbol: String,
    pub timestamp: NaiveDateTime,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl PriceBar {
    /// max(high - low, |high - prev_close|, |low - prev_close|)
    pub fn true_range(&self, prev_close: f64) -> f64 {
        let hl = self.high - self.low;
        let hc = (self.high - prev_close).abs();
        let lc = (self.low - prev_close).abs();
        hl.max(hc).max(lc)
    }

    fn check(&self) -> Result<(), String> {
        let fields = [self.open, self.high, self.low, self.close, self.volume];
        if fields.iter().any(|v| !v.is_finite()) {
            return Err("non-finite price or volume".into());
        }
        if self.volume < 0.0 {
            return Err(format!("negative volume {}", self.volume));
        }
        if self.low > self.high {
            return Err(format!("low {} above high {}", self.low, self.high));
        }
        for (name, value) in [("open", self.open), ("close", self.close)] {
            if value < self.low || value > self.high {
                return Err(format!(
                    "{name} {value} outside [{}, {}]",
                    self.low, self.high
                ));
            }
        }
        Ok(())
    }
}

/// Rejects empty, out-of-order, duplicated or OHLC-inconsistent input.
///
/// Nothing is sorted or dropped: the first offending bar is reported.
pub fn validate_series(bars: &[PriceBar]) -> Result<(), TurtleError> {
    if bars.is_empty() {
        return Err(TurtleError::InvalidSeries {
            index: 0,
            reason: "empty price series".into(),
        });
    }

    for (index, bar) in bars.iter().enumerate() {
        bar.check()
            .map_err(|reason| TurtleError::InvalidSeries { index, reason })?;

        if index > 0 {
            let prev = &bars[index - 1];
            if bar.timestamp <= prev.timestamp {
                return Err(TurtleError::InvalidSeries {
                    index,
                    reason: format!(
                        "timestamp {} does not follow {}",
                        bar.timestamp, prev.timestamp
                    ),
                });
            }
            if bar.symbol != prev.symbol {
                return Err(TurtleError::InvalidSeries {
                    index,
                    reason: format!("mixed symbols {} and {}", prev.symbol, bar.symbol),
                });
            }
        }
    }

    Ok(())
}
