//! Average True Range.
//!
//! TR[i] = max(H[i] - L[i], |H[i] - C[i-1]|, |L[i] - C[i-1]|)
//! ATR(n) = arithmetic mean of the last n TR values (simple, not Wilder-smoothed).
//! Needs n + 1 bars: the oldest one only supplies a previous close.

use crate::domain::error::TurtleError;
use crate::domain::ohlcv::PriceBar;

pub fn average_true_range(bars: &[PriceBar], period: usize) -> Result<f64, TurtleError> {
    let needed = period + 1;
    if period == 0 || bars.len() < needed {
        return Err(TurtleError::InsufficientData {
            needed,
            available: bars.len(),
        });
    }

    let window = &bars[bars.len() - needed..];
    let total: f64 = window
        .windows(2)
        .map(|pair| pair[1].true_range(pair[0].close))
        .sum();

    Ok(total / period as f64)
}
