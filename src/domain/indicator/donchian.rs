//! Donchian channel bounds and channel breakouts.
//!
//! Breakout thresholds are built from the `period` bars *before* the current
//! one; the current bar never contributes to its own threshold.

use crate::domain::ohlcv::PriceBar;
use crate::domain::position::Direction;

/// Highest high over the trailing `period` bars, current bar included.
/// Uses every available bar when the history is shorter than `period`.
pub fn donchian_high(bars: &[PriceBar], period: usize) -> Option<f64> {
    trailing(bars, period).iter().map(|b| b.high).reduce(f64::max)
}

/// Lowest low over the trailing `period` bars, current bar included.
pub fn donchian_low(bars: &[PriceBar], period: usize) -> Option<f64> {
    trailing(bars, period).iter().map(|b| b.low).reduce(f64::min)
}

fn trailing(bars: &[PriceBar], period: usize) -> &[PriceBar] {
    &bars[bars.len().saturating_sub(period)..]
}

/// LONG: close > max(high) of the prior `period` bars.
/// SHORT: close < min(low) of the prior `period` bars.
/// False when fewer than `period + 1` bars are available.
pub fn check_breakout(bars: &[PriceBar], period: usize, direction: Direction) -> bool {
    if period == 0 || bars.len() < period + 1 {
        return false;
    }

    let (current, history) = match bars.split_last() {
        Some(split) => split,
        None => return false,
    };
    let window = &history[history.len() - period..];

    match direction {
        Direction::Long => window
            .iter()
            .map(|b| b.high)
            .reduce(f64::max)
            .is_some_and(|highest| current.close > highest),
        Direction::Short => window
            .iter()
            .map(|b| b.low)
            .reduce(f64::min)
            .is_some_and(|lowest| current.close < lowest),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn make_bars(prices: &[f64]) -> Vec<PriceBar> {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        prices
            .iter()
            .enumerate()
            .map(|(i, &close)| PriceBar {
                symbol: "TEST".into(),
                timestamp: start + chrono::Duration::days(i as i64),
                open: close,
                high: close + 2.0,
                low: close - 2.0,
                close,
                volume: 1000.0,
            })
            .collect()
    }

    #[test]
    fn long_breakout_above_prior_highs() {
        let bars = make_bars(&[100.0, 101.0, 100.0, 104.0]);
        // prior highs: 102, 103, 102 → 104 > 103
        assert!(check_breakout(&bars, 3, Direction::Long));
    }

    #[test]
    fn long_breakout_needs_strictly_greater() {
        let bars = make_bars(&[100.0, 101.0, 100.0, 103.0]);
        assert!(!check_breakout(&bars, 3, Direction::Long));
    }

    #[test]
    fn short_breakout_below_prior_lows() {
        let bars = make_bars(&[100.0, 99.0, 100.0, 96.0]);
        // prior lows: 98, 97, 98 → 96 < 97
        assert!(check_breakout(&bars, 3, Direction::Short));
        assert!(!check_breakout(&bars, 3, Direction::Long));
    }

    #[test]
    fn breakout_false_without_enough_history() {
        let bars = make_bars(&[100.0, 200.0]);
        assert!(!check_breakout(&bars, 2, Direction::Long));
        assert!(check_breakout(&bars, 1, Direction::Long));
    }

    #[test]
    fn breakout_ignores_current_bar_extremes() {
        let mut bars = make_bars(&[100.0, 100.0, 100.0, 103.0]);
        // a huge current high must not raise its own threshold
        bars[3].high = 500.0;
        assert!(check_breakout(&bars, 3, Direction::Long));
    }

    #[test]
    fn breakout_window_excludes_older_bars() {
        // bar 0 has a high far above the rest but lies outside the window
        let mut bars = make_bars(&[100.0, 100.0, 100.0, 103.0]);
        bars[0].high = 1000.0;
        assert!(check_breakout(&bars, 2, Direction::Long));
        assert!(!check_breakout(&bars, 3, Direction::Long));
    }

    #[test]
    fn donchian_includes_current_bar() {
        let bars = make_bars(&[100.0, 105.0, 95.0]);
        assert_eq!(donchian_high(&bars, 2), Some(107.0));
        assert_eq!(donchian_low(&bars, 2), Some(93.0));
    }

    #[test]
    fn donchian_degrades_to_available_bars() {
        let bars = make_bars(&[100.0, 110.0]);
        assert_eq!(donchian_high(&bars, 20), Some(112.0));
        assert_eq!(donchian_low(&bars, 20), Some(98.0));
    }

    #[test]
    fn donchian_empty_is_none() {
        assert_eq!(donchian_high(&[], 20), None);
        assert_eq!(donchian_low(&[], 20), None);
    }
}
