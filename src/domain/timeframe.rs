//! Bar granularity and the lookup tables keyed by it.
//!
//! Breakout windows are scaled by [`Timeframe::breakout_multiplier`] so that a
//! "20-period" channel spans roughly the same wall-clock time on every
//! granularity. The ATR period, minimum backtest span and warm-up offset are
//! tabulated here as well.

use chrono::Duration;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

const MINUTES_PER_DAY: i64 = 1440;
const DAYS_PER_YEAR: f64 = 365.25;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Timeframe {
    #[serde(rename = "1m")]
    M1,
    #[serde(rename = "5m")]
    M5,
    #[serde(rename = "15m")]
    M15,
    #[serde(rename = "1h")]
    H1,
    #[serde(rename = "4h")]
    H4,
    #[serde(rename = "1d")]
    D1,
    #[serde(rename = "1w")]
    W1,
}

impl Timeframe {
    pub const ALL: [Timeframe; 7] = [
        Timeframe::M1,
        Timeframe::M5,
        Timeframe::M15,
        Timeframe::H1,
        Timeframe::H4,
        Timeframe::D1,
        Timeframe::W1,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Timeframe::M1 => "1m",
            Timeframe::M5 => "5m",
            Timeframe::M15 => "15m",
            Timeframe::H1 => "1h",
            Timeframe::H4 => "4h",
            Timeframe::D1 => "1d",
            Timeframe::W1 => "1w",
        }
    }

    pub fn minutes(self) -> i64 {
        match self {
            Timeframe::M1 => 1,
            Timeframe::M5 => 5,
            Timeframe::M15 => 15,
            Timeframe::H1 => 60,
            Timeframe::H4 => 240,
            Timeframe::D1 => MINUTES_PER_DAY,
            Timeframe::W1 => 7 * MINUTES_PER_DAY,
        }
    }

    pub fn bar_duration(self) -> Duration {
        Duration::minutes(self.minutes())
    }

    /// Multiplier applied to the System 1/2 breakout periods.
    pub fn breakout_multiplier(self) -> usize {
        match self {
            Timeframe::M1 => 20,
            Timeframe::M5 => 12,
            Timeframe::M15 => 8,
            Timeframe::H1 => 6,
            Timeframe::H4 => 2,
            Timeframe::D1 | Timeframe::W1 => 1,
        }
    }

    pub fn atr_period(self) -> usize {
        match self {
            Timeframe::M1 => 60,
            Timeframe::M5 => 48,
            Timeframe::M15 => 32,
            Timeframe::H1 => 24,
            Timeframe::H4 => 12,
            Timeframe::D1 | Timeframe::W1 => 20,
        }
    }

    /// Shortest start..end window a backtest may cover, in calendar days.
    pub fn min_span_days(self) -> i64 {
        match self {
            Timeframe::M1 | Timeframe::M5 => 1,
            Timeframe::M15 => 2,
            Timeframe::H1 => 3,
            Timeframe::H4 => 7,
            Timeframe::D1 => 30,
            Timeframe::W1 => 90,
        }
    }

    /// Fewest bars a series must hold: the minimum span expressed in bars.
    pub fn min_history_bars(self) -> usize {
        let minutes = self.min_span_days() * MINUTES_PER_DAY;
        ((minutes + self.minutes() - 1) / self.minutes()) as usize
    }

    /// Bars per year, used to annualise per-bar statistics.
    pub fn periods_per_year(self) -> f64 {
        DAYS_PER_YEAR * MINUTES_PER_DAY as f64 / self.minutes() as f64
    }
}

impl fmt::Display for Timeframe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Timeframe {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Timeframe::ALL
            .into_iter()
            .find(|tf| tf.as_str() == wanted)
            .ok_or_else(|| format!("unknown timeframe '{wanted}'"))
    }
}
