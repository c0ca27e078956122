//! Turtle indicators: volatility (ATR) and channel breakouts.
//!
//! All functions are pure over a slice of bars ordered oldest → newest, where
//! the last element is the current bar.

pub mod atr;
pub mod donchian;

pub use atr::average_true_range;
pub use donchian::{check_breakout, donchian_high, donchian_low};
