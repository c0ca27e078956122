//! Seeded random-walk price generator.
//!
//! Produces OHLC-consistent bars for any symbol and timeframe without touching
//! the filesystem. The same seed always yields the same series.

use crate::domain::error::TurtleError;
use crate::domain::ohlcv::PriceBar;
use crate::domain::timeframe::Timeframe;
use crate::ports::data_port::DataPort;
use chrono::NaiveDate;
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Normal};

pub const MAX_SYNTHETIC_BARS: usize = 10_000;
const TREND_LEG_BARS: usize = 25;
const TREND_BIAS: f64 = 0.0005;
const BASE_VOLUME: f64 = 1_000_000.0;
const MINUTES_PER_DAY: i64 = 1440;

/// Standard deviations of (bar-to-bar drift, intrabar range, open-to-close move).
#[derive(Debug, Clone, Copy, PartialEq)]
struct Volatility {
    drift: f64,
    range: f64,
    body: f64,
}

fn volatility(timeframe: Timeframe) -> Volatility {
    match timeframe {
        Timeframe::M1 | Timeframe::M5 | Timeframe::M15 => Volatility {
            drift: 0.005,
            range: 0.003,
            body: 0.002,
        },
        Timeframe::H1 | Timeframe::H4 => Volatility {
            drift: 0.015,
            range: 0.008,
            body: 0.005,
        },
        Timeframe::D1 | Timeframe::W1 => Volatility {
            drift: 0.03,
            range: 0.015,
            body: 0.01,
        },
    }
}

pub struct SyntheticDataAdapter {
    seed: u64,
    base_price: f64,
}

impl SyntheticDataAdapter {
    pub fn new(seed: u64, base_price: f64) -> Self {
        Self { seed, base_price }
    }
}

fn normal(mean: f64, std_dev: f64) -> Result<Normal<f64>, TurtleError> {
    Normal::new(mean, std_dev).map_err(|e| TurtleError::DataSource {
        reason: format!("invalid synthetic distribution N({mean}, {std_dev}): {e}"),
    })
}

impl DataPort for SyntheticDataAdapter {
    fn fetch_bars(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<PriceBar>, TurtleError> {
        if end < start {
            return Err(TurtleError::DataSource {
                reason: format!("empty window {start} .. {end}"),
            });
        }
        if !self.base_price.is_finite() || self.base_price <= 0.0 {
            return Err(TurtleError::DataSource {
                reason: format!("base price must be positive, got {}", self.base_price),
            });
        }

        // bars on `end` itself are part of the window
        let span_minutes = (end - start).num_minutes() + MINUTES_PER_DAY;
        let count = ((span_minutes / timeframe.minutes()) as usize).min(MAX_SYNTHETIC_BARS);
        let vol = volatility(timeframe);
        let drift_dist = normal(0.0, vol.drift)?;
        let range_dist = normal(0.0, vol.range)?;
        let body_dist = normal(0.0, vol.body)?;
        let volume_dist = normal(1.0, 0.5)?;
        let mut rng = StdRng::seed_from_u64(self.seed);
        let mut price = self.base_price;
        let mut timestamp = start.and_time(chrono::NaiveTime::MIN);
        let mut bars = Vec::with_capacity(count);

        for i in 0..count {
            let bias = if i % (2 * TREND_LEG_BARS) < TREND_LEG_BARS {
                TREND_BIAS
            } else {
                -TREND_BIAS
            };
            let drift = drift_dist.sample(&mut rng);
            let range = range_dist.sample(&mut rng).abs();
            let body = body_dist.sample(&mut rng);

            let open = price * (1.0 + drift + bias);
            let close = open * (1.0 + body);
            let high = (open * (1.0 + range)).max(open).max(close);
            let low = (open * (1.0 - range)).min(open).min(close).max(0.0);
            let volume = BASE_VOLUME * volume_dist.sample(&mut rng).abs();

            bars.push(PriceBar {
                symbol: symbol.to_string(),
                timestamp,
                open,
                high,
                low,
                close,
                volume,
            });

            price = close;
            timestamp += timeframe.bar_duration();
        }

        tracing::debug!(symbol, %timeframe, seed = self.seed, bars = bars.len(), "generated synthetic bars");
        Ok(bars)
    }
}
