//! Backtest results persistence port trait.

use crate::domain::backtest::BacktestResults;
use crate::domain::error::TurtleError;

pub trait ResultsPort {
    fn save(&self, results: &BacktestResults, path: &str) -> Result<(), TurtleError>;

    fn load(&self, path: &str) -> Result<BacktestResults, TurtleError>;
}
