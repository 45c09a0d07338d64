//! Backtest log persistence port trait.

use crate::domain::backtest::{BacktestLogEntry, BacktestResult};
use crate::domain::error::BandcrossError;

pub trait BacktestLogPort {
    /// Append a summary row for `result`, returning its id.
    fn record(&self, result: &BacktestResult) -> Result<i64, BandcrossError>;

    /// Up to `limit` rows, newest first.
    fn recent(&self, limit: usize) -> Result<Vec<BacktestLogEntry>, BandcrossError>;
}
