//! Series provider port trait.

use crate::domain::bar::Bar;
use crate::domain::error::BandcrossError;
use chrono::{DateTime, NaiveDate, Utc};

/// First and last stored timestamp for a symbol, plus the bar count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DataRange {
    pub first: DateTime<Utc>,
    pub last: DateTime<Utc>,
    pub bars: usize,
}

pub trait DataPort {
    /// Bars for `symbol` from `start_date` 00:00:00 through `end_date`
    /// 23:59:59 UTC, ascending by timestamp with no duplicates. An empty
    /// vector is a valid answer; deciding that it is an error is up to the
    /// caller.
    fn fetch_bars(
        &self,
        symbol: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Vec<Bar>, BandcrossError>;

    fn list_symbols(&self) -> Result<Vec<String>, BandcrossError>;

    fn get_data_range(&self, symbol: &str) -> Result<Option<DataRange>, BandcrossError>;
}
