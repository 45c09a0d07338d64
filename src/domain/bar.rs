//! Price bar representation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One fixed-interval sample as stored in `trading_info`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub symbol: String,
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
    pub trade_count: i64,
    pub vwap: f64,
}

impl Bar {
    /// Simple percentage return from `prev_close` to this bar's close.
    ///
    /// `None` when the previous close is zero, since the ratio is undefined.
    pub fn return_since(&self, prev_close: f64) -> Option<f64> {
        if prev_close == 0.0 {
            None
        } else {
            Some((self.close - prev_close) / prev_close)
        }
    }
}

/// Close prices in bar order.
pub fn closes(bars: &[Bar]) -> Vec<f64> {
    bars.iter().map(|b| b.close).collect()
}
