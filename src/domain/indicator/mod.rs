//! Technical indicator implementations.
//!
//! Indicators are computed over an indexed close-price slice and produce an
//! [`IndicatorSeries`] with one slot per input bar. Leading slots inside the
//! warmup window are `None`, never zero.

pub mod bollinger;
pub mod sma;
pub mod stddev;
mod window;

pub use window::RollingWindow;

use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum IndicatorType {
    Sma(usize),
    Stddev(usize),
    Bollinger {
        period: usize,
        stddev_mult_x100: u32,
    },
}

/// A time series of indicator values aligned with the input bars.
#[derive(Debug, Clone, PartialEq)]
pub struct IndicatorSeries<V = f64> {
    pub indicator_type: IndicatorType,
    pub values: Vec<Option<V>>,
}

impl<V: Copy> IndicatorSeries<V> {
    /// Value at bar `i`, `None` during warmup or past the end.
    pub fn get(&self, i: usize) -> Option<V> {
        self.values.get(i).copied().flatten()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Number of bars with a defined value.
    pub fn defined_count(&self) -> usize {
        self.values.iter().filter(|v| v.is_some()).count()
    }
}

impl fmt::Display for IndicatorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndicatorType::Sma(period) => write!(f, "SMA({})", period),
            IndicatorType::Stddev(period) => write!(f, "STDDEV({})", period),
            IndicatorType::Bollinger {
                period,
                stddev_mult_x100,
            } => {
                let mult = *stddev_mult_x100 as f64 / 100.0;
                write!(f, "BOLLINGER({},{})", period, mult)
            }
        }
    }
}
