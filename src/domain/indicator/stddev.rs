//! Standard Deviation indicator.
//!
//! Sample standard deviation over n closing prices:
//! STDDEV(n)[i] = sqrt(sum((C[i-j] - SMA(n)[i])^2 for j in 0..n) / (n - 1))
//! Warmup: first (n-1) bars are undefined. A one-bar window has no sample
//! deviation and stays undefined throughout.

use crate::domain::indicator::{IndicatorSeries, IndicatorType, RollingWindow};

pub fn calculate_stddev(closes: &[f64], period: usize) -> IndicatorSeries {
    let mut window = RollingWindow::new(period);
    let values = closes
        .iter()
        .map(|&close| {
            window.push(close);
            window.sample_std()
        })
        .collect();

    IndicatorSeries {
        indicator_type: IndicatorType::Stddev(period),
        values,
    }
}
