//! Simple Moving Average indicator.
//!
//! SMA(n)[i] = mean(C[i-n+1..=i]).
//! Warmup: first (n-1) bars are undefined.

use crate::domain::indicator::{IndicatorSeries, IndicatorType, RollingWindow};

pub fn calculate_sma(closes: &[f64], period: usize) -> IndicatorSeries {
    let mut window = RollingWindow::new(period);
    let values = closes
        .iter()
        .map(|&close| {
            window.push(close);
            window.mean()
        })
        .collect();

    IndicatorSeries {
        indicator_type: IndicatorType::Sma(period),
        values,
    }
}
