//! Fixed-size trailing window over a numeric sequence.

use std::collections::VecDeque;

/// Trailing window of the last `capacity` values.
///
/// Statistics are only reported once the window is full, and are summed
/// afresh from the buffer on every call: a window of identical values
/// yields exactly that value as its mean and exactly zero deviation.
#[derive(Debug, Clone)]
pub struct RollingWindow {
    capacity: usize,
    buf: VecDeque<f64>,
}

impl RollingWindow {
    pub fn new(capacity: usize) -> Self {
        RollingWindow {
            capacity,
            buf: VecDeque::with_capacity(capacity),
        }
    }

    /// Push a value, evicting the oldest one when full.
    pub fn push(&mut self, value: f64) {
        if self.capacity == 0 {
            return;
        }
        if self.buf.len() == self.capacity {
            self.buf.pop_front();
        }
        self.buf.push_back(value);
    }

    pub fn is_full(&self) -> bool {
        self.capacity > 0 && self.buf.len() == self.capacity
    }

    pub fn mean(&self) -> Option<f64> {
        if !self.is_full() {
            return None;
        }
        Some(self.buf_mean())
    }

    /// Sample standard deviation (n - 1 denominator).
    pub fn sample_std(&self) -> Option<f64> {
        if !self.is_full() || self.capacity < 2 {
            return None;
        }
        let n = self.capacity as f64;
        let mean = self.buf_mean();
        let ss: f64 = self.buf.iter().map(|v| (v - mean).powi(2)).sum();
        Some((ss / (n - 1.0)).sqrt())
    }

    fn buf_mean(&self) -> f64 {
        self.buf.iter().sum::<f64>() / self.buf.len() as f64
    }
}
