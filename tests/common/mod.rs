#![allow(dead_code)]

use bandcross::domain::backtest::BacktestConfig;
use bandcross::domain::bar::Bar;
use bandcross::domain::error::BandcrossError;
use bandcross::domain::strategy::{BollingerParams, CrossoverParams, Strategy};
use bandcross::ports::data_port::{DataPort, DataRange};
use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use std::cell::Cell;
use std::collections::HashMap;

pub struct MockDataPort {
    pub data: HashMap<String, Vec<Bar>>,
    pub errors: HashMap<String, String>,
    pub fetches: Cell<usize>,
}

impl MockDataPort {
    pub fn new() -> Self {
        Self {
            data: HashMap::new(),
            errors: HashMap::new(),
            fetches: Cell::new(0),
        }
    }

    pub fn with_bars(mut self, symbol: &str, bars: Vec<Bar>) -> Self {
        self.data.insert(symbol.to_string(), bars);
        self
    }

    pub fn with_error(mut self, symbol: &str, reason: &str) -> Self {
        self.errors.insert(symbol.to_string(), reason.to_string());
        self
    }
}

impl DataPort for MockDataPort {
    fn fetch_bars(
        &self,
        symbol: &str,
        _start_date: NaiveDate,
        _end_date: NaiveDate,
    ) -> Result<Vec<Bar>, BandcrossError> {
        self.fetches.set(self.fetches.get() + 1);
        if let Some(reason) = self.errors.get(symbol) {
            return Err(BandcrossError::Database {
                reason: reason.clone(),
            });
        }
        Ok(self.data.get(symbol).cloned().unwrap_or_default())
    }

    fn list_symbols(&self) -> Result<Vec<String>, BandcrossError> {
        let mut symbols: Vec<String> = self.data.keys().cloned().collect();
        symbols.sort();
        Ok(symbols)
    }

    fn get_data_range(&self, symbol: &str) -> Result<Option<DataRange>, BandcrossError> {
        Ok(self.data.get(symbol).and_then(|bars| {
            Some(DataRange {
                first: bars.first()?.timestamp,
                last: bars.last()?.timestamp,
                bars: bars.len(),
            })
        }))
    }
}

pub fn session_open() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2023, 1, 3, 14, 30, 0).unwrap()
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// One-minute bars from [`session_open`] with the given closes.
pub fn bars_from_closes(symbol: &str, closes: &[f64]) -> Vec<Bar> {
    let start = session_open();
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| Bar {
            symbol: symbol.to_string(),
            timestamp: start + Duration::minutes(i as i64),
            open: close,
            high: close + 0.5,
            low: close - 0.5,
            close,
            volume: 1_000.0,
            trade_count: 12,
            vwap: close,
        })
        .collect()
}

/// 100, 101, ... for `up` bars, then one lower per bar for `down` bars.
pub fn up_then_down(up: usize, down: usize) -> Vec<f64> {
    let mut closes: Vec<f64> = (0..up).map(|i| 100.0 + i as f64).collect();
    let peak = closes.last().copied().unwrap_or(100.0);
    closes.extend((1..=down).map(|i| peak - i as f64));
    closes
}

/// 30 bars at 100, one at 50, ten back at 100.
pub fn single_spike() -> Vec<f64> {
    let mut closes = vec![100.0; 30];
    closes.push(50.0);
    closes.extend(std::iter::repeat_n(100.0, 10));
    closes
}

pub fn config(symbol: &str, strategy: Strategy) -> BacktestConfig {
    BacktestConfig {
        symbol: symbol.to_string(),
        start_date: date(2023, 1, 3),
        end_date: date(2023, 1, 3),
        initial_capital: 100_000.0,
        strategy,
    }
}

pub fn bollinger(window: usize, num_std: f64) -> Strategy {
    Strategy::Bollinger(BollingerParams { window, num_std })
}

pub fn crossover(fast_window: usize, slow_window: usize) -> Strategy {
    Strategy::Crossover(CrossoverParams {
        fast_window,
        slow_window,
    })
}
