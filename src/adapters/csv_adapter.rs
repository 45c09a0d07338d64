//! CSV file bar source.
//!
//! One file per symbol, `<base>/<SYMBOL>.csv`, with the header
//! `timestamp,open,high,low,close,volume,trade_count,vwap` and RFC 3339
//! timestamps.

use crate::domain::bar::Bar;
use crate::domain::error::BandcrossError;
use crate::ports::data_port::{DataPort, DataRange};
use chrono::{DateTime, NaiveDate, Utc};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize)]
struct CsvRow {
    timestamp: DateTime<Utc>,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    volume: f64,
    trade_count: i64,
    vwap: f64,
}

impl CsvRow {
    fn into_bar(self, symbol: &str) -> Bar {
        Bar {
            symbol: symbol.to_string(),
            timestamp: self.timestamp,
            open: self.open,
            high: self.high,
            low: self.low,
            close: self.close,
            volume: self.volume,
            trade_count: self.trade_count,
            vwap: self.vwap,
        }
    }
}

pub struct CsvAdapter {
    base_path: PathBuf,
}

impl CsvAdapter {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    fn csv_path(&self, symbol: &str) -> PathBuf {
        self.base_path.join(format!("{}.csv", symbol))
    }

    /// Every bar in `path`, tagged with `symbol` and sorted ascending.
    pub fn read_file(path: &Path, symbol: &str) -> Result<Vec<Bar>, BandcrossError> {
        let csv_err = |reason: String| BandcrossError::Csv {
            file: path.display().to_string(),
            reason,
        };

        let mut rdr = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_path(path)
            .map_err(|e| csv_err(e.to_string()))?;

        let mut bars = Vec::new();
        for (line, result) in rdr.deserialize::<CsvRow>().enumerate() {
            // header is line 1
            let row = result.map_err(|e| csv_err(format!("row {}: {}", line + 2, e)))?;
            bars.push(row.into_bar(symbol));
        }

        bars.sort_by_key(|b| b.timestamp);
        Ok(bars)
    }
}

impl DataPort for CsvAdapter {
    fn fetch_bars(
        &self,
        symbol: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Vec<Bar>, BandcrossError> {
        let bars = Self::read_file(&self.csv_path(symbol), symbol)?;
        Ok(bars
            .into_iter()
            .filter(|b| {
                let day = b.timestamp.date_naive();
                day >= start_date && day <= end_date
            })
            .collect())
    }

    fn list_symbols(&self) -> Result<Vec<String>, BandcrossError> {
        let entries = fs::read_dir(&self.base_path).map_err(|e| BandcrossError::Csv {
            file: self.base_path.display().to_string(),
            reason: format!("failed to read directory: {}", e),
        })?;

        let mut symbols = Vec::new();
        for entry in entries {
            let path = entry?.path();
            if path.extension().is_some_and(|ext| ext == "csv") {
                if let Some(stem) = path.file_stem() {
                    symbols.push(stem.to_string_lossy().into_owned());
                }
            }
        }

        symbols.sort();
        Ok(symbols)
    }

    fn get_data_range(&self, symbol: &str) -> Result<Option<DataRange>, BandcrossError> {
        let path = self.csv_path(symbol);
        if !path.exists() {
            return Ok(None);
        }
        let bars = Self::read_file(&path, symbol)?;
        Ok(match (bars.first(), bars.last()) {
            (Some(first), Some(last)) => Some(DataRange {
                first: first.timestamp,
                last: last.timestamp,
                bars: bars.len(),
            }),
            _ => None,
        })
    }
}
