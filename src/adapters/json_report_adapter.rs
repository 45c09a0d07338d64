//! JSON report adapter implementing ReportPort.
//!
//! Writes the whole [`BacktestResult`] as pretty-printed JSON. Non-finite
//! floats (an infinite profit factor) serialize as `null`, as does an
//! undefined Sharpe ratio.

use std::fs;
use std::path::Path;

use crate::domain::backtest::BacktestResult;
use crate::domain::error::BandcrossError;
use crate::ports::report_port::ReportPort;

#[derive(Debug, Default, Clone, Copy)]
pub struct JsonReportAdapter;

impl JsonReportAdapter {
    pub fn new() -> Self {
        Self
    }

    pub fn render(&self, result: &BacktestResult) -> Result<String, BandcrossError> {
        serde_json::to_string_pretty(result).map_err(|e| BandcrossError::Serialization {
            reason: e.to_string(),
        })
    }
}

impl ReportPort for JsonReportAdapter {
    fn write(&self, result: &BacktestResult, output_path: &Path) -> Result<(), BandcrossError> {
        let json = self.render(result)?;

        if let Some(parent) = output_path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(output_path, json)?;

        Ok(())
    }
}
