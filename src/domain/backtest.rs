//! Backtest engine: bars in, [`BacktestResult`] out.
//!
//! A run is a pure function of its bars and [`BacktestConfig`]. Parameters
//! are validated before the series provider is touched; the series itself is
//! checked before any indicator is computed.

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use tracing::{debug, info};

use super::bar::{Bar, closes};
use super::error::BandcrossError;
use super::indicator::bollinger::calculate_bollinger;
use super::indicator::sma::calculate_sma;
use super::ledger::LedgerOutcome;
use super::metrics::Metrics;
use super::position::TradeEvent;
use super::signal::{bollinger_signals, crossover_signals};
use super::simulator::{simulate_bollinger, simulate_crossover};
use super::strategy::{BollingerParams, CrossoverParams, Strategy, StrategyKind};
use crate::ports::data_port::DataPort;

pub const DEFAULT_INITIAL_CAPITAL: f64 = 100_000.0;

#[derive(Debug, Clone, PartialEq)]
pub struct BacktestConfig {
    pub symbol: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub initial_capital: f64,
    pub strategy: Strategy,
}

impl BacktestConfig {
    pub fn validate(&self) -> Result<(), BandcrossError> {
        if self.symbol.trim().is_empty() {
            return Err(BandcrossError::configuration("symbol", "must not be empty"));
        }
        if !(self.initial_capital > 0.0 && self.initial_capital.is_finite()) {
            return Err(BandcrossError::configuration(
                "initial_capital",
                format!("must be a finite number > 0, got {}", self.initial_capital),
            ));
        }
        if self.start_date > self.end_date {
            return Err(BandcrossError::configuration(
                "end_date",
                format!("{} is before start_date {}", self.end_date, self.start_date),
            ));
        }
        self.strategy.validate()
    }
}

/// Immutable summary of one run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BacktestResult {
    pub strategy: StrategyKind,
    pub parameters: Strategy,
    pub symbol: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub bar_count: usize,
    pub initial_capital: f64,
    pub final_capital: f64,
    pub metrics: Metrics,
    pub trades: Vec<TradeEvent>,
}

/// One persisted run summary.
///
/// `sharpe_ratio` is `None` when undefined, `profit_factor` is `None` when
/// there were no losing trades.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BacktestLogEntry {
    pub id: i64,
    pub strategy: String,
    pub symbol: String,
    pub total_return: f64,
    pub annual_return: f64,
    pub sharpe_ratio: Option<f64>,
    pub number_of_trades: i64,
    pub win_rate: f64,
    pub profit_factor: Option<f64>,
    pub created_at: DateTime<Utc>,
}

impl BacktestLogEntry {
    pub fn profit_factor_display(&self) -> String {
        match self.profit_factor {
            Some(pf) => format!("{pf:.2}"),
            None => "inf".to_string(),
        }
    }
}

/// Validate, fetch and run.
///
/// The connection behind `data` is only used after the configuration has
/// passed validation, so a bad parameter never costs a query.
pub fn run_backtest<D: DataPort + ?Sized>(
    data: &D,
    config: &BacktestConfig,
) -> Result<BacktestResult, BandcrossError> {
    config.validate()?;

    let bars = data.fetch_bars(&config.symbol, config.start_date, config.end_date)?;
    info!(
        symbol = %config.symbol,
        start = %config.start_date,
        end = %config.end_date,
        bars = bars.len(),
        "fetched series"
    );

    run_on_bars(config, &bars)
}

/// Run a backtest over an already-fetched series.
pub fn run_on_bars(config: &BacktestConfig, bars: &[Bar]) -> Result<BacktestResult, BandcrossError> {
    config.validate()?;
    check_series(config, bars)?;

    let outcome = match &config.strategy {
        Strategy::Bollinger(params) => bollinger_outcome(bars, params, config.initial_capital),
        Strategy::Crossover(params) => crossover_outcome(bars, params, config.initial_capital),
    };

    let kind = config.strategy.kind();
    let metrics = Metrics::compute(&outcome, bars.len(), kind);

    info!(
        symbol = %config.symbol,
        strategy = %config.strategy,
        trades = outcome.trades.len(),
        final_capital = outcome.final_capital,
        "backtest complete"
    );

    Ok(BacktestResult {
        strategy: kind,
        parameters: config.strategy,
        symbol: config.symbol.clone(),
        start_date: config.start_date,
        end_date: config.end_date,
        bar_count: bars.len(),
        initial_capital: outcome.initial_capital,
        final_capital: outcome.final_capital,
        metrics,
        trades: outcome.trades,
    })
}

/// Bands over closes, level signals, long/short reversal ledger.
pub fn bollinger_outcome(bars: &[Bar], params: &BollingerParams, initial_capital: f64) -> LedgerOutcome {
    let closes = closes(bars);
    let bands = calculate_bollinger(&closes, params.window, params.num_std);
    debug!(
        window = params.window,
        defined = bands.defined_count(),
        "bollinger bands computed"
    );
    let signals = bollinger_signals(&closes, &bands);
    simulate_bollinger(bars, &signals, initial_capital)
}

/// Fast and slow SMAs, edge-triggered signals, long-only ledger.
pub fn crossover_outcome(bars: &[Bar], params: &CrossoverParams, initial_capital: f64) -> LedgerOutcome {
    let closes = closes(bars);
    let fast = calculate_sma(&closes, params.fast_window);
    let slow = calculate_sma(&closes, params.slow_window);
    debug!(
        fast_window = params.fast_window,
        slow_window = params.slow_window,
        "moving averages computed"
    );
    let signals = crossover_signals(&fast, &slow);
    simulate_crossover(bars, &signals, initial_capital)
}

fn check_series(config: &BacktestConfig, bars: &[Bar]) -> Result<(), BandcrossError> {
    let no_data = |reason: String| BandcrossError::NoData {
        symbol: config.symbol.clone(),
        start: config.start_date,
        end: config.end_date,
        reason,
    };

    if bars.is_empty() {
        return Err(no_data("series is empty".into()));
    }

    if let Some(bar) = bars.iter().find(|b| !(b.close.is_finite() && b.close > 0.0)) {
        return Err(no_data(format!(
            "unusable series: close {} at {}",
            bar.close, bar.timestamp
        )));
    }

    if let Some(pair) = bars.windows(2).find(|p| p[1].timestamp <= p[0].timestamp) {
        return Err(no_data(format!(
            "unusable series: timestamp {} does not follow {}",
            pair[1].timestamp, pair[0].timestamp
        )));
    }

    let window = config.strategy.required_bars();
    if bars.len() < window {
        return Err(BandcrossError::InsufficientData {
            symbol: config.symbol.clone(),
            start: config.start_date,
            end: config.end_date,
            bars: bars.len(),
            window,
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn bars(closes: &[f64]) -> Vec<Bar> {
        let start = Utc.with_ymd_and_hms(2024, 3, 4, 14, 30, 0).unwrap();
        closes
            .iter()
            .enumerate()
            .map(|(i, &close)| Bar {
                symbol: "SPY".into(),
                timestamp: start + Duration::minutes(i as i64),
                open: close,
                high: close,
                low: close,
                close,
                volume: 500.0,
                trade_count: 5,
                vwap: close,
            })
            .collect()
    }

    fn config(strategy: Strategy) -> BacktestConfig {
        BacktestConfig {
            symbol: "SPY".into(),
            start_date: NaiveDate::from_ymd_opt(2024, 3, 4).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2024, 3, 8).unwrap(),
            initial_capital: DEFAULT_INITIAL_CAPITAL,
            strategy,
        }
    }

    fn bollinger() -> Strategy {
        Strategy::Bollinger(BollingerParams::default())
    }

    #[test]
    fn config_rejects_non_positive_capital() {
        let c = BacktestConfig {
            initial_capital: 0.0,
            ..config(bollinger())
        };
        let err = c.validate().unwrap_err();
        assert!(err.to_string().contains("initial_capital"));
    }

    #[test]
    fn config_rejects_reversed_dates() {
        let c = BacktestConfig {
            start_date: NaiveDate::from_ymd_opt(2024, 4, 1).unwrap(),
            ..config(bollinger())
        };
        assert!(matches!(c.validate(), Err(BandcrossError::Configuration { .. })));
    }

    #[test]
    fn config_delegates_strategy_validation() {
        let c = config(Strategy::Bollinger(BollingerParams { window: 0, num_std: 2.0 }));
        assert!(matches!(
            c.validate(),
            Err(BandcrossError::Configuration { ref parameter, .. }) if parameter == "window"
        ));
    }

    #[test]
    fn empty_series_is_no_data() {
        let err = run_on_bars(&config(bollinger()), &[]).unwrap_err();
        assert!(matches!(err, BandcrossError::NoData { ref reason, .. } if reason == "series is empty"));
    }

    #[test]
    fn non_positive_close_is_no_data() {
        let mut b = bars(&[100.0; 25]);
        b[7].close = 0.0;
        let err = run_on_bars(&config(bollinger()), &b).unwrap_err();
        assert!(matches!(err, BandcrossError::NoData { .. }));
    }

    #[test]
    fn unordered_timestamps_are_no_data() {
        let mut b = bars(&[100.0; 25]);
        b.swap(3, 4);
        let err = run_on_bars(&config(bollinger()), &b).unwrap_err();
        assert!(err.to_string().contains("does not follow"));
    }

    #[test]
    fn short_series_is_insufficient() {
        let err = run_on_bars(&config(bollinger()), &bars(&[100.0; 19])).unwrap_err();
        match err {
            BandcrossError::InsufficientData { bars, window, .. } => {
                assert_eq!((bars, window), (19, 20));
            }
            other => panic!("expected InsufficientData, got {other:?}"),
        }
    }

    #[test]
    fn crossover_window_is_longest_average() {
        let c = config(Strategy::Crossover(CrossoverParams {
            fast_window: 5,
            slow_window: 20,
        }));
        assert!(matches!(
            run_on_bars(&c, &bars(&[100.0; 10])),
            Err(BandcrossError::InsufficientData { window: 20, .. })
        ));
    }

    #[test]
    fn window_equal_to_length_runs() {
        let result = run_on_bars(&config(bollinger()), &bars(&[100.0; 20])).unwrap();
        assert_eq!(result.bar_count, 20);
        assert_eq!(result.metrics.trade_count, 0);
    }

    #[test]
    fn constant_series_never_trades() {
        let result = run_on_bars(&config(bollinger()), &bars(&[100.0; 25])).unwrap();
        assert_eq!(result.metrics.trade_count, 0);
        assert_eq!(result.metrics.total_return_pct, 0.0);
        assert_eq!(result.metrics.max_drawdown_pct, 0.0);
        assert_eq!(result.metrics.sharpe_ratio, None);
        assert_eq!(result.metrics.profit_factor, f64::INFINITY);
        assert_eq!(result.final_capital, DEFAULT_INITIAL_CAPITAL);
    }

    #[test]
    fn result_carries_run_identity() {
        let result = run_on_bars(&config(bollinger()), &bars(&[100.0; 25])).unwrap();
        assert_eq!(result.symbol, "SPY");
        assert_eq!(result.strategy, StrategyKind::Bollinger);
        assert_eq!(result.parameters, bollinger());
    }
}
