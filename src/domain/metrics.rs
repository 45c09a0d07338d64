//! Performance metrics and statistics.
//!
//! Percentages are reported as percentages (10.0 means 10%), unrounded.
//! Degenerate denominators are represented, not raised: an undefined Sharpe
//! ratio is `None` and a profit factor with no losses is `f64::INFINITY`.

use chrono::TimeDelta;
use serde::{Serialize, Serializer};
use std::fmt;

use super::ledger::{CapitalPoint, LedgerOutcome};
use super::position::TradeEvent;
use super::strategy::StrategyKind;

/// Annualization divisor. Assumes daily bars; minute bars overstate the
/// annualized figure by the bars-per-day factor.
pub const BARS_PER_YEAR: f64 = 252.0;

/// How a strategy counts trades in its summary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TradeCounting {
    /// Every entry and exit record counts once.
    LogEntries,
    /// Log records halved (floor), one per entry/exit pair.
    RoundTrips,
}

/// Mean holding time over completed round trips.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AvgTradeDuration {
    NoRoundTrips,
    Mean(TimeDelta),
}

impl fmt::Display for AvgTradeDuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AvgTradeDuration::NoRoundTrips => write!(f, "N/A"),
            AvgTradeDuration::Mean(d) => {
                let days = d.num_days();
                let rem = *d - TimeDelta::days(days);
                let hours = rem.num_hours();
                let minutes = rem.num_minutes() % 60;
                let seconds = rem.num_seconds() % 60;
                let nanos = (rem - TimeDelta::seconds(rem.num_seconds()))
                    .num_nanoseconds()
                    .unwrap_or(0);
                write!(
                    f,
                    "{} days {:02}:{:02}:{:02}",
                    days, hours, minutes, seconds
                )?;
                if nanos % 1_000 != 0 {
                    write!(f, ".{:09}", nanos)?;
                } else if nanos != 0 {
                    write!(f, ".{:06}", nanos / 1_000)?;
                }
                Ok(())
            }
        }
    }
}

impl Serialize for AvgTradeDuration {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Metrics {
    pub total_return_pct: f64,
    pub annualized_return_pct: f64,
    pub sharpe_ratio: Option<f64>,
    pub max_drawdown_pct: f64,
    pub trade_count: usize,
    pub win_rate_pct: f64,
    pub profit_factor: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avg_trade_duration: Option<AvgTradeDuration>,
}

impl Metrics {
    pub fn compute(outcome: &LedgerOutcome, bar_count: usize, kind: StrategyKind) -> Self {
        let total_return = total_return(outcome.final_capital, outcome.initial_capital);

        let trade_count = match kind.trade_counting() {
            TradeCounting::LogEntries => outcome.trades.len(),
            TradeCounting::RoundTrips => outcome.trades.len() / 2,
        };

        let avg_trade_duration = if kind.reports_trade_duration() {
            Some(avg_trade_duration(&outcome.trades))
        } else {
            None
        };

        Metrics {
            total_return_pct: total_return * 100.0,
            annualized_return_pct: annualized_return(total_return, bar_count) * 100.0,
            sharpe_ratio: sharpe_ratio(&outcome.strategy_returns),
            max_drawdown_pct: max_drawdown(&outcome.capital_curve) * 100.0,
            trade_count,
            win_rate_pct: win_rate(&outcome.trades) * 100.0,
            profit_factor: profit_factor(&outcome.trades),
            avg_trade_duration,
        }
    }
}

pub fn total_return(final_capital: f64, initial_capital: f64) -> f64 {
    if initial_capital > 0.0 {
        (final_capital - initial_capital) / initial_capital
    } else {
        0.0
    }
}

/// Linear annualization: `total_return / (bar_count / 252)`.
pub fn annualized_return(total_return: f64, bar_count: usize) -> f64 {
    if bar_count == 0 {
        return 0.0;
    }
    total_return / (bar_count as f64 / BARS_PER_YEAR)
}

/// `sqrt(252) * mean / std` with the sample standard deviation.
///
/// `None` for fewer than two samples or zero dispersion.
pub fn sharpe_ratio(returns: &[f64]) -> Option<f64> {
    if returns.len() < 2 {
        return None;
    }
    let n = returns.len() as f64;
    let mean = returns.iter().sum::<f64>() / n;
    let variance = returns.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / (n - 1.0);
    let stddev = variance.sqrt();

    if stddev > 0.0 && stddev.is_finite() {
        Some(BARS_PER_YEAR.sqrt() * mean / stddev)
    } else {
        None
    }
}

/// Largest `1 - capital / running_peak`, as a fraction in `[0, 1]`.
pub fn max_drawdown(curve: &[CapitalPoint]) -> f64 {
    let mut peak = f64::MIN;
    let mut max_dd = 0.0_f64;

    for point in curve {
        if point.capital > peak {
            peak = point.capital;
        }
        if peak > 0.0 {
            let dd = 1.0 - point.capital / peak;
            if dd > max_dd {
                max_dd = dd;
            }
        }
    }

    max_dd
}

/// Winning exits over half the log length (entry/exit pairs).
pub fn win_rate(trades: &[TradeEvent]) -> f64 {
    if trades.is_empty() {
        return 0.0;
    }
    let wins = trades
        .iter()
        .filter_map(TradeEvent::returns)
        .filter(|r| *r > 0.0)
        .count();
    wins as f64 / (trades.len() as f64 / 2.0)
}

/// Summed winning returns over summed absolute losing returns.
pub fn profit_factor(trades: &[TradeEvent]) -> f64 {
    let mut profits = 0.0_f64;
    let mut losses = 0.0_f64;
    for r in trades.iter().filter_map(TradeEvent::returns) {
        if r > 0.0 {
            profits += r;
        } else if r < 0.0 {
            losses += r.abs();
        }
    }

    if losses > 0.0 {
        profits / losses
    } else {
        f64::INFINITY
    }
}

/// Mean of `exit - entry` over log pairs `(trades[i], trades[i + 1])` for
/// even `i`.
pub fn avg_trade_duration(trades: &[TradeEvent]) -> AvgTradeDuration {
    let durations: Vec<TimeDelta> = trades
        .chunks_exact(2)
        .filter_map(|pair| match (&pair[0], &pair[1]) {
            (TradeEvent::Entry { date: entry, .. }, TradeEvent::Exit { date: exit, .. }) => {
                Some(*exit - *entry)
            }
            _ => None,
        })
        .collect();

    if durations.is_empty() {
        return AvgTradeDuration::NoRoundTrips;
    }

    let n = durations.len() as i64;
    let total_ns = durations
        .iter()
        .try_fold(0_i64, |acc, d| acc.checked_add(d.num_nanoseconds()?));
    let mean = match total_ns {
        Some(ns) => TimeDelta::nanoseconds(ns / n),
        // summed holding time past ~292 years
        None => {
            let total_us: i128 = durations
                .iter()
                .filter_map(|d| d.num_microseconds())
                .map(i128::from)
                .sum();
            TimeDelta::microseconds((total_us / i128::from(n)) as i64)
        }
    };
    AvgTradeDuration::Mean(mean)
}
