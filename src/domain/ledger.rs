//! Simulation ledger: position, trade log and the two return accumulators.
//!
//! Realized capital and mark-to-market strategy returns are tracked
//! separately. Capital compounds only when a position closes, while the
//! strategy-return series marks every bar the position is open. The two do
//! not reconcile and are not meant to.

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::bar::Bar;
use super::position::{Direction, Position, TradeEvent};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CapitalPoint {
    pub timestamp: DateTime<Utc>,
    pub capital: f64,
}

/// Realized capital, compounded at each close.
#[derive(Debug, Clone, PartialEq)]
pub struct CapitalAccount {
    initial_capital: f64,
    capital: f64,
    curve: Vec<CapitalPoint>,
}

impl CapitalAccount {
    pub fn new(initial_capital: f64) -> Self {
        CapitalAccount {
            initial_capital,
            capital: initial_capital,
            curve: Vec::new(),
        }
    }

    /// `capital *= 1 + returns × sign`, floored at zero. A short that more
    /// than doubles against the entry ruins the account rather than driving
    /// it negative.
    pub fn realize(&mut self, returns: f64, sign: f64) {
        self.capital = (self.capital * (1.0 + returns * sign)).max(0.0);
    }

    pub fn snapshot(&mut self, timestamp: DateTime<Utc>) {
        self.curve.push(CapitalPoint {
            timestamp,
            capital: self.capital,
        });
    }

    pub fn capital(&self) -> f64 {
        self.capital
    }

    pub fn initial_capital(&self) -> f64 {
        self.initial_capital
    }

    pub fn curve(&self) -> &[CapitalPoint] {
        &self.curve
    }
}

/// Per-bar strategy returns: the bar's raw return times the position sign.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReturnSeries {
    values: Vec<f64>,
}

impl ReturnSeries {
    pub fn push(&mut self, value: f64) {
        self.values.push(value);
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }
}

/// Everything a finished simulation hands to the evaluator.
#[derive(Debug, Clone, PartialEq)]
pub struct LedgerOutcome {
    pub initial_capital: f64,
    pub final_capital: f64,
    pub capital_curve: Vec<CapitalPoint>,
    pub strategy_returns: Vec<f64>,
    pub trades: Vec<TradeEvent>,
}

#[derive(Debug, Clone, PartialEq)]
struct OpenTrade {
    direction: Direction,
    entry_price: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Ledger {
    open: Option<OpenTrade>,
    trades: Vec<TradeEvent>,
    account: CapitalAccount,
    returns: ReturnSeries,
}

impl Ledger {
    pub fn new(initial_capital: f64) -> Self {
        Ledger {
            open: None,
            trades: Vec::new(),
            account: CapitalAccount::new(initial_capital),
            returns: ReturnSeries::default(),
        }
    }

    pub fn position(&self) -> Position {
        self.open
            .as_ref()
            .map_or(Position::Flat, |t| Position::from(t.direction))
    }

    pub fn capital(&self) -> f64 {
        self.account.capital()
    }

    pub fn trades(&self) -> &[TradeEvent] {
        &self.trades
    }

    /// Open a position at the bar's close. Any open position must have been
    /// closed first; a second open while one is active is ignored.
    pub fn open(&mut self, direction: Direction, bar: &Bar) {
        if self.open.is_some() {
            return;
        }
        self.open = Some(OpenTrade {
            direction,
            entry_price: bar.close,
        });
        self.trades.push(TradeEvent::Entry {
            date: bar.timestamp,
            price: bar.close,
            direction,
        });
    }

    /// Close the open position at the bar's close and realize its return.
    /// Returns the raw price return, or `None` when already flat.
    pub fn close(&mut self, bar: &Bar) -> Option<f64> {
        let trade = self.open.take()?;
        let returns = (bar.close - trade.entry_price) / trade.entry_price;
        self.account.realize(returns, trade.direction.sign());
        self.trades.push(TradeEvent::Exit {
            date: bar.timestamp,
            price: bar.close,
            returns,
            direction: trade.direction,
        });
        Some(returns)
    }

    /// Baseline bookkeeping for the first bar, which never trades.
    pub fn start(&mut self, bar: &Bar) {
        self.account.snapshot(bar.timestamp);
        self.returns.push(0.0);
    }

    /// End-of-bar bookkeeping: capital snapshot plus the bar's strategy
    /// return under the position held after this bar's transitions.
    pub fn mark(&mut self, bar: &Bar, prev_close: f64) {
        self.account.snapshot(bar.timestamp);
        let sign = self.position().sign();
        let strategy_return = if sign == 0.0 {
            0.0
        } else {
            bar.return_since(prev_close).map_or(0.0, |r| r * sign)
        };
        self.returns.push(strategy_return);
    }

    pub fn finish(self) -> LedgerOutcome {
        LedgerOutcome {
            initial_capital: self.account.initial_capital(),
            final_capital: self.account.capital(),
            capital_curve: self.account.curve,
            strategy_returns: self.returns.values,
            trades: self.trades,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn bar(minute: i64, close: f64) -> Bar {
        Bar {
            symbol: "AAPL".into(),
            timestamp: Utc.with_ymd_and_hms(2023, 6, 1, 14, 0, 0).unwrap()
                + Duration::minutes(minute),
            open: close,
            high: close,
            low: close,
            close,
            volume: 100.0,
            trade_count: 1,
            vwap: close,
        }
    }

    #[test]
    fn new_ledger_is_flat() {
        let ledger = Ledger::new(100_000.0);
        assert_eq!(ledger.position(), Position::Flat);
        assert_eq!(ledger.capital(), 100_000.0);
        assert!(ledger.trades().is_empty());
    }

    #[test]
    fn open_records_entry() {
        let mut ledger = Ledger::new(1000.0);
        ledger.open(Direction::Long, &bar(1, 50.0));

        assert_eq!(ledger.position(), Position::Long);
        assert_eq!(ledger.trades()[0].price(), 50.0);
        assert_eq!(ledger.trades().len(), 1);
        assert_eq!(ledger.capital(), 1000.0);
    }

    #[test]
    fn open_while_open_is_ignored() {
        let mut ledger = Ledger::new(1000.0);
        ledger.open(Direction::Long, &bar(1, 50.0));
        ledger.open(Direction::Short, &bar(2, 60.0));

        assert_eq!(ledger.position(), Position::Long);
        assert_eq!(ledger.trades().len(), 1);
    }

    #[test]
    fn close_long_compounds_capital() {
        let mut ledger = Ledger::new(1000.0);
        ledger.open(Direction::Long, &bar(1, 50.0));
        let returns = ledger.close(&bar(2, 55.0)).unwrap();

        assert!((returns - 0.1).abs() < 1e-12);
        assert!((ledger.capital() - 1100.0).abs() < 1e-9);
        assert_eq!(ledger.position(), Position::Flat);
        assert_eq!(ledger.trades().len(), 2);
    }

    #[test]
    fn close_short_inverts_return() {
        let mut ledger = Ledger::new(1000.0);
        ledger.open(Direction::Short, &bar(1, 100.0));
        let returns = ledger.close(&bar(2, 90.0)).unwrap();

        // raw return is -10%, short earns +10%
        assert!((returns - (-0.1)).abs() < 1e-12);
        assert!((ledger.capital() - 1100.0).abs() < 1e-9);
        match &ledger.trades()[1] {
            TradeEvent::Exit { direction, .. } => assert_eq!(*direction, Direction::Short),
            other => panic!("expected exit, got {other:?}"),
        }
    }

    #[test]
    fn short_loss_floors_capital_at_zero() {
        let mut ledger = Ledger::new(1000.0);
        ledger.open(Direction::Short, &bar(1, 10.0));
        ledger.close(&bar(2, 35.0));
        assert_eq!(ledger.capital(), 0.0);
    }

    #[test]
    fn close_when_flat_is_none() {
        let mut ledger = Ledger::new(1000.0);
        assert_eq!(ledger.close(&bar(1, 10.0)), None);
        assert!(ledger.trades().is_empty());
    }

    #[test]
    fn mark_tracks_open_position_only() {
        let mut ledger = Ledger::new(1000.0);
        ledger.start(&bar(0, 100.0));
        ledger.mark(&bar(1, 110.0), 100.0);
        ledger.open(Direction::Short, &bar(2, 121.0));
        ledger.mark(&bar(2, 121.0), 110.0);

        let outcome = ledger.finish();
        assert_eq!(outcome.strategy_returns.len(), 3);
        assert_eq!(outcome.strategy_returns[0], 0.0);
        assert_eq!(outcome.strategy_returns[1], 0.0);
        assert!((outcome.strategy_returns[2] - (-0.1)).abs() < 1e-12);
    }

    #[test]
    fn capital_curve_changes_only_on_close() {
        let mut ledger = Ledger::new(1000.0);
        ledger.start(&bar(0, 100.0));
        ledger.open(Direction::Long, &bar(1, 100.0));
        ledger.mark(&bar(1, 100.0), 100.0);
        ledger.mark(&bar(2, 150.0), 100.0);
        ledger.close(&bar(3, 120.0));
        ledger.mark(&bar(3, 120.0), 150.0);

        let outcome = ledger.finish();
        let capitals: Vec<f64> = outcome.capital_curve.iter().map(|p| p.capital).collect();
        assert_eq!(&capitals[..3], &[1000.0, 1000.0, 1000.0]);
        assert!((capitals[3] - 1200.0).abs() < 1e-9);
        assert!((outcome.final_capital - 1200.0).abs() < 1e-9);
        assert_eq!(outcome.initial_capital, 1000.0);
    }
}
