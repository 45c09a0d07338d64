//! Position state machines that walk a signal sequence through a [`Ledger`].
//!
//! Both variants visit bars in order. Bar 0 only sets the baseline; trading
//! starts at bar 1 because a bar return needs a previous close.

use super::bar::Bar;
use super::ledger::{Ledger, LedgerOutcome};
use super::position::{Direction, Position};
use super::signal::Signal;

/// Long/short reversal machine over `{flat, long, short}`.
///
/// A `Buy` or `Sell` different from the current stance closes the open
/// position (realizing it at this bar's close) and opens the new one at the
/// same price. `Hold`, or a signal matching the stance, changes nothing.
pub fn simulate_bollinger(bars: &[Bar], signals: &[Signal], initial_capital: f64) -> LedgerOutcome {
    simulate(bars, signals, initial_capital, |ledger, bar, signal| {
        let target = match signal {
            Signal::Buy => Direction::Long,
            Signal::Sell => Direction::Short,
            Signal::Hold => return,
        };
        if ledger.position() == Position::from(target) {
            return;
        }
        ledger.close(bar);
        ledger.open(target, bar);
    })
}

/// Long-only machine over `{flat, long}`.
///
/// `Buy` while flat opens long, `Sell` while long closes it. Every other
/// combination is a no-op.
pub fn simulate_crossover(bars: &[Bar], signals: &[Signal], initial_capital: f64) -> LedgerOutcome {
    simulate(bars, signals, initial_capital, |ledger, bar, signal| {
        match (signal, ledger.position()) {
            (Signal::Buy, Position::Flat) => ledger.open(Direction::Long, bar),
            (Signal::Sell, Position::Long) => {
                ledger.close(bar);
            }
            _ => {}
        }
    })
}

fn simulate<F>(bars: &[Bar], signals: &[Signal], initial_capital: f64, mut step: F) -> LedgerOutcome
where
    F: FnMut(&mut Ledger, &Bar, Signal),
{
    let mut ledger = Ledger::new(initial_capital);
    let Some(first) = bars.first() else {
        return ledger.finish();
    };
    ledger.start(first);

    for (i, pair) in bars.windows(2).enumerate() {
        let (prev, bar) = (&pair[0], &pair[1]);
        let signal = signals.get(i + 1).copied().unwrap_or(Signal::Hold);
        step(&mut ledger, bar, signal);
        ledger.mark(bar, prev.close);
    }

    ledger.finish()
}
