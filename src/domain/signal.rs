//! Signal generation: indicator state to desired action per bar.

use serde::Serialize;

use crate::domain::indicator::IndicatorSeries;
use crate::domain::indicator::bollinger::Band;

/// Tri-state desired action for one bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Signal {
    /// +1: want long.
    Buy,
    /// -1: want short (Bollinger) or out of the market (crossover).
    Sell,
    /// 0: no action this bar. Not an instruction to flatten.
    Hold,
}

impl Signal {
    /// Map a signed value to a signal; only the sign matters.
    pub fn from_sign(value: i8) -> Self {
        match value.signum() {
            1 => Signal::Buy,
            -1 => Signal::Sell,
            _ => Signal::Hold,
        }
    }

    pub fn as_i8(self) -> i8 {
        match self {
            Signal::Buy => 1,
            Signal::Sell => -1,
            Signal::Hold => 0,
        }
    }
}

/// Level-based Bollinger policy, evaluated independently per bar.
///
/// Close below the lower band asks for long, above the upper band for short.
/// Anything else, including warmup bars, is `Hold`: re-entering the bands
/// does not exit an open position, only the opposite band does.
pub fn bollinger_signals(closes: &[f64], bands: &IndicatorSeries<Band>) -> Vec<Signal> {
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| match bands.get(i) {
            Some(band) if close < band.lower => Signal::Buy,
            Some(band) if close > band.upper => Signal::Sell,
            _ => Signal::Hold,
        })
        .collect()
}

/// Raw crossover state: +1 when fast is strictly above slow, else -1.
///
/// An undefined average compares as "not above", so warmup bars read -1.
pub fn crossover_state(fast: &IndicatorSeries, slow: &IndicatorSeries) -> Vec<i8> {
    (0..fast.len().max(slow.len()))
        .map(|i| match (fast.get(i), slow.get(i)) {
            (Some(f), Some(s)) if f > s => 1,
            _ => -1,
        })
        .collect()
}

/// Edge-triggered crossover policy: the first difference of the raw state.
///
/// A -1 to +1 flip yields `Buy`, +1 to -1 yields `Sell`. The first bar has no
/// prior state and is always `Hold`.
pub fn crossover_signals(fast: &IndicatorSeries, slow: &IndicatorSeries) -> Vec<Signal> {
    let state = crossover_state(fast, slow);
    let mut signals = Vec::with_capacity(state.len());
    for (i, &current) in state.iter().enumerate() {
        let signal = if i == 0 {
            Signal::Hold
        } else {
            Signal::from_sign(current - state[i - 1])
        };
        signals.push(signal);
    }
    signals
}
