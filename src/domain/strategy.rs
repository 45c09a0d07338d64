//! Strategy selection and parameters.

use serde::Serialize;
use std::fmt;
use std::str::FromStr;

use super::error::BandcrossError;
use super::indicator::bollinger::{DEFAULT_NUM_STD, DEFAULT_PERIOD};
use super::metrics::TradeCounting;

pub const DEFAULT_FAST_WINDOW: usize = 10;
pub const DEFAULT_SLOW_WINDOW: usize = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StrategyKind {
    Bollinger,
    Crossover,
}

impl StrategyKind {
    pub fn trade_counting(self) -> TradeCounting {
        match self {
            StrategyKind::Bollinger => TradeCounting::LogEntries,
            StrategyKind::Crossover => TradeCounting::RoundTrips,
        }
    }

    pub fn reports_trade_duration(self) -> bool {
        self == StrategyKind::Crossover
    }
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StrategyKind::Bollinger => write!(f, "bollinger"),
            StrategyKind::Crossover => write!(f, "crossover"),
        }
    }
}

impl FromStr for StrategyKind {
    type Err = BandcrossError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "bollinger" | "bollinger_bands" => Ok(StrategyKind::Bollinger),
            "crossover" | "moving_average_crossover" | "sma_crossover" => {
                Ok(StrategyKind::Crossover)
            }
            other => Err(BandcrossError::configuration(
                "strategy",
                format!("unknown strategy '{other}' (expected bollinger or crossover)"),
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BollingerParams {
    pub window: usize,
    pub num_std: f64,
}

impl Default for BollingerParams {
    fn default() -> Self {
        BollingerParams {
            window: DEFAULT_PERIOD,
            num_std: DEFAULT_NUM_STD,
        }
    }
}

impl BollingerParams {
    pub fn validate(&self) -> Result<(), BandcrossError> {
        if self.window == 0 {
            return Err(BandcrossError::configuration("window", "must be > 0"));
        }
        if !(self.num_std > 0.0 && self.num_std.is_finite()) {
            return Err(BandcrossError::configuration(
                "num_std",
                format!("must be a finite number > 0, got {}", self.num_std),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CrossoverParams {
    pub fast_window: usize,
    pub slow_window: usize,
}

impl Default for CrossoverParams {
    fn default() -> Self {
        CrossoverParams {
            fast_window: DEFAULT_FAST_WINDOW,
            slow_window: DEFAULT_SLOW_WINDOW,
        }
    }
}

impl CrossoverParams {
    /// Both windows must be positive. `fast_window >= slow_window` is
    /// allowed; the signal semantics still hold, they just invert intent.
    pub fn validate(&self) -> Result<(), BandcrossError> {
        if self.fast_window == 0 {
            return Err(BandcrossError::configuration("fast_window", "must be > 0"));
        }
        if self.slow_window == 0 {
            return Err(BandcrossError::configuration("slow_window", "must be > 0"));
        }
        Ok(())
    }

    /// Longest warmup of the two averages.
    pub fn max_window(&self) -> usize {
        self.fast_window.max(self.slow_window)
    }
}

/// A fully parameterized strategy.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Strategy {
    Bollinger(BollingerParams),
    Crossover(CrossoverParams),
}

impl Strategy {
    pub fn kind(&self) -> StrategyKind {
        match self {
            Strategy::Bollinger(_) => StrategyKind::Bollinger,
            Strategy::Crossover(_) => StrategyKind::Crossover,
        }
    }

    pub fn validate(&self) -> Result<(), BandcrossError> {
        match self {
            Strategy::Bollinger(p) => p.validate(),
            Strategy::Crossover(p) => p.validate(),
        }
    }

    /// Bars needed before the first indicator value is defined.
    pub fn required_bars(&self) -> usize {
        match self {
            Strategy::Bollinger(p) => p.window,
            Strategy::Crossover(p) => p.max_window(),
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Strategy::Bollinger(p) => write!(f, "bollinger(window={}, num_std={})", p.window, p.num_std),
            Strategy::Crossover(p) => write!(
                f,
                "crossover(fast={}, slow={})",
                p.fast_window, p.slow_window
            ),
        }
    }
}
