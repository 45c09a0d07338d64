//! bandcross — single-symbol Bollinger Bands and moving-average crossover
//! backtester over stored minute bars.
//!
//! Hexagonal architecture: domain logic in [`domain`], port traits in [`ports`],
//! concrete implementations in [`adapters`].

pub mod adapters;
pub mod cli;
pub mod domain;
pub mod ports;
