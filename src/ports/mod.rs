//! Port traits: the seams between the backtest core and the outside world.

pub mod backtest_log_port;
pub mod config_port;
pub mod data_port;
pub mod report_port;
