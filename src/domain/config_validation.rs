//! Configuration validation.
//!
//! Runs over the layered INI view (file values plus CLI overrides) before
//! anything touches the bar store.

use crate::domain::error::BandcrossError;
use crate::domain::strategy::StrategyKind;
use crate::ports::config_port::ConfigPort;
use chrono::NaiveDate;

pub fn validate_backtest_config(config: &dyn ConfigPort) -> Result<(), BandcrossError> {
    validate_symbol(config)?;
    validate_dates(config)?;
    validate_initial_capital(config)?;
    validate_strategy_name(config)?;
    Ok(())
}

/// Check the parameter section of the selected strategy. Keys that are
/// absent fall back to defaults and are not errors.
pub fn validate_strategy_config(
    config: &dyn ConfigPort,
    kind: StrategyKind,
) -> Result<(), BandcrossError> {
    match kind {
        StrategyKind::Bollinger => {
            validate_positive_int(config, "bollinger", "window")?;
            validate_positive_float(config, "bollinger", "num_std")?;
        }
        StrategyKind::Crossover => {
            validate_positive_int(config, "crossover", "fast_window")?;
            validate_positive_int(config, "crossover", "slow_window")?;
        }
    }
    Ok(())
}

pub fn validate_database_config(config: &dyn ConfigPort) -> Result<(), BandcrossError> {
    validate_positive_int(config, "database", "pool_size")
}

/// Read `[backtest] strategy`, defaulting to bollinger.
pub fn strategy_kind(config: &dyn ConfigPort) -> Result<StrategyKind, BandcrossError> {
    match config.get_string("backtest", "strategy") {
        None => Ok(StrategyKind::Bollinger),
        Some(s) => s.parse().map_err(|_| BandcrossError::ConfigInvalid {
            section: "backtest".to_string(),
            key: "strategy".to_string(),
            reason: format!("unknown strategy '{}', expected bollinger or crossover", s.trim()),
        }),
    }
}

pub fn parse_date(value: Option<&str>, field: &str) -> Result<NaiveDate, BandcrossError> {
    match value {
        None => Err(BandcrossError::ConfigMissing {
            section: "backtest".to_string(),
            key: field.to_string(),
        }),
        Some(s) => NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").map_err(|_| {
            BandcrossError::ConfigInvalid {
                section: "backtest".to_string(),
                key: field.to_string(),
                reason: format!("invalid {} format, expected YYYY-MM-DD", field),
            }
        }),
    }
}

fn validate_symbol(config: &dyn ConfigPort) -> Result<(), BandcrossError> {
    match config.get_string("backtest", "symbol") {
        Some(s) if !s.trim().is_empty() => Ok(()),
        _ => Err(BandcrossError::ConfigMissing {
            section: "backtest".to_string(),
            key: "symbol".to_string(),
        }),
    }
}

fn validate_dates(config: &dyn ConfigPort) -> Result<(), BandcrossError> {
    let start_str = config.get_string("backtest", "start_date");
    let end_str = config.get_string("backtest", "end_date");

    let start_date = parse_date(start_str.as_deref(), "start_date")?;
    let end_date = parse_date(end_str.as_deref(), "end_date")?;

    // a single day is a valid range for minute bars
    if start_date > end_date {
        return Err(BandcrossError::ConfigInvalid {
            section: "backtest".to_string(),
            key: "start_date".to_string(),
            reason: "start_date must not be after end_date".to_string(),
        });
    }
    Ok(())
}

fn validate_initial_capital(config: &dyn ConfigPort) -> Result<(), BandcrossError> {
    validate_positive_float(config, "backtest", "initial_capital")
}

fn validate_strategy_name(config: &dyn ConfigPort) -> Result<(), BandcrossError> {
    strategy_kind(config).map(|_| ())
}

fn validate_positive_int(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
) -> Result<(), BandcrossError> {
    let Some(raw) = config.get_string(section, key) else {
        return Ok(());
    };
    let value: i64 = raw.trim().parse().map_err(|_| BandcrossError::ConfigInvalid {
        section: section.to_string(),
        key: key.to_string(),
        reason: format!("'{}' is not an integer", raw.trim()),
    })?;
    if value <= 0 {
        return Err(BandcrossError::configuration(
            key,
            format!("must be > 0, got {value}"),
        ));
    }
    Ok(())
}

fn validate_positive_float(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
) -> Result<(), BandcrossError> {
    let Some(raw) = config.get_string(section, key) else {
        return Ok(());
    };
    let value: f64 = raw.trim().parse().map_err(|_| BandcrossError::ConfigInvalid {
        section: section.to_string(),
        key: key.to_string(),
        reason: format!("'{}' is not a number", raw.trim()),
    })?;
    if !(value > 0.0 && value.is_finite()) {
        return Err(BandcrossError::configuration(
            key,
            format!("must be a finite number > 0, got {value}"),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::file_config_adapter::FileConfigAdapter;

    fn make_config(content: &str) -> FileConfigAdapter {
        FileConfigAdapter::from_string(content).unwrap()
    }

    const VALID: &str = r#"
[backtest]
symbol = AAPL
start_date = 2023-01-03
end_date = 2023-03-31
initial_capital = 100000.0
strategy = crossover

[crossover]
fast_window = 10
slow_window = 30
"#;

    #[test]
    fn valid_backtest_config_passes() {
        let config = make_config(VALID);
        assert!(validate_backtest_config(&config).is_ok());
        assert!(validate_strategy_config(&config, StrategyKind::Crossover).is_ok());
        assert_eq!(strategy_kind(&config).unwrap(), StrategyKind::Crossover);
    }

    #[test]
    fn missing_symbol_fails() {
        let config = make_config("[backtest]\nstart_date = 2023-01-03\nend_date = 2023-01-04\n");
        let err = validate_backtest_config(&config).unwrap_err();
        assert!(matches!(err, BandcrossError::ConfigMissing { key, .. } if key == "symbol"));
    }

    #[test]
    fn missing_end_date_fails() {
        let config = make_config("[backtest]\nsymbol = AAPL\nstart_date = 2023-01-03\n");
        let err = validate_backtest_config(&config).unwrap_err();
        assert!(matches!(err, BandcrossError::ConfigMissing { key, .. } if key == "end_date"));
    }

    #[test]
    fn invalid_start_date_format_fails() {
        let config =
            make_config("[backtest]\nsymbol = AAPL\nstart_date = 03/01/2023\nend_date = 2023-01-04\n");
        let err = validate_backtest_config(&config).unwrap_err();
        assert!(matches!(err, BandcrossError::ConfigInvalid { key, .. } if key == "start_date"));
    }

    #[test]
    fn start_after_end_fails() {
        let config =
            make_config("[backtest]\nsymbol = AAPL\nstart_date = 2023-02-01\nend_date = 2023-01-04\n");
        assert!(validate_backtest_config(&config).is_err());
    }

    #[test]
    fn same_day_range_passes() {
        let config =
            make_config("[backtest]\nsymbol = AAPL\nstart_date = 2023-01-04\nend_date = 2023-01-04\n");
        assert!(validate_backtest_config(&config).is_ok());
    }

    #[test]
    fn initial_capital_zero_is_configuration_error() {
        let config = make_config(
            "[backtest]\nsymbol = AAPL\nstart_date = 2023-01-03\nend_date = 2023-01-04\ninitial_capital = 0\n",
        );
        let err = validate_backtest_config(&config).unwrap_err();
        assert!(
            matches!(err, BandcrossError::Configuration { parameter, .. } if parameter == "initial_capital")
        );
    }

    #[test]
    fn unknown_strategy_fails() {
        let config = make_config(
            "[backtest]\nsymbol = AAPL\nstart_date = 2023-01-03\nend_date = 2023-01-04\nstrategy = rsi\n",
        );
        let err = validate_backtest_config(&config).unwrap_err();
        assert!(matches!(err, BandcrossError::ConfigInvalid { key, .. } if key == "strategy"));
    }

    #[test]
    fn strategy_defaults_to_bollinger() {
        let config = make_config("[backtest]\nsymbol = AAPL\n");
        assert_eq!(strategy_kind(&config).unwrap(), StrategyKind::Bollinger);
    }

    #[test]
    fn negative_window_fails() {
        let config = make_config("[bollinger]\nwindow = -5\n");
        let err = validate_strategy_config(&config, StrategyKind::Bollinger).unwrap_err();
        assert!(matches!(err, BandcrossError::Configuration { parameter, .. } if parameter == "window"));
    }

    #[test]
    fn non_numeric_num_std_fails() {
        let config = make_config("[bollinger]\nnum_std = wide\n");
        let err = validate_strategy_config(&config, StrategyKind::Bollinger).unwrap_err();
        assert!(matches!(err, BandcrossError::ConfigInvalid { key, .. } if key == "num_std"));
    }

    #[test]
    fn zero_slow_window_fails() {
        let config = make_config("[crossover]\nfast_window = 5\nslow_window = 0\n");
        let err = validate_strategy_config(&config, StrategyKind::Crossover).unwrap_err();
        assert!(
            matches!(err, BandcrossError::Configuration { parameter, .. } if parameter == "slow_window")
        );
    }

    #[test]
    fn only_selected_strategy_section_is_checked() {
        let config = make_config("[crossover]\nfast_window = 0\n");
        assert!(validate_strategy_config(&config, StrategyKind::Bollinger).is_ok());
    }

    #[test]
    fn absent_sections_use_defaults() {
        let config = make_config("");
        assert!(validate_strategy_config(&config, StrategyKind::Bollinger).is_ok());
        assert!(validate_strategy_config(&config, StrategyKind::Crossover).is_ok());
        assert!(validate_database_config(&config).is_ok());
    }

    #[test]
    fn zero_pool_size_fails() {
        let config = make_config("[database]\npool_size = 0\n");
        assert!(validate_database_config(&config).is_err());
    }
}
