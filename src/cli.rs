//! CLI definition and dispatch.

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{debug, info, warn};

use crate::adapters::csv_adapter::CsvAdapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::adapters::json_report_adapter::JsonReportAdapter;
use crate::domain::backtest::{
    self as backtest_engine, BacktestConfig, BacktestResult, DEFAULT_INITIAL_CAPITAL,
};
use crate::domain::config_validation::{
    parse_date, strategy_kind, validate_backtest_config, validate_database_config,
    validate_strategy_config,
};
use crate::domain::error::BandcrossError;
use crate::domain::indicator::bollinger::{DEFAULT_NUM_STD, DEFAULT_PERIOD};
use crate::domain::strategy::{
    BollingerParams, CrossoverParams, DEFAULT_FAST_WINDOW, DEFAULT_SLOW_WINDOW, Strategy,
    StrategyKind,
};
use crate::ports::backtest_log_port::BacktestLogPort;
use crate::ports::config_port::ConfigPort;
use crate::ports::data_port::DataPort;
use crate::ports::report_port::ReportPort;

#[derive(Parser, Debug)]
#[command(
    name = "bandcross",
    about = "Bollinger Bands and moving-average crossover backtester"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run a backtest
    Backtest(BacktestArgs),
    /// Load bars from a CSV file into the SQLite store
    Import {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long)]
        csv: PathBuf,
        #[arg(long)]
        symbol: String,
    },
    /// List symbols with stored bars
    ListSymbols {
        #[arg(short, long)]
        config: Option<PathBuf>,
        #[arg(long)]
        csv_dir: Option<PathBuf>,
    },
    /// Show the stored data range for a symbol
    Info {
        #[arg(long)]
        symbol: String,
        #[arg(short, long)]
        config: Option<PathBuf>,
        #[arg(long)]
        csv_dir: Option<PathBuf>,
    },
    /// Show recent backtest log entries
    Logs {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },
}

/// Flags for `backtest`. Each one overrides the matching INI value.
#[derive(Args, Debug, Default)]
pub struct BacktestArgs {
    #[arg(short, long)]
    pub config: Option<PathBuf>,
    /// bollinger or crossover
    #[arg(short, long)]
    pub strategy: Option<String>,
    #[arg(long)]
    pub symbol: Option<String>,
    /// First day, YYYY-MM-DD
    #[arg(long)]
    pub start: Option<String>,
    /// Last day (inclusive), YYYY-MM-DD
    #[arg(long)]
    pub end: Option<String>,
    #[arg(long)]
    pub window: Option<usize>,
    #[arg(long)]
    pub num_std: Option<f64>,
    #[arg(long)]
    pub fast_window: Option<usize>,
    #[arg(long)]
    pub slow_window: Option<usize>,
    #[arg(long)]
    pub initial_capital: Option<f64>,
    /// Read bars from <DIR>/<SYMBOL>.csv instead of the database
    #[arg(long)]
    pub csv_dir: Option<PathBuf>,
    /// Write the full result as JSON
    #[arg(short, long)]
    pub output: Option<PathBuf>,
    /// Do not record the run in the backtest log
    #[arg(long)]
    pub no_log: bool,
}

pub fn run(cli: Cli) -> ExitCode {
    let result = match cli.command {
        Command::Backtest(args) => run_backtest(&args),
        Command::Import {
            config,
            csv,
            symbol,
        } => run_import(&config, &csv, &symbol),
        Command::ListSymbols { config, csv_dir } => {
            run_list_symbols(config.as_deref(), csv_dir.as_deref())
        }
        Command::Info {
            symbol,
            config,
            csv_dir,
        } => run_info(&symbol, config.as_deref(), csv_dir.as_deref()),
        Command::Logs { config, limit } => run_logs(&config, limit),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            (&e).into()
        }
    }
}

pub fn load_config(path: &Path) -> Result<FileConfigAdapter, BandcrossError> {
    FileConfigAdapter::from_file(path).map_err(|e| BandcrossError::ConfigParse {
        file: path.display().to_string(),
        reason: e.to_string(),
    })
}

fn load_optional_config(path: Option<&Path>) -> Result<FileConfigAdapter, BandcrossError> {
    match path {
        Some(p) => {
            eprintln!("Loading config from {}", p.display());
            load_config(p)
        }
        None => Ok(FileConfigAdapter::empty()),
    }
}

/// Layer command-line flags over the file configuration.
pub fn apply_overrides(config: &mut FileConfigAdapter, args: &BacktestArgs) {
    if let Some(s) = &args.strategy {
        config.set("backtest", "strategy", s.as_str());
    }
    if let Some(s) = &args.symbol {
        config.set("backtest", "symbol", s.as_str());
    }
    if let Some(s) = &args.start {
        config.set("backtest", "start_date", s.as_str());
    }
    if let Some(s) = &args.end {
        config.set("backtest", "end_date", s.as_str());
    }
    if let Some(v) = args.initial_capital {
        config.set("backtest", "initial_capital", v.to_string());
    }
    if let Some(v) = args.window {
        config.set("bollinger", "window", v.to_string());
    }
    if let Some(v) = args.num_std {
        config.set("bollinger", "num_std", v.to_string());
    }
    if let Some(v) = args.fast_window {
        config.set("crossover", "fast_window", v.to_string());
    }
    if let Some(v) = args.slow_window {
        config.set("crossover", "slow_window", v.to_string());
    }
}

/// Validate the layered configuration and assemble a [`BacktestConfig`].
pub fn build_backtest_config(config: &dyn ConfigPort) -> Result<BacktestConfig, BandcrossError> {
    validate_backtest_config(config)?;
    let kind = strategy_kind(config)?;
    validate_strategy_config(config, kind)?;

    let symbol = config
        .get_string("backtest", "symbol")
        .map(|s| s.trim().to_uppercase())
        .unwrap_or_default();
    let start_date = config_date(config, "start_date")?;
    let end_date = config_date(config, "end_date")?;

    let bt_config = BacktestConfig {
        symbol,
        start_date,
        end_date,
        initial_capital: config.get_double("backtest", "initial_capital", DEFAULT_INITIAL_CAPITAL),
        strategy: build_strategy(config, kind),
    };
    bt_config.validate()?;

    if let Strategy::Crossover(p) = &bt_config.strategy {
        if p.fast_window >= p.slow_window {
            warn!(
                fast_window = p.fast_window,
                slow_window = p.slow_window,
                "fast window is not shorter than slow window"
            );
        }
    }

    Ok(bt_config)
}

fn config_date(config: &dyn ConfigPort, key: &str) -> Result<NaiveDate, BandcrossError> {
    parse_date(config.get_string("backtest", key).as_deref(), key)
}

pub fn build_strategy(config: &dyn ConfigPort, kind: StrategyKind) -> Strategy {
    match kind {
        StrategyKind::Bollinger => Strategy::Bollinger(BollingerParams {
            window: config.get_int("bollinger", "window", DEFAULT_PERIOD as i64).max(0) as usize,
            num_std: config.get_double("bollinger", "num_std", DEFAULT_NUM_STD),
        }),
        StrategyKind::Crossover => Strategy::Crossover(CrossoverParams {
            fast_window: config
                .get_int("crossover", "fast_window", DEFAULT_FAST_WINDOW as i64)
                .max(0) as usize,
            slow_window: config
                .get_int("crossover", "slow_window", DEFAULT_SLOW_WINDOW as i64)
                .max(0) as usize,
        }),
    }
}

/// A database that serves bars and keeps the backtest log.
pub trait BarStore: DataPort + BacktestLogPort {}

impl<T: DataPort + BacktestLogPort> BarStore for T {}

/// Open the configured database: postgres when `[database] conninfo` is set
/// and the feature is enabled, otherwise SQLite from `sqlite_path`.
pub fn open_store(config: &dyn ConfigPort) -> Result<Option<Box<dyn BarStore>>, BandcrossError> {
    validate_database_config(config)?;

    #[cfg(feature = "postgres")]
    {
        use crate::adapters::postgres_adapter::PostgresAdapter;

        if config.get_string("database", "conninfo").is_some() {
            let adapter = PostgresAdapter::from_config(config)?;
            adapter.initialize_schema()?;
            debug!("opened postgres store");
            return Ok(Some(Box::new(adapter)));
        }
    }

    #[cfg(feature = "sqlite")]
    {
        use crate::adapters::sqlite_adapter::SqliteAdapter;

        if config.get_string("database", "sqlite_path").is_some() {
            let adapter = SqliteAdapter::from_config(config)?;
            debug!("opened sqlite store");
            return Ok(Some(Box::new(adapter)));
        }
    }

    Ok(None)
}

fn require_store(config: &dyn ConfigPort) -> Result<Box<dyn BarStore>, BandcrossError> {
    open_store(config)?.ok_or_else(|| BandcrossError::ConfigMissing {
        section: "database".into(),
        key: "sqlite_path".into(),
    })
}

fn run_backtest(args: &BacktestArgs) -> Result<(), BandcrossError> {
    let mut config = load_optional_config(args.config.as_deref())?;
    apply_overrides(&mut config, args);

    let bt_config = build_backtest_config(&config)?;
    eprintln!(
        "Running {} on {}: {} to {}",
        bt_config.strategy, bt_config.symbol, bt_config.start_date, bt_config.end_date
    );

    let store = if args.csv_dir.is_some() && args.no_log {
        None
    } else {
        open_store(&config)?
    };

    let result = match (&args.csv_dir, &store) {
        (Some(dir), _) => backtest_engine::run_backtest(&CsvAdapter::new(dir.clone()), &bt_config)?,
        (None, Some(store)) => backtest_engine::run_backtest(&**store, &bt_config)?,
        (None, None) => {
            return Err(BandcrossError::ConfigMissing {
                section: "database".into(),
                key: "sqlite_path".into(),
            });
        }
    };

    eprint!("{}", format_summary(&result));

    let output = args
        .output
        .clone()
        .or_else(|| config.get_string("report", "output").map(PathBuf::from));
    if let Some(path) = output {
        JsonReportAdapter::new().write(&result, &path)?;
        eprintln!("\nReport written to: {}", path.display());
    }

    match (&store, args.no_log) {
        (Some(store), false) => {
            let id = store.record(&result)?;
            info!(id, "backtest logged");
        }
        (None, false) => debug!("no database configured, skipping backtest log"),
        (_, true) => {}
    }

    Ok(())
}

/// Console summary, values rounded to two decimals.
pub fn format_summary(result: &BacktestResult) -> String {
    let m = &result.metrics;
    let title = match result.strategy {
        StrategyKind::Bollinger => "Bollinger Bands",
        StrategyKind::Crossover => "Moving Average Crossover",
    };

    let mut out = format!("\n=== {} Results: {} ===\n", title, result.symbol);
    out.push_str(&format!("Bars:             {}\n", result.bar_count));
    out.push_str(&format!("Total Return:     {:.2}%\n", m.total_return_pct));
    out.push_str(&format!("Annualized:       {:.2}%\n", m.annualized_return_pct));
    match m.sharpe_ratio {
        Some(s) => out.push_str(&format!("Sharpe Ratio:     {:.2}\n", s)),
        None => out.push_str("Sharpe Ratio:     N/A\n"),
    }
    out.push_str(&format!("Max Drawdown:     {:.2}%\n", m.max_drawdown_pct));
    out.push_str(&format!("Total Trades:     {}\n", m.trade_count));
    out.push_str(&format!("Win Rate:         {:.2}%\n", m.win_rate_pct));
    if m.profit_factor.is_finite() {
        out.push_str(&format!("Profit Factor:    {:.2}\n", m.profit_factor));
    } else {
        out.push_str("Profit Factor:    inf\n");
    }
    if let Some(duration) = &m.avg_trade_duration {
        out.push_str(&format!("Avg Trade:        {}\n", duration));
    }
    out.push_str(&format!("Final Capital:    {:.2}\n", result.final_capital));
    out
}

fn run_import(config_path: &Path, csv_path: &Path, symbol: &str) -> Result<(), BandcrossError> {
    let config = load_config(config_path)?;
    validate_database_config(&config)?;
    let symbol = symbol.trim().to_uppercase();

    let bars = CsvAdapter::read_file(csv_path, &symbol)?;
    eprintln!("Read {} bars for {} from {}", bars.len(), symbol, csv_path.display());

    #[cfg(feature = "sqlite")]
    {
        use crate::adapters::sqlite_adapter::SqliteAdapter;

        let store = SqliteAdapter::from_config(&config)?;
        let written = store.insert_bars(&bars)?;
        eprintln!("Imported {} bars", written);
        Ok(())
    }

    #[cfg(not(feature = "sqlite"))]
    {
        let _ = (config, bars);
        Err(BandcrossError::Database {
            reason: "sqlite feature is required for import".into(),
        })
    }
}

fn run_list_symbols(config_path: Option<&Path>, csv_dir: Option<&Path>) -> Result<(), BandcrossError> {
    let symbols = match csv_dir {
        Some(dir) => CsvAdapter::new(dir.to_path_buf()).list_symbols()?,
        None => {
            let config = load_optional_config(config_path)?;
            require_store(&config)?.list_symbols()?
        }
    };

    if symbols.is_empty() {
        eprintln!("No symbols found");
    } else {
        for symbol in &symbols {
            println!("{}", symbol);
        }
        eprintln!("{} symbols found", symbols.len());
    }
    Ok(())
}

fn run_info(symbol: &str, config_path: Option<&Path>, csv_dir: Option<&Path>) -> Result<(), BandcrossError> {
    let symbol = symbol.trim().to_uppercase();
    let range = match csv_dir {
        Some(dir) => CsvAdapter::new(dir.to_path_buf()).get_data_range(&symbol)?,
        None => {
            let config = load_optional_config(config_path)?;
            require_store(&config)?.get_data_range(&symbol)?
        }
    };

    match range {
        Some(r) => println!("{}: {} bars, {} to {}", symbol, r.bars, r.first, r.last),
        None => eprintln!("{}: no data found", symbol),
    }
    Ok(())
}

fn run_logs(config_path: &Path, limit: usize) -> Result<(), BandcrossError> {
    let config = load_config(config_path)?;
    let entries = require_store(&config)?.recent(limit)?;

    if entries.is_empty() {
        eprintln!("No backtests logged");
        return Ok(());
    }

    println!(
        "{:>5}  {:<10} {:<8} {:>10} {:>10} {:>8} {:>7} {:>9} {:>8}  {}",
        "id", "strategy", "symbol", "return%", "annual%", "sharpe", "trades", "win%", "pf", "created"
    );
    for e in &entries {
        let sharpe = e
            .sharpe_ratio
            .map_or_else(|| "N/A".to_string(), |s| format!("{s:.2}"));
        println!(
            "{:>5}  {:<10} {:<8} {:>10.2} {:>10.2} {:>8} {:>7} {:>9.2} {:>8}  {}",
            e.id,
            e.strategy,
            e.symbol,
            e.total_return,
            e.annual_return,
            sharpe,
            e.number_of_trades,
            e.win_rate,
            e.profit_factor_display(),
            e.created_at.format("%Y-%m-%d %H:%M:%S")
        );
    }
    Ok(())
}
