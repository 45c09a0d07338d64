//! SQLite bar store and backtest log.
//!
//! Timestamps are stored as RFC 3339 text in UTC with whole seconds, so
//! string comparison orders them chronologically.

use crate::domain::backtest::{BacktestLogEntry, BacktestResult};
use crate::domain::bar::Bar;
use crate::domain::error::BandcrossError;
use crate::ports::backtest_log_port::BacktestLogPort;
use crate::ports::config_port::ConfigPort;
use crate::ports::data_port::{DataPort, DataRange};
use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::params;
use tracing::debug;

const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS trading_info (
        symbol TEXT NOT NULL,
        timestamp TEXT NOT NULL,
        open_price REAL NOT NULL,
        high_price REAL NOT NULL,
        low_price REAL NOT NULL,
        close_price REAL NOT NULL,
        number_of_trades INTEGER NOT NULL,
        volume REAL NOT NULL,
        volume_weighted_average_price REAL NOT NULL,
        PRIMARY KEY (symbol, timestamp)
    );
    CREATE INDEX IF NOT EXISTS idx_trading_info_timestamp ON trading_info(timestamp);
    CREATE TABLE IF NOT EXISTS backtest_log (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        strategy TEXT NOT NULL,
        symbol TEXT NOT NULL,
        total_return REAL NOT NULL,
        annual_return REAL NOT NULL,
        sharpe_ratio REAL,
        number_of_trades INTEGER NOT NULL,
        win_rate REAL NOT NULL,
        profit_factor REAL,
        created_at TEXT NOT NULL
    );";

pub struct SqliteAdapter {
    pool: Pool<SqliteConnectionManager>,
}

fn pool_err(e: r2d2::Error) -> BandcrossError {
    BandcrossError::Database {
        reason: e.to_string(),
    }
}

fn query_err(e: rusqlite::Error) -> BandcrossError {
    BandcrossError::DatabaseQuery {
        reason: e.to_string(),
    }
}

/// Fixed-width `YYYY-MM-DDTHH:MM:SS.ffffffZ`, so text order is time order.
fn format_ts(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_ts(idx: usize, raw: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
        })
}

/// Inclusive day bounds: `start 00:00:00` through the last microsecond of
/// `end`, in the same width as [`format_ts`].
fn day_bounds(start_date: NaiveDate, end_date: NaiveDate) -> (String, String) {
    (
        format!("{}T00:00:00.000000Z", start_date.format("%Y-%m-%d")),
        format!("{}T23:59:59.999999Z", end_date.format("%Y-%m-%d")),
    )
}

impl SqliteAdapter {
    /// Open the file named by `[database] sqlite_path` and ensure the schema.
    pub fn from_config(config: &dyn ConfigPort) -> Result<Self, BandcrossError> {
        let db_path = config.get_string("database", "sqlite_path").ok_or_else(|| {
            BandcrossError::ConfigMissing {
                section: "database".into(),
                key: "sqlite_path".into(),
            }
        })?;

        let pool_size = config.get_int("database", "pool_size", 4).max(1) as u32;

        let manager = SqliteConnectionManager::file(&db_path);
        let pool = Pool::builder()
            .max_size(pool_size)
            .build(manager)
            .map_err(pool_err)?;

        let adapter = Self { pool };
        adapter.initialize_schema()?;
        Ok(adapter)
    }

    /// Single-connection in-memory store. Every checkout sees the same
    /// database because the pool never opens a second connection.
    pub fn in_memory() -> Result<Self, BandcrossError> {
        let manager = SqliteConnectionManager::memory();
        let pool = Pool::builder().max_size(1).build(manager).map_err(pool_err)?;

        Ok(Self { pool })
    }

    fn conn(&self) -> Result<PooledConnection<SqliteConnectionManager>, BandcrossError> {
        self.pool.get().map_err(pool_err)
    }

    pub fn initialize_schema(&self) -> Result<(), BandcrossError> {
        self.conn()?.execute_batch(SCHEMA).map_err(query_err)
    }

    /// Upsert bars keyed on `(symbol, timestamp)`. Returns rows written.
    pub fn insert_bars(&self, bars: &[Bar]) -> Result<usize, BandcrossError> {
        let mut conn = self.conn()?;
        let tx = conn.transaction().map_err(query_err)?;

        let mut written = 0;
        for bar in bars {
            written += tx
                .execute(
                    "INSERT INTO trading_info (symbol, timestamp, open_price, high_price, low_price,
                         close_price, number_of_trades, volume, volume_weighted_average_price)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
                     ON CONFLICT (symbol, timestamp) DO UPDATE SET
                         open_price = excluded.open_price,
                         high_price = excluded.high_price,
                         low_price = excluded.low_price,
                         close_price = excluded.close_price,
                         number_of_trades = excluded.number_of_trades,
                         volume = excluded.volume,
                         volume_weighted_average_price = excluded.volume_weighted_average_price",
                    params![
                        bar.symbol,
                        format_ts(bar.timestamp),
                        bar.open,
                        bar.high,
                        bar.low,
                        bar.close,
                        bar.trade_count,
                        bar.volume,
                        bar.vwap
                    ],
                )
                .map_err(query_err)?;
        }

        tx.commit().map_err(query_err)?;
        debug!(rows = written, "bars upserted");

        Ok(written)
    }
}

impl DataPort for SqliteAdapter {
    fn fetch_bars(
        &self,
        symbol: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Vec<Bar>, BandcrossError> {
        let conn = self.conn()?;
        let (start, end) = day_bounds(start_date, end_date);

        let mut stmt = conn
            .prepare(
                "SELECT symbol, timestamp, open_price, high_price, low_price, close_price,
                        number_of_trades, volume, volume_weighted_average_price
                 FROM trading_info
                 WHERE symbol = ?1 AND timestamp >= ?2 AND timestamp <= ?3
                 ORDER BY timestamp ASC",
            )
            .map_err(query_err)?;

        let rows = stmt
            .query_map(params![symbol, start, end], |row| {
                let ts: String = row.get(1)?;
                Ok(Bar {
                    symbol: row.get(0)?,
                    timestamp: parse_ts(1, &ts)?,
                    open: row.get(2)?,
                    high: row.get(3)?,
                    low: row.get(4)?,
                    close: row.get(5)?,
                    trade_count: row.get(6)?,
                    volume: row.get(7)?,
                    vwap: row.get(8)?,
                })
            })
            .map_err(query_err)?;

        rows.collect::<Result<Vec<_>, _>>().map_err(query_err)
    }

    fn list_symbols(&self) -> Result<Vec<String>, BandcrossError> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare("SELECT DISTINCT symbol FROM trading_info ORDER BY symbol")
            .map_err(query_err)?;

        let rows = stmt.query_map([], |row| row.get(0)).map_err(query_err)?;
        rows.collect::<Result<Vec<String>, _>>().map_err(query_err)
    }

    fn get_data_range(&self, symbol: &str) -> Result<Option<DataRange>, BandcrossError> {
        let conn = self.conn()?;

        let result: (Option<String>, Option<String>, i64) = conn
            .query_row(
                "SELECT MIN(timestamp), MAX(timestamp), COUNT(*) FROM trading_info WHERE symbol = ?1",
                params![symbol],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .map_err(query_err)?;

        match result {
            (Some(first), Some(last), count) if count > 0 => Ok(Some(DataRange {
                first: parse_ts(0, &first).map_err(query_err)?,
                last: parse_ts(1, &last).map_err(query_err)?,
                bars: count as usize,
            })),
            _ => Ok(None),
        }
    }
}

impl BacktestLogPort for SqliteAdapter {
    fn record(&self, result: &BacktestResult) -> Result<i64, BandcrossError> {
        let conn = self.conn()?;
        let m = &result.metrics;
        let profit_factor = Some(m.profit_factor).filter(|pf| pf.is_finite());

        conn.execute(
            "INSERT INTO backtest_log (strategy, symbol, total_return, annual_return, sharpe_ratio,
                 number_of_trades, win_rate, profit_factor, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                result.strategy.to_string(),
                result.symbol,
                m.total_return_pct,
                m.annualized_return_pct,
                m.sharpe_ratio,
                m.trade_count as i64,
                m.win_rate_pct,
                profit_factor,
                format_ts(Utc::now())
            ],
        )
        .map_err(query_err)?;

        Ok(conn.last_insert_rowid())
    }

    fn recent(&self, limit: usize) -> Result<Vec<BacktestLogEntry>, BandcrossError> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare(
                "SELECT id, strategy, symbol, total_return, annual_return, sharpe_ratio,
                        number_of_trades, win_rate, profit_factor, created_at
                 FROM backtest_log
                 ORDER BY id DESC
                 LIMIT ?1",
            )
            .map_err(query_err)?;

        let rows = stmt
            .query_map(params![limit as i64], |row| {
                let created_at: String = row.get(9)?;
                Ok(BacktestLogEntry {
                    id: row.get(0)?,
                    strategy: row.get(1)?,
                    symbol: row.get(2)?,
                    total_return: row.get(3)?,
                    annual_return: row.get(4)?,
                    sharpe_ratio: row.get(5)?,
                    number_of_trades: row.get(6)?,
                    win_rate: row.get(7)?,
                    profit_factor: row.get(8)?,
                    created_at: parse_ts(9, &created_at)?,
                })
            })
            .map_err(query_err)?;

        rows.collect::<Result<Vec<_>, _>>().map_err(query_err)
    }
}
