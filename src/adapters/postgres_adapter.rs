//! PostgreSQL bar store and backtest log.
//!
//! Reads the `trading_info` table written by the ingestion jobs; numeric
//! columns are cast to `double precision` on the way out.

use crate::domain::backtest::{BacktestLogEntry, BacktestResult};
use crate::domain::bar::Bar;
use crate::domain::error::BandcrossError;
use crate::ports::backtest_log_port::BacktestLogPort;
use crate::ports::config_port::ConfigPort;
use crate::ports::data_port::{DataPort, DataRange};
use chrono::{DateTime, NaiveDate, NaiveTime, TimeDelta, Utc};
use postgres::types::ToSql;
use postgres::{Client, NoTls};
use std::cell::RefCell;

pub struct PostgresAdapter {
    client: RefCell<Client>,
}

fn query_err(e: postgres::Error) -> BandcrossError {
    BandcrossError::DatabaseQuery {
        reason: e.to_string(),
    }
}

impl PostgresAdapter {
    pub fn from_config(config: &dyn ConfigPort) -> Result<Self, BandcrossError> {
        let connection_string =
            config
                .get_string("database", "conninfo")
                .ok_or_else(|| BandcrossError::ConfigMissing {
                    section: "database".into(),
                    key: "conninfo".into(),
                })?;

        let client =
            Client::connect(&connection_string, NoTls).map_err(|e| BandcrossError::Database {
                reason: e.to_string(),
            })?;

        Ok(Self {
            client: RefCell::new(client),
        })
    }

    /// Create the backtest log table if it is missing. `trading_info` is
    /// owned by the ingestion side and is never created here.
    pub fn initialize_schema(&self) -> Result<(), BandcrossError> {
        self.client
            .borrow_mut()
            .batch_execute(
                "CREATE TABLE IF NOT EXISTS backtest_log (
                    id BIGSERIAL PRIMARY KEY,
                    strategy TEXT NOT NULL,
                    symbol TEXT NOT NULL,
                    total_return DOUBLE PRECISION NOT NULL,
                    annual_return DOUBLE PRECISION NOT NULL,
                    sharpe_ratio DOUBLE PRECISION,
                    number_of_trades BIGINT NOT NULL,
                    win_rate DOUBLE PRECISION NOT NULL,
                    profit_factor DOUBLE PRECISION,
                    created_at TIMESTAMPTZ NOT NULL DEFAULT now()
                )",
            )
            .map_err(query_err)
    }
}

impl DataPort for PostgresAdapter {
    fn fetch_bars(
        &self,
        symbol: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Vec<Bar>, BandcrossError> {
        let start_dt: DateTime<Utc> = start_date.and_time(NaiveTime::MIN).and_utc();
        let end_dt: DateTime<Utc> =
            end_date.and_time(NaiveTime::MIN).and_utc() + TimeDelta::seconds(86_399);

        let query = "SELECT symbol, timestamp, \
                            open_price::double precision, high_price::double precision, \
                            low_price::double precision, close_price::double precision, \
                            number_of_trades::bigint, volume::double precision, \
                            volume_weighted_average_price::double precision \
                     FROM public.trading_info \
                     WHERE symbol = $1 AND timestamp >= $2 AND timestamp <= $3 \
                     ORDER BY timestamp ASC";

        let params: &[&(dyn ToSql + Sync)] = &[&symbol, &start_dt, &end_dt];
        let rows = self
            .client
            .borrow_mut()
            .query(query, params)
            .map_err(query_err)?;

        let bars: Vec<Bar> = rows
            .into_iter()
            .map(|row| Bar {
                symbol: row.get(0),
                timestamp: row.get(1),
                open: row.get(2),
                high: row.get(3),
                low: row.get(4),
                close: row.get(5),
                trade_count: row.get(6),
                volume: row.get(7),
                vwap: row.get(8),
            })
            .collect();

        Ok(bars)
    }

    fn list_symbols(&self) -> Result<Vec<String>, BandcrossError> {
        let rows = self
            .client
            .borrow_mut()
            .query(
                "SELECT DISTINCT symbol FROM public.trading_info ORDER BY symbol",
                &[],
            )
            .map_err(query_err)?;

        Ok(rows.into_iter().map(|row| row.get(0)).collect())
    }

    fn get_data_range(&self, symbol: &str) -> Result<Option<DataRange>, BandcrossError> {
        let rows = self
            .client
            .borrow_mut()
            .query(
                "SELECT MIN(timestamp), MAX(timestamp), COUNT(*) \
                 FROM public.trading_info WHERE symbol = $1",
                &[&symbol],
            )
            .map_err(query_err)?;

        let Some(row) = rows.first() else {
            return Ok(None);
        };
        let first: Option<DateTime<Utc>> = row.get(0);
        let last: Option<DateTime<Utc>> = row.get(1);
        let count: i64 = row.get(2);

        match (first, last) {
            (Some(first), Some(last)) if count > 0 => Ok(Some(DataRange {
                first,
                last,
                bars: count as usize,
            })),
            _ => Ok(None),
        }
    }
}

impl BacktestLogPort for PostgresAdapter {
    fn record(&self, result: &BacktestResult) -> Result<i64, BandcrossError> {
        let m = &result.metrics;
        let strategy = result.strategy.to_string();
        let trades = m.trade_count as i64;
        let profit_factor = Some(m.profit_factor).filter(|pf| pf.is_finite());

        let row = self
            .client
            .borrow_mut()
            .query_one(
                "INSERT INTO backtest_log (strategy, symbol, total_return, annual_return,
                     sharpe_ratio, number_of_trades, win_rate, profit_factor)
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                 RETURNING id",
                &[
                    &strategy,
                    &result.symbol,
                    &m.total_return_pct,
                    &m.annualized_return_pct,
                    &m.sharpe_ratio,
                    &trades,
                    &m.win_rate_pct,
                    &profit_factor,
                ],
            )
            .map_err(query_err)?;

        Ok(row.get(0))
    }

    fn recent(&self, limit: usize) -> Result<Vec<BacktestLogEntry>, BandcrossError> {
        let rows = self
            .client
            .borrow_mut()
            .query(
                "SELECT id, strategy, symbol, total_return, annual_return, sharpe_ratio,
                        number_of_trades, win_rate, profit_factor, created_at
                 FROM backtest_log
                 ORDER BY id DESC
                 LIMIT $1",
                &[&(limit as i64)],
            )
            .map_err(query_err)?;

        Ok(rows
            .into_iter()
            .map(|row| BacktestLogEntry {
                id: row.get(0),
                strategy: row.get(1),
                symbol: row.get(2),
                total_return: row.get(3),
                annual_return: row.get(4),
                sharpe_ratio: row.get(5),
                number_of_trades: row.get(6),
                win_rate: row.get(7),
                profit_factor: row.get(8),
                created_at: row.get(9),
            })
            .collect())
    }
}
