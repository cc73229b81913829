//! SQLite price store.
//!
//! One `prices` table keyed by (symbol, date). Missing price cells are stored
//! as NULL and read back as NaN. A single-row `refresh_lock` table serves as
//! the [`RefreshLock`] shared by every process that opens the same file.

use crate::domain::error::ScannerError;
use crate::domain::ohlcv::OhlcvBar;
use crate::ports::config_port::ConfigPort;
use crate::ports::price_store::PriceStore;
use crate::ports::refresh_lock::RefreshLock;
use chrono::NaiveDate;
use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{params, OptionalExtension};
use std::time::{SystemTime, UNIX_EPOCH};

const DATE_FORMAT: &str = "%Y-%m-%d";

/// A lock row older than this is assumed abandoned by a crashed process.
const STALE_LOCK_SECS: i64 = 6 * 60 * 60;

#[derive(Clone)]
pub struct SqliteAdapter {
    pool: Pool<SqliteConnectionManager>,
}

impl SqliteAdapter {
    pub fn from_config(config: &dyn ConfigPort) -> Result<Self, ScannerError> {
        let db_path =
            config
                .get_string("sqlite", "path")
                .ok_or_else(|| ScannerError::ConfigMissing {
                    section: "sqlite".into(),
                    key: "path".into(),
                })?;

        let pool_size = config.get_int("sqlite", "pool_size", 4).max(1) as u32;

        let manager = SqliteConnectionManager::file(&db_path);
        let pool =
            Pool::builder()
                .max_size(pool_size)
                .build(manager)
                .map_err(|e: r2d2::Error| ScannerError::Database {
                    reason: e.to_string(),
                })?;

        tracing::debug!(path = %db_path, pool_size, "opened sqlite price store");
        Ok(Self { pool })
    }

    pub fn in_memory() -> Result<Self, ScannerError> {
        // Each in-memory connection is its own database; a single pooled
        // connection keeps every caller on the same one.
        let manager = SqliteConnectionManager::memory();
        let pool = Pool::builder()
            .max_size(1)
            .build(manager)
            .map_err(|e: r2d2::Error| ScannerError::Database {
                reason: e.to_string(),
            })?;

        Ok(Self { pool })
    }

    fn conn(&self) -> Result<PooledConnection<SqliteConnectionManager>, ScannerError> {
        self.pool.get().map_err(|e: r2d2::Error| ScannerError::Database {
            reason: e.to_string(),
        })
    }

    pub fn initialize_schema(&self) -> Result<(), ScannerError> {
        self.conn()?
            .execute_batch(
                "CREATE TABLE IF NOT EXISTS prices (
                    symbol TEXT NOT NULL,
                    date TEXT NOT NULL,
                    open REAL,
                    high REAL,
                    low REAL,
                    close REAL,
                    volume REAL,
                    PRIMARY KEY (symbol, date)
                );
                CREATE INDEX IF NOT EXISTS idx_prices_symbol ON prices(symbol);
                CREATE TABLE IF NOT EXISTS refresh_lock (
                    id INTEGER PRIMARY KEY CHECK (id = 1),
                    owner TEXT NOT NULL,
                    message TEXT NOT NULL,
                    started_at INTEGER NOT NULL
                );",
            )
            .map_err(query_error)
    }

    /// Upsert `bars` for `symbol` in one transaction; returns the row count written.
    pub fn insert_bars(&self, symbol: &str, bars: &[OhlcvBar]) -> Result<usize, ScannerError> {
        let mut conn = self.conn()?;
        let tx = conn.transaction().map_err(query_error)?;

        for bar in bars {
            tx.execute(
                "INSERT OR REPLACE INTO prices (symbol, date, open, high, low, close, volume)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    symbol,
                    bar.date.format(DATE_FORMAT).to_string(),
                    finite(bar.open),
                    finite(bar.high),
                    finite(bar.low),
                    finite(bar.close),
                    finite(bar.volume)
                ],
            )
            .map_err(query_error)?;
        }

        tx.commit().map_err(query_error)?;
        tracing::debug!(symbol, rows = bars.len(), "stored price bars");
        Ok(bars.len())
    }

    /// First date, last date and bar count for `symbol`, or `None` when it has no rows.
    pub fn data_range(&self, symbol: &str) -> Result<Option<(NaiveDate, NaiveDate, usize)>, ScannerError> {
        let conn = self.conn()?;
        let result: (Option<String>, Option<String>, i64) = conn
            .query_row(
                "SELECT MIN(date), MAX(date), COUNT(*) FROM prices WHERE symbol = ?1",
                params![symbol],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .map_err(query_error)?;

        match result {
            (Some(min), Some(max), count) if count > 0 => {
                Ok(Some((parse_date(&min)?, parse_date(&max)?, count as usize)))
            }
            _ => Ok(None),
        }
    }
}

impl PriceStore for SqliteAdapter {
    fn load_prices(&self, symbol: &str) -> Result<Vec<OhlcvBar>, ScannerError> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare(
                "SELECT date, open, high, low, close, volume
                 FROM prices
                 WHERE symbol = ?1
                 ORDER BY date ASC",
            )
            .map_err(query_error)?;

        let rows = stmt
            .query_map(params![symbol], |row| {
                let date_str: String = row.get(0)?;
                let date = NaiveDate::parse_from_str(&date_str, DATE_FORMAT).map_err(|e| {
                    rusqlite::Error::FromSqlConversionFailure(
                        0,
                        rusqlite::types::Type::Text,
                        Box::new(e),
                    )
                })?;
                let cell = |i: usize| -> rusqlite::Result<f64> {
                    Ok(row.get::<_, Option<f64>>(i)?.unwrap_or(f64::NAN))
                };
                Ok(OhlcvBar {
                    date,
                    open: cell(1)?,
                    high: cell(2)?,
                    low: cell(3)?,
                    close: cell(4)?,
                    volume: cell(5)?,
                })
            })
            .map_err(query_error)?;

        rows.collect::<Result<Vec<_>, _>>().map_err(query_error)
    }

    fn list_symbols(&self) -> Result<Vec<String>, ScannerError> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare("SELECT DISTINCT symbol FROM prices ORDER BY symbol")
            .map_err(query_error)?;

        let rows = stmt
            .query_map([], |row| row.get(0))
            .map_err(query_error)?;

        rows.collect::<Result<Vec<String>, _>>().map_err(query_error)
    }
}

impl RefreshLock for SqliteAdapter {
    fn try_acquire(&self, owner: &str, message: &str) -> Result<bool, ScannerError> {
        let conn = self.conn()?;
        let now = unix_now();

        let stale = conn
            .execute(
                "DELETE FROM refresh_lock WHERE started_at < ?1",
                params![now - STALE_LOCK_SECS],
            )
            .map_err(query_error)?;
        if stale > 0 {
            tracing::warn!("removed stale refresh lock");
        }

        let inserted = conn
            .execute(
                "INSERT OR IGNORE INTO refresh_lock (id, owner, message, started_at)
                 VALUES (1, ?1, ?2, ?3)",
                params![owner, message, now],
            )
            .map_err(query_error)?;
        Ok(inserted == 1)
    }

    fn update(&self, owner: &str, message: &str) -> Result<(), ScannerError> {
        self.conn()?
            .execute(
                "UPDATE refresh_lock SET message = ?2 WHERE owner = ?1",
                params![owner, message],
            )
            .map_err(query_error)?;
        Ok(())
    }

    fn release(&self, owner: &str) -> Result<(), ScannerError> {
        self.conn()?
            .execute("DELETE FROM refresh_lock WHERE owner = ?1", params![owner])
            .map_err(query_error)?;
        Ok(())
    }

    fn holder(&self) -> Result<Option<String>, ScannerError> {
        self.conn()?
            .query_row("SELECT message FROM refresh_lock WHERE id = 1", [], |row| row.get(0))
            .optional()
            .map_err(query_error)
    }
}

fn unix_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

fn finite(value: f64) -> Option<f64> {
    value.is_finite().then_some(value)
}

fn parse_date(value: &str) -> Result<NaiveDate, ScannerError> {
    NaiveDate::parse_from_str(value, DATE_FORMAT).map_err(|e| ScannerError::DatabaseQuery {
        reason: format!("bad date '{value}': {e}"),
    })
}

fn query_error(e: rusqlite::Error) -> ScannerError {
    ScannerError::DatabaseQuery {
        reason: e.to_string(),
    }
}
