//! # Tickforge Warehouse
//!
//! DuckDB-based storage for simulated stocks and their tick history.
//!
//! ## Overview
//!
//! The warehouse persists two record kinds:
//!
//! - **Stocks**: one row per symbol with the current price and lifecycle flags
//! - **Ticks**: append-only price observations, stored with an epoch-microsecond
//!   timestamp
//!
//! Every write uses parameterized statements inside a transaction. Decimal values
//! cross the boundary as text and are cast by DuckDB, so no precision is lost to
//! floating point.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use tickforge_warehouse::{Warehouse, WarehouseConfig};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let warehouse = Warehouse::open(WarehouseConfig::default())?;
//!     let recent = warehouse.recent_ticks(100)?;
//!     println!("{} recent ticks", recent.len());
//!     Ok(())
//! }
//! ```
//!
//! ## Tables
//!
//! | Table | Description |
//! |-------|-------------|
//! | `stocks` | Stock metadata and current price, keyed by symbol |
//! | `ticks` | Tick history |
//! | `schema_migrations` | Applied migration versions |
//!
//! ## Views
//!
//! | View | Description |
//! |------|-------------|
//! | `vw_ticks` | Ticks with timestamps and derived change columns |
//! | `vw_latest_ticks` | Most recent tick per symbol |
//! | `vw_symbol_activity` | Per-symbol tick count, volume and range |

pub mod duckdb;
pub mod migrations;
pub mod views;

use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use ::duckdb::types::Type;
use ::duckdb::{Connection, Row, ToSql};
use rust_decimal::Decimal;
use serde::Serialize;
use thiserror::Error;

pub use duckdb::{DuckDbConnectionManager, PooledConnection};

/// Errors that can occur during warehouse operations.
#[derive(Debug, Error)]
pub enum WarehouseError {
    /// `DuckDB` database error.
    #[error(transparent)]
    DuckDb(#[from] ::duckdb::Error),

    /// I/O error (file system operations).
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// A write was rejected before reaching the database.
    #[error("write rejected: {0}")]
    Rejected(String),
}

/// Configuration for the warehouse database.
#[derive(Debug, Clone)]
pub struct WarehouseConfig {
    /// Root directory for tickforge data.
    pub tickforge_home: PathBuf,
    /// Path to the `DuckDB` database file.
    pub db_path: PathBuf,
    /// Maximum number of idle connections kept in the pool.
    pub max_pool_size: usize,
}

impl Default for WarehouseConfig {
    fn default() -> Self {
        Self::at_home(resolve_tickforge_home())
    }
}

impl WarehouseConfig {
    /// Configuration rooted at `tickforge_home` with the default database file name.
    pub fn at_home(tickforge_home: impl Into<PathBuf>) -> Self {
        let tickforge_home = tickforge_home.into();
        let db_path = tickforge_home.join("warehouse.duckdb");
        Self {
            tickforge_home,
            db_path,
            max_pool_size: 4,
        }
    }
}

/// A stored stock row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StockRecord {
    pub id: String,
    pub symbol: String,
    pub name: String,
    pub exchange: String,
    pub sector: String,
    pub industry: String,
    pub price: Decimal,
    pub currency: String,
    pub market_cap: Decimal,
    pub is_active: bool,
    /// Creation instant in microseconds since the Unix epoch.
    pub created_us: i64,
    /// Last mutation instant in microseconds since the Unix epoch.
    pub updated_us: Option<i64>,
}

/// A stored tick row. Change columns are derived, not stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TickRecord {
    pub id: String,
    pub symbol: String,
    pub price: Decimal,
    pub volume: i64,
    pub high: Decimal,
    pub low: Decimal,
    pub open: Decimal,
    pub previous_close: Decimal,
    pub currency: String,
    /// Observation instant in microseconds since the Unix epoch.
    pub ts_us: i64,
}

/// Per-symbol aggregates read from `vw_symbol_activity`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SymbolActivity {
    pub symbol: String,
    pub tick_count: i64,
    pub total_volume: i64,
    pub session_low: Decimal,
    pub session_high: Decimal,
}

const STOCK_COLUMNS: &str = "id, symbol, name, exchange, sector, industry, \
     CAST(price AS VARCHAR), currency, CAST(market_cap AS VARCHAR), is_active, \
     created_us, updated_us";

const TICK_COLUMNS: &str = "id, symbol, CAST(price AS VARCHAR), volume, \
     CAST(high AS VARCHAR), CAST(low AS VARCHAR), CAST(open AS VARCHAR), \
     CAST(previous_close AS VARCHAR), currency, ts_us";

/// The main warehouse interface for stock and tick storage.
#[derive(Clone)]
pub struct Warehouse {
    config: WarehouseConfig,
    manager: DuckDbConnectionManager,
}

impl Warehouse {
    /// Open a warehouse with default configuration.
    pub fn open_default() -> Result<Self, WarehouseError> {
        Self::open(WarehouseConfig::default())
    }

    /// Open a warehouse with the specified configuration.
    pub fn open(config: WarehouseConfig) -> Result<Self, WarehouseError> {
        if let Some(parent) = config.db_path.parent() {
            fs::create_dir_all(parent)?;
        }

        let manager = DuckDbConnectionManager::open(config.db_path.clone(), config.max_pool_size)?;
        let warehouse = Self { config, manager };
        warehouse.initialize()?;
        Ok(warehouse)
    }

    /// Initialize database schema and views.
    pub fn initialize(&self) -> Result<(), WarehouseError> {
        let connection = self.manager.acquire()?;
        migrations::apply_migrations(&connection)?;
        views::create_views(&connection)?;
        Ok(())
    }

    /// Get the path to the database file.
    pub fn db_path(&self) -> &Path {
        self.manager.db_path()
    }

    pub fn config(&self) -> &WarehouseConfig {
        &self.config
    }

    /// Cheap liveness probe.
    pub fn ping(&self) -> Result<(), WarehouseError> {
        let connection = self.manager.acquire()?;
        let _: i32 = connection.query_row("SELECT 1", [], |row| row.get(0))?;
        Ok(())
    }

    /// Insert a stock unless its symbol is already present.
    ///
    /// Returns `false` when a stock with the same symbol exists.
    pub fn insert_stock(&self, stock: &StockRecord) -> Result<bool, WarehouseError> {
        let connection = self.manager.acquire()?;
        connection.execute_batch("BEGIN TRANSACTION")?;
        let result = (|| -> Result<bool, WarehouseError> {
            let existing: i64 = connection.query_row(
                "SELECT COUNT(*) FROM stocks WHERE symbol = ?",
                [&stock.symbol],
                |row| row.get(0),
            )?;
            if existing > 0 {
                return Ok(false);
            }

            let price = stock.price.to_string();
            let market_cap = stock.market_cap.to_string();
            let params: [&dyn ToSql; 12] = [
                &stock.symbol,
                &stock.id,
                &stock.name,
                &stock.exchange,
                &stock.sector,
                &stock.industry,
                &price,
                &stock.currency,
                &market_cap,
                &stock.is_active,
                &stock.created_us,
                &stock.updated_us,
            ];
            connection.execute(
                "INSERT INTO stocks \
                 (symbol, id, name, exchange, sector, industry, price, currency, market_cap, \
                  is_active, created_us, updated_us) \
                 VALUES (?, ?, ?, ?, ?, ?, CAST(? AS DECIMAL(18,4)), ?, \
                  CAST(? AS DECIMAL(24,4)), ?, ?, ?)",
                params.as_slice(),
            )?;
            Ok(true)
        })();

        finalize_transaction(&connection, result)
    }

    /// Look up a stock by its normalized symbol.
    pub fn get_stock(&self, symbol: &str) -> Result<Option<StockRecord>, WarehouseError> {
        let connection = self.manager.acquire()?;
        let sql = format!("SELECT {STOCK_COLUMNS} FROM stocks WHERE symbol = ?");
        let mut statement = connection.prepare(&sql)?;
        let mut rows = statement.query_map([symbol], read_stock)?;
        Ok(rows.next().transpose()?)
    }

    /// List stocks ordered by symbol.
    pub fn list_stocks(&self, active_only: bool) -> Result<Vec<StockRecord>, WarehouseError> {
        let connection = self.manager.acquire()?;
        let filter = if active_only {
            " WHERE is_active"
        } else {
            ""
        };
        let sql = format!("SELECT {STOCK_COLUMNS} FROM stocks{filter} ORDER BY symbol");
        let mut statement = connection.prepare(&sql)?;
        let rows = statement.query_map([], read_stock)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    /// Set the current price of a stock.
    ///
    /// Returns `false` when no stock has the given symbol.
    pub fn update_stock_price(
        &self,
        symbol: &str,
        price: Decimal,
        updated_us: i64,
    ) -> Result<bool, WarehouseError> {
        let connection = self.manager.acquire()?;
        let price = price.to_string();
        let params: [&dyn ToSql; 3] = [&price, &updated_us, &symbol];
        let changed = connection.execute(
            "UPDATE stocks SET price = CAST(? AS DECIMAL(18,4)), updated_us = ? WHERE symbol = ?",
            params.as_slice(),
        )?;
        Ok(changed > 0)
    }

    /// Append ticks in a single transaction. Either every row lands or none do.
    pub fn append_ticks(&self, ticks: &[TickRecord]) -> Result<usize, WarehouseError> {
        if ticks.is_empty() {
            return Ok(0);
        }

        let connection = self.manager.acquire()?;
        connection.execute_batch("BEGIN TRANSACTION")?;
        let result = (|| -> Result<usize, WarehouseError> {
            let mut statement = connection.prepare(
                "INSERT INTO ticks \
                 (id, symbol, price, volume, high, low, open, previous_close, currency, ts_us) \
                 VALUES (?, ?, CAST(? AS DECIMAL(18,4)), ?, CAST(? AS DECIMAL(18,4)), \
                  CAST(? AS DECIMAL(18,4)), CAST(? AS DECIMAL(18,4)), \
                  CAST(? AS DECIMAL(18,4)), ?, ?)",
            )?;
            for tick in ticks {
                if tick.volume < 0 {
                    return Err(WarehouseError::Rejected(format!(
                        "tick {} has negative volume",
                        tick.id
                    )));
                }
                let price = tick.price.to_string();
                let high = tick.high.to_string();
                let low = tick.low.to_string();
                let open = tick.open.to_string();
                let previous_close = tick.previous_close.to_string();
                let params: [&dyn ToSql; 10] = [
                    &tick.id,
                    &tick.symbol,
                    &price,
                    &tick.volume,
                    &high,
                    &low,
                    &open,
                    &previous_close,
                    &tick.currency,
                    &tick.ts_us,
                ];
                statement.execute(params.as_slice())?;
            }
            Ok(ticks.len())
        })();

        finalize_transaction(&connection, result)
    }

    /// Most recent ticks across all symbols, newest first.
    pub fn recent_ticks(&self, limit: usize) -> Result<Vec<TickRecord>, WarehouseError> {
        let connection = self.manager.acquire()?;
        let sql = format!("SELECT {TICK_COLUMNS} FROM ticks ORDER BY ts_us DESC LIMIT {limit}");
        let mut statement = connection.prepare(&sql)?;
        let rows = statement.query_map([], read_tick)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    /// The latest tick recorded for a symbol.
    pub fn latest_tick(&self, symbol: &str) -> Result<Option<TickRecord>, WarehouseError> {
        let connection = self.manager.acquire()?;
        let sql = format!(
            "SELECT {TICK_COLUMNS} FROM ticks WHERE id = \
             (SELECT id FROM vw_latest_ticks WHERE symbol = ?)"
        );
        let mut statement = connection.prepare(&sql)?;
        let mut rows = statement.query_map([symbol], read_tick)?;
        Ok(rows.next().transpose()?)
    }

    /// Ticks for one symbol inside an optional `[from_us, to_us]` window, newest first.
    pub fn symbol_ticks(
        &self,
        symbol: &str,
        from_us: Option<i64>,
        to_us: Option<i64>,
    ) -> Result<Vec<TickRecord>, WarehouseError> {
        let connection = self.manager.acquire()?;
        let mut sql = format!("SELECT {TICK_COLUMNS} FROM ticks WHERE symbol = ?");
        let mut params: Vec<&dyn ToSql> = Vec::with_capacity(3);
        params.push(&symbol);
        if let Some(from_us) = from_us.as_ref() {
            sql.push_str(" AND ts_us >= ?");
            params.push(from_us);
        }
        if let Some(to_us) = to_us.as_ref() {
            sql.push_str(" AND ts_us <= ?");
            params.push(to_us);
        }
        sql.push_str(" ORDER BY ts_us DESC");

        let mut statement = connection.prepare(&sql)?;
        let rows = statement.query_map(params.as_slice(), read_tick)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    /// Per-symbol activity aggregates ordered by symbol.
    pub fn symbol_activity(&self) -> Result<Vec<SymbolActivity>, WarehouseError> {
        let connection = self.manager.acquire()?;
        let mut statement = connection.prepare(
            "SELECT symbol, tick_count, CAST(total_volume AS BIGINT), \
             CAST(session_low AS VARCHAR), CAST(session_high AS VARCHAR) \
             FROM vw_symbol_activity ORDER BY symbol",
        )?;
        let rows = statement.query_map([], |row| {
            Ok(SymbolActivity {
                symbol: row.get(0)?,
                tick_count: row.get(1)?,
                total_volume: row.get(2)?,
                session_low: decimal_column(row, 3)?,
                session_high: decimal_column(row, 4)?,
            })
        })?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }
}

/// Finalize a transaction, committing on success or rolling back on failure.
fn finalize_transaction<T>(
    connection: &Connection,
    result: Result<T, WarehouseError>,
) -> Result<T, WarehouseError> {
    match result {
        Ok(value) => {
            connection.execute_batch("COMMIT")?;
            Ok(value)
        }
        Err(error) => {
            let _ = connection.execute_batch("ROLLBACK");
            Err(error)
        }
    }
}

fn read_stock(row: &Row<'_>) -> Result<StockRecord, ::duckdb::Error> {
    Ok(StockRecord {
        id: row.get(0)?,
        symbol: row.get(1)?,
        name: row.get(2)?,
        exchange: row.get(3)?,
        sector: row.get(4)?,
        industry: row.get(5)?,
        price: decimal_column(row, 6)?,
        currency: row.get(7)?,
        market_cap: decimal_column(row, 8)?,
        is_active: row.get(9)?,
        created_us: row.get(10)?,
        updated_us: row.get(11)?,
    })
}

fn read_tick(row: &Row<'_>) -> Result<TickRecord, ::duckdb::Error> {
    Ok(TickRecord {
        id: row.get(0)?,
        symbol: row.get(1)?,
        price: decimal_column(row, 2)?,
        volume: row.get(3)?,
        high: decimal_column(row, 4)?,
        low: decimal_column(row, 5)?,
        open: decimal_column(row, 6)?,
        previous_close: decimal_column(row, 7)?,
        currency: row.get(8)?,
        ts_us: row.get(9)?,
    })
}

/// Read a decimal that was cast to text in the projection.
fn decimal_column(row: &Row<'_>, index: usize) -> Result<Decimal, ::duckdb::Error> {
    let text: String = row.get(index)?;
    Decimal::from_str(text.trim())
        .map(|value| value.normalize())
        .map_err(|error| ::duckdb::Error::FromSqlConversionFailure(index, Type::Text, Box::new(error)))
}

/// Resolve the tickforge home directory from environment or default.
pub fn resolve_tickforge_home() -> PathBuf {
    if let Some(path) = env::var_os("TICKFORGE_HOME") {
        let path = PathBuf::from(path);
        if !path.as_os_str().is_empty() {
            return path;
        }
    }

    if let Some(home) = env::var_os("HOME") {
        return PathBuf::from(home).join(".tickforge");
    }

    PathBuf::from(".tickforge")
}
