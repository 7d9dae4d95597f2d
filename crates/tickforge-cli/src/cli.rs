//! CLI argument definitions for tickforge.
//!
//! # Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `simulate` | Run the tick simulation worker |
//! | `stats` | Market statistics snapshot |
//! | `stocks` | List stocks |
//! | `latest` | Most recent tick for a symbol |
//! | `history` | Ticks for a symbol inside a time window |
//! | `activity` | Per-symbol tick aggregates from the warehouse |
//!
//! # Global Options
//!
//! | Option | Default | Description |
//! |--------|---------|-------------|
//! | `--pretty` | `false` | Pretty-print JSON output |
//! | `--store` | `warehouse` | Backend: warehouse, http or memory |
//! | `--config` | none | JSON settings file |
//! | `--db` | `$TICKFORGE_HOME/warehouse.duckdb` | Warehouse database path |
//!
//! # Examples
//!
//! ```bash
//! # Ten cycles against the local warehouse, reproducible
//! tickforge simulate --initial-delay 0 --interval 1 --cycles 10 --seed 42
//!
//! # Feed a running market API
//! tickforge --store http simulate
//!
//! # Snapshot over the last 500 ticks
//! tickforge stats --sample 500 --pretty
//! ```

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

/// Stock tick simulator with statistics aggregation.
#[derive(Debug, Parser)]
#[command(
    name = "tickforge",
    author,
    version,
    about = "Stock tick simulator with statistics aggregation",
    long_about = "tickforge generates bounded random-walk price ticks for a catalog of stocks, \
delivers them to a store (embedded DuckDB warehouse, remote market API, or memory) and \
reports market-wide statistics over what was stored.\n\
\n\
Logs go to stderr; RUST_LOG, LOG_LEVEL and LOG_FORMAT control them."
)]
pub struct Cli {
    /// Pretty-print JSON output with indentation.
    #[arg(long, global = true, default_value_t = false)]
    pub pretty: bool,

    /// Backend the command reads from and writes to.
    #[arg(long, global = true, value_enum, default_value_t = StoreKind::Warehouse)]
    pub store: StoreKind,

    /// JSON settings file applied over the built-in defaults.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Warehouse database file. Defaults to `warehouse.duckdb` under TICKFORGE_HOME.
    #[arg(long, global = true)]
    pub db: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Store backends selectable from the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StoreKind {
    /// Embedded DuckDB warehouse.
    Warehouse,
    /// Remote market API at the configured base URL.
    Http,
    /// Process memory; discarded on exit.
    Memory,
}

/// Available CLI commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the simulation worker until Ctrl-C or the cycle bound.
    ///
    /// # Examples
    ///
    ///   tickforge simulate
    ///   tickforge simulate --interval 1 --cycles 5 --seed 7
    ///   tickforge --store http simulate --per-item
    Simulate(SimulateArgs),

    /// Print a market statistics snapshot.
    Stats(StatsArgs),

    /// List stocks.
    Stocks(StocksArgs),

    /// Print the most recent tick for a symbol.
    Latest(SymbolArgs),

    /// Print ticks for a symbol inside a time window, newest first.
    History(HistoryArgs),

    /// Print per-symbol tick aggregates from the warehouse.
    Activity,
}

/// Arguments for the `simulate` command. Unset flags keep the configured value.
#[derive(Debug, Args, Default)]
pub struct SimulateArgs {
    /// Seconds between cycles.
    #[arg(long)]
    pub interval: Option<u64>,

    /// Seconds to wait before the first health probe.
    #[arg(long)]
    pub initial_delay: Option<u64>,

    /// Lower bound of the per-tick price change, in percent.
    #[arg(long, allow_hyphen_values = true)]
    pub min_change: Option<f64>,

    /// Upper bound of the per-tick price change, in percent.
    #[arg(long, allow_hyphen_values = true)]
    pub max_change: Option<f64>,

    /// Lower bound of the simulated volume.
    #[arg(long)]
    pub min_volume: Option<u64>,

    /// Upper bound of the simulated volume (inclusive).
    #[arg(long)]
    pub max_volume: Option<u64>,

    /// Deliver ticks one by one instead of in batches.
    #[arg(long, default_value_t = false)]
    pub per_item: bool,

    /// Seed for reproducible price walks.
    #[arg(long)]
    pub seed: Option<u64>,

    /// Stop after this many cycles.
    #[arg(long)]
    pub cycles: Option<u64>,
}

/// Arguments for the `stats` command.
#[derive(Debug, Args)]
pub struct StatsArgs {
    /// Number of most recent ticks to aggregate.
    #[arg(long, default_value_t = tickforge_core::DEFAULT_TICK_SAMPLE)]
    pub sample: usize,
}

/// Arguments for the `stocks` command.
#[derive(Debug, Args)]
pub struct StocksArgs {
    /// Only list active stocks.
    #[arg(long, default_value_t = false)]
    pub active: bool,
}

/// A single symbol argument.
#[derive(Debug, Args)]
pub struct SymbolArgs {
    /// Market symbol (e.g., AAPL).
    pub symbol: String,
}

/// Arguments for the `history` command.
#[derive(Debug, Args)]
pub struct HistoryArgs {
    /// Market symbol (e.g., AAPL).
    pub symbol: String,

    /// Inclusive RFC3339 UTC lower bound.
    #[arg(long)]
    pub from: Option<String>,

    /// Inclusive RFC3339 UTC upper bound.
    #[arg(long)]
    pub to: Option<String>,
}
