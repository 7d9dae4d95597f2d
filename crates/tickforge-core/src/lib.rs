//! # Tickforge Core
//!
//! Simulated market ticks, their ingestion into a store, and market-wide
//! statistics over what was ingested.
//!
//! ## Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`domain`] | Validated value types: symbols, prices, stocks, ticks |
//! | [`price_walk`] | Bounded random walk producing the next tick's values |
//! | [`store`] | `MarketStore` contract and its memory, DuckDB and HTTP backends |
//! | [`ingestion`] | Batch or per-item delivery with price propagation |
//! | [`simulation`] | Long-running worker state machine |
//! | [`statistics`] | Aggregation of stocks and recent ticks |
//! | [`settings`] | Layered configuration |
//! | [`http_client`] | HTTP transport abstraction |
//! | [`retry`] | Backoff schedules for readiness probing |
//! | [`error`] | Error types |
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────┐     ┌──────────────┐
//! │ SimulationWorker │────▶│  PriceWalk   │
//! └────────┬─────────┘     └──────────────┘
//!          │
//!          ▼
//! ┌──────────────────┐     ┌──────────────────────────────┐
//! │ IngestionChannel │────▶│ MarketStore                  │
//! └──────────────────┘     │ (memory / warehouse / http)  │
//!                          └──────────────┬───────────────┘
//!                                         │
//!                                         ▼
//!                          ┌──────────────────────────────┐
//!                          │ collect_statistics           │
//!                          └──────────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust
//! use rust_decimal::Decimal;
//! use tickforge_core::{PriceWalk, PriceWalkConfig, ScriptedSource};
//!
//! let walk = PriceWalk::new(PriceWalkConfig::default()).unwrap();
//! let mut draws = ScriptedSource::new(vec![0.01, 0.005, 0.005], vec![500_000]);
//! let next = walk.next_tick(Decimal::new(17_550, 2), &mut draws).unwrap();
//! assert_eq!(next.price, Decimal::new(17_726, 2));
//! ```

pub mod domain;
pub mod error;
pub mod http_client;
pub mod ingestion;
pub mod price_walk;
pub mod retry;
pub mod settings;
pub mod simulation;
pub mod statistics;
pub mod store;

// Domain models
pub use domain::{
    derive_change, round_to_cents, validate_currency_code, Price, Stock, StockSymbol, Tick,
    UtcDateTime, Volume, DEFAULT_CURRENCY, MAX_SYMBOL_LEN,
};

// Error types
pub use error::{IngestionError, SettingsError, SimulationError, StoreError, ValidationError};

// HTTP client types
pub use http_client::{
    HttpClient, HttpError, HttpFuture, HttpMethod, HttpRequest, HttpResponse, ReqwestHttpClient,
};

// Ingestion
pub use ingestion::{DeliveryMode, DeliveryReport, IngestionChannel};

// Price walk
pub use price_walk::{
    PriceWalk, PriceWalkConfig, RandomSource, RangePolicy, RawTickValues, RngSource,
    ScriptedSource,
};

// Retry logic
pub use retry::{Backoff, ProbePolicy};

// Settings
pub use settings::{ApiSettings, Settings, SimulationSettings};

// Simulation
pub use simulation::{
    CycleReport, PriceTracker, SeedStock, Shutdown, SimulationWorker, WorkerReport, WorkerState,
    SEED_STOCKS,
};

// Statistics
pub use statistics::{aggregate, aggregate_at, collect_statistics, MarketStatistics, DEFAULT_TICK_SAMPLE};

// Stores
pub use store::{
    HttpMarketStore, InMemoryStore, MarketStore, StockFilter, TickWindow, ValidatedStore,
    WarehouseStore, MAX_BATCH_SIZE,
};

// Warehouse (re-exported from tickforge-warehouse)
pub use tickforge_warehouse::{SymbolActivity, Warehouse, WarehouseConfig, WarehouseError};
