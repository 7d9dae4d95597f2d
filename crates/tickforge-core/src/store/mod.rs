//! Persistence boundary for stocks and ticks.
//!
//! | Implementation | Backing |
//! |----------------|---------|
//! | [`InMemoryStore`] | process memory, for tests and dry runs |
//! | [`WarehouseStore`] | embedded DuckDB warehouse |
//! | [`HttpMarketStore`] | remote market API over HTTP |
//! | [`ValidatedStore`] | validation middleware around any of the above |

mod http;
mod memory;
mod validated;
mod warehouse;

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use uuid::Uuid;

use crate::{Price, Stock, StockSymbol, StoreError, Tick, UtcDateTime};

pub use http::{HttpMarketStore, DEFAULT_BASE_URL, DEFAULT_TIMEOUT_MS};
pub use memory::InMemoryStore;
pub use validated::{
    validate_batch_item, validate_new_stock, validate_tick, ValidatedStore, MAX_BATCH_SIZE,
};
pub use warehouse::WarehouseStore;

/// Boxed future returned by every [`MarketStore`] operation.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, StoreError>> + Send + 'a>>;

/// Boxed future returned by [`MarketStore::health`].
pub type ProbeFuture<'a> = Pin<Box<dyn Future<Output = bool> + Send + 'a>>;

/// Which stocks [`MarketStore::list_stocks`] returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StockFilter {
    pub active_only: bool,
}

impl StockFilter {
    pub const fn all() -> Self {
        Self { active_only: false }
    }

    pub const fn active() -> Self {
        Self { active_only: true }
    }

    pub fn matches(self, stock: &Stock) -> bool {
        !self.active_only || stock.is_active
    }
}

/// Inclusive time bounds for [`MarketStore::symbol_ticks`]. Open on missing sides.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TickWindow {
    pub from: Option<UtcDateTime>,
    pub to: Option<UtcDateTime>,
}

impl TickWindow {
    pub fn contains(self, at: UtcDateTime) -> bool {
        self.from.map_or(true, |from| at >= from) && self.to.map_or(true, |to| at <= to)
    }
}

/// Store contract consumed by ingestion, simulation and statistics.
pub trait MarketStore: Send + Sync {
    fn get_stock<'a>(&'a self, symbol: &'a StockSymbol) -> StoreFuture<'a, Option<Stock>>;

    /// Fails with [`StoreError::Conflict`] when the symbol already exists.
    fn create_stock<'a>(&'a self, stock: Stock) -> StoreFuture<'a, Uuid>;

    /// Fails with [`StoreError::NotFound`] for unknown symbols.
    fn update_stock_price<'a>(
        &'a self,
        symbol: &'a StockSymbol,
        price: Price,
    ) -> StoreFuture<'a, ()>;

    fn list_stocks<'a>(&'a self, filter: StockFilter) -> StoreFuture<'a, Vec<Stock>>;

    fn append_tick<'a>(&'a self, tick: Tick) -> StoreFuture<'a, Uuid>;

    /// All-or-nothing append; returns the number of ticks written.
    fn append_ticks<'a>(&'a self, ticks: Vec<Tick>) -> StoreFuture<'a, usize>;

    /// The `limit` most recent ticks across all symbols, newest first.
    fn recent_ticks<'a>(&'a self, limit: usize) -> StoreFuture<'a, Vec<Tick>>;

    fn latest_tick<'a>(&'a self, symbol: &'a StockSymbol) -> StoreFuture<'a, Option<Tick>>;

    /// Ticks for one symbol inside `window`, newest first.
    fn symbol_ticks<'a>(
        &'a self,
        symbol: &'a StockSymbol,
        window: TickWindow,
    ) -> StoreFuture<'a, Vec<Tick>>;

    fn health<'a>(&'a self) -> ProbeFuture<'a>;
}

impl<S: MarketStore + ?Sized> MarketStore for Arc<S> {
    fn get_stock<'a>(&'a self, symbol: &'a StockSymbol) -> StoreFuture<'a, Option<Stock>> {
        (**self).get_stock(symbol)
    }

    fn create_stock<'a>(&'a self, stock: Stock) -> StoreFuture<'a, Uuid> {
        (**self).create_stock(stock)
    }

    fn update_stock_price<'a>(
        &'a self,
        symbol: &'a StockSymbol,
        price: Price,
    ) -> StoreFuture<'a, ()> {
        (**self).update_stock_price(symbol, price)
    }

    fn list_stocks<'a>(&'a self, filter: StockFilter) -> StoreFuture<'a, Vec<Stock>> {
        (**self).list_stocks(filter)
    }

    fn append_tick<'a>(&'a self, tick: Tick) -> StoreFuture<'a, Uuid> {
        (**self).append_tick(tick)
    }

    fn append_ticks<'a>(&'a self, ticks: Vec<Tick>) -> StoreFuture<'a, usize> {
        (**self).append_ticks(ticks)
    }

    fn recent_ticks<'a>(&'a self, limit: usize) -> StoreFuture<'a, Vec<Tick>> {
        (**self).recent_ticks(limit)
    }

    fn latest_tick<'a>(&'a self, symbol: &'a StockSymbol) -> StoreFuture<'a, Option<Tick>> {
        (**self).latest_tick(symbol)
    }

    fn symbol_ticks<'a>(
        &'a self,
        symbol: &'a StockSymbol,
        window: TickWindow,
    ) -> StoreFuture<'a, Vec<Tick>> {
        (**self).symbol_ticks(symbol, window)
    }

    fn health<'a>(&'a self) -> ProbeFuture<'a> {
        (**self).health()
    }
}

/// Rejects zero or negative prices before they reach a backend.
pub(crate) fn ensure_positive_price(price: &Price) -> Result<(), StoreError> {
    if price.value() <= rust_decimal::Decimal::ZERO {
        return Err(crate::ValidationError::NonPositiveValue { field: "price" }.into());
    }
    Ok(())
}
