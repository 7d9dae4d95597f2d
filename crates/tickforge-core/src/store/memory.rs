use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::RwLock;
use uuid::Uuid;

use super::{ensure_positive_price, MarketStore, ProbeFuture, StockFilter, StoreFuture, TickWindow};
use crate::{Price, Stock, StockSymbol, StoreError, Tick};

#[derive(Debug, Default)]
struct MemoryState {
    stocks: BTreeMap<StockSymbol, Stock>,
    ticks: Vec<Tick>,
}

/// Process-local store. Clones share the same state.
///
/// [`InMemoryStore::set_available`] simulates an outage: while unavailable the
/// health probe fails and every operation returns a transport error.
#[derive(Debug, Clone)]
pub struct InMemoryStore {
    state: Arc<RwLock<MemoryState>>,
    available: Arc<AtomicBool>,
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            state: Arc::new(RwLock::new(MemoryState::default())),
            available: Arc::new(AtomicBool::new(true)),
        }
    }

    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// Number of ticks held, regardless of availability.
    pub async fn tick_count(&self) -> usize {
        self.state.read().await.ticks.len()
    }

    fn check_available(&self) -> Result<(), StoreError> {
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(StoreError::transport("in-memory store marked unavailable"))
        }
    }
}

impl MarketStore for InMemoryStore {
    fn get_stock<'a>(&'a self, symbol: &'a StockSymbol) -> StoreFuture<'a, Option<Stock>> {
        Box::pin(async move {
            self.check_available()?;
            Ok(self.state.read().await.stocks.get(symbol).cloned())
        })
    }

    fn create_stock<'a>(&'a self, stock: Stock) -> StoreFuture<'a, Uuid> {
        Box::pin(async move {
            self.check_available()?;
            let mut state = self.state.write().await;
            if state.stocks.contains_key(&stock.symbol) {
                return Err(StoreError::Conflict {
                    symbol: stock.symbol.to_string(),
                });
            }
            let id = stock.id;
            state.stocks.insert(stock.symbol.clone(), stock);
            Ok(id)
        })
    }

    fn update_stock_price<'a>(
        &'a self,
        symbol: &'a StockSymbol,
        price: Price,
    ) -> StoreFuture<'a, ()> {
        Box::pin(async move {
            self.check_available()?;
            ensure_positive_price(&price)?;
            let mut state = self.state.write().await;
            let stock = state
                .stocks
                .get_mut(symbol)
                .ok_or_else(|| StoreError::NotFound {
                    symbol: symbol.to_string(),
                })?;
            stock.update_price(price.value())?;
            Ok(())
        })
    }

    fn list_stocks<'a>(&'a self, filter: StockFilter) -> StoreFuture<'a, Vec<Stock>> {
        Box::pin(async move {
            self.check_available()?;
            Ok(self
                .state
                .read()
                .await
                .stocks
                .values()
                .filter(|stock| filter.matches(stock))
                .cloned()
                .collect())
        })
    }

    fn append_tick<'a>(&'a self, tick: Tick) -> StoreFuture<'a, Uuid> {
        Box::pin(async move {
            self.check_available()?;
            let id = tick.id;
            self.state.write().await.ticks.push(tick);
            Ok(id)
        })
    }

    fn append_ticks<'a>(&'a self, ticks: Vec<Tick>) -> StoreFuture<'a, usize> {
        Box::pin(async move {
            self.check_available()?;
            let count = ticks.len();
            self.state.write().await.ticks.extend(ticks);
            Ok(count)
        })
    }

    fn recent_ticks<'a>(&'a self, limit: usize) -> StoreFuture<'a, Vec<Tick>> {
        Box::pin(async move {
            self.check_available()?;
            let state = self.state.read().await;
            Ok(newest_first(state.ticks.iter(), limit))
        })
    }

    fn latest_tick<'a>(&'a self, symbol: &'a StockSymbol) -> StoreFuture<'a, Option<Tick>> {
        Box::pin(async move {
            self.check_available()?;
            let state = self.state.read().await;
            let matching = state.ticks.iter().filter(|tick| &tick.symbol == symbol);
            Ok(newest_first(matching, 1).into_iter().next())
        })
    }

    fn symbol_ticks<'a>(
        &'a self,
        symbol: &'a StockSymbol,
        window: TickWindow,
    ) -> StoreFuture<'a, Vec<Tick>> {
        Box::pin(async move {
            self.check_available()?;
            let state = self.state.read().await;
            let matching = state
                .ticks
                .iter()
                .filter(|tick| &tick.symbol == symbol && window.contains(tick.timestamp));
            Ok(newest_first(matching, usize::MAX))
        })
    }

    fn health<'a>(&'a self) -> ProbeFuture<'a> {
        Box::pin(async move { self.available.load(Ordering::SeqCst) })
    }
}

/// Newest first; among equal timestamps the later append wins.
fn newest_first<'t>(ticks: impl Iterator<Item = &'t Tick>, limit: usize) -> Vec<Tick> {
    let mut ordered: Vec<&Tick> = ticks.collect();
    ordered.reverse();
    ordered.sort_by(|left, right| right.timestamp.cmp(&left.timestamp));
    ordered.into_iter().take(limit).cloned().collect()
}
