use rust_decimal::Decimal;
use uuid::Uuid;

use super::{ensure_positive_price, MarketStore, ProbeFuture, StockFilter, StoreFuture, TickWindow};
use crate::{Price, Stock, StockSymbol, StoreError, Tick, ValidationError, MAX_SYMBOL_LEN};

/// Largest tick batch accepted by a single `append_ticks` call.
pub const MAX_BATCH_SIZE: usize = 1_000;

const MAX_NAME_LEN: usize = 200;
const MAX_EXCHANGE_LEN: usize = 50;
const MAX_SECTOR_LEN: usize = 100;
const MAX_INDUSTRY_LEN: usize = 100;

/// Validation middleware in front of another [`MarketStore`].
///
/// Single writes are rejected with [`StoreError::Validation`]. Batches must be
/// non-empty and at most [`MAX_BATCH_SIZE`] long; individual invalid ticks are
/// dropped with a warning and the rest are forwarded, so the returned count
/// may be lower than the batch length.
#[derive(Debug, Clone)]
pub struct ValidatedStore<S> {
    inner: S,
}

impl<S: MarketStore> ValidatedStore<S> {
    pub fn new(inner: S) -> Self {
        Self { inner }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    pub fn into_inner(self) -> S {
        self.inner
    }
}

/// Write-side rules for one tick sent on its own.
pub fn validate_tick(tick: &Tick) -> Result<(), ValidationError> {
    validate_batch_item(tick)?;
    positive("open", tick.open.value())?;
    positive("previous_close", tick.previous_close.value())
}

/// Rules for a tick inside a batch: symbol, price, volume and range only.
/// A zero open or previous close is accepted here.
pub fn validate_batch_item(tick: &Tick) -> Result<(), ValidationError> {
    if tick.symbol.as_str().len() > MAX_SYMBOL_LEN {
        return Err(ValidationError::SymbolTooLong {
            len: tick.symbol.as_str().len(),
            max: MAX_SYMBOL_LEN,
        });
    }
    positive("price", tick.price.value())?;
    if tick.volume.value() == 0 {
        return Err(ValidationError::NonPositiveValue { field: "volume" });
    }
    if tick.high.value() < tick.low.value() {
        return Err(ValidationError::InvalidTickRange);
    }
    Ok(())
}

/// Field limits and price rule for a new stock.
pub fn validate_new_stock(stock: &Stock) -> Result<(), ValidationError> {
    bounded("name", &stock.name, MAX_NAME_LEN)?;
    bounded("exchange", &stock.exchange, MAX_EXCHANGE_LEN)?;
    bounded("sector", &stock.sector, MAX_SECTOR_LEN)?;
    bounded("industry", &stock.industry, MAX_INDUSTRY_LEN)?;
    positive("price", stock.current_price.value())
}

fn positive(field: &'static str, value: Decimal) -> Result<(), ValidationError> {
    if value <= Decimal::ZERO {
        return Err(ValidationError::NonPositiveValue { field });
    }
    Ok(())
}

fn bounded(field: &'static str, value: &str, max: usize) -> Result<(), ValidationError> {
    let len = value.chars().count();
    if len == 0 {
        return Err(ValidationError::EmptyField { field });
    }
    if len > max {
        return Err(ValidationError::FieldTooLong { field, len, max });
    }
    Ok(())
}

impl<S: MarketStore> MarketStore for ValidatedStore<S> {
    fn get_stock<'a>(&'a self, symbol: &'a StockSymbol) -> StoreFuture<'a, Option<Stock>> {
        self.inner.get_stock(symbol)
    }

    fn create_stock<'a>(&'a self, stock: Stock) -> StoreFuture<'a, Uuid> {
        Box::pin(async move {
            validate_new_stock(&stock)?;
            self.inner.create_stock(stock).await
        })
    }

    fn update_stock_price<'a>(
        &'a self,
        symbol: &'a StockSymbol,
        price: Price,
    ) -> StoreFuture<'a, ()> {
        Box::pin(async move {
            ensure_positive_price(&price)?;
            self.inner.update_stock_price(symbol, price).await
        })
    }

    fn list_stocks<'a>(&'a self, filter: StockFilter) -> StoreFuture<'a, Vec<Stock>> {
        self.inner.list_stocks(filter)
    }

    fn append_tick<'a>(&'a self, tick: Tick) -> StoreFuture<'a, Uuid> {
        Box::pin(async move {
            validate_tick(&tick)?;
            self.inner.append_tick(tick).await
        })
    }

    fn append_ticks<'a>(&'a self, ticks: Vec<Tick>) -> StoreFuture<'a, usize> {
        Box::pin(async move {
            if ticks.is_empty() {
                return Err(ValidationError::EmptyBatch.into());
            }
            if ticks.len() > MAX_BATCH_SIZE {
                return Err(ValidationError::BatchTooLarge {
                    len: ticks.len(),
                    max: MAX_BATCH_SIZE,
                }
                .into());
            }

            let mut accepted = Vec::with_capacity(ticks.len());
            for tick in ticks {
                match validate_batch_item(&tick) {
                    Ok(()) => accepted.push(tick),
                    Err(error) => {
                        tracing::warn!(symbol = %tick.symbol, %error, "dropping invalid tick from batch");
                    }
                }
            }
            if accepted.is_empty() {
                return Ok(0);
            }
            self.inner.append_ticks(accepted).await
        })
    }

    fn recent_ticks<'a>(&'a self, limit: usize) -> StoreFuture<'a, Vec<Tick>> {
        self.inner.recent_ticks(limit)
    }

    fn latest_tick<'a>(&'a self, symbol: &'a StockSymbol) -> StoreFuture<'a, Option<Tick>> {
        self.inner.latest_tick(symbol)
    }

    fn symbol_ticks<'a>(
        &'a self,
        symbol: &'a StockSymbol,
        window: TickWindow,
    ) -> StoreFuture<'a, Vec<Tick>> {
        self.inner.symbol_ticks(symbol, window)
    }

    fn health<'a>(&'a self) -> ProbeFuture<'a> {
        self.inner.health()
    }
}
