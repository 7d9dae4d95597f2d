use tickforge_warehouse::{StockRecord, TickRecord, Warehouse};
use uuid::Uuid;

use super::{ensure_positive_price, MarketStore, ProbeFuture, StockFilter, StoreFuture, TickWindow};
use crate::domain::TickValues;
use crate::{Price, Stock, StockSymbol, StoreError, Tick, UtcDateTime};

/// [`MarketStore`] over the embedded DuckDB warehouse.
///
/// Warehouse calls block, so each one runs on tokio's blocking pool.
#[derive(Clone)]
pub struct WarehouseStore {
    warehouse: Warehouse,
}

impl WarehouseStore {
    pub fn new(warehouse: Warehouse) -> Self {
        Self { warehouse }
    }

    pub fn warehouse(&self) -> &Warehouse {
        &self.warehouse
    }

    async fn blocking<T, F>(&self, operation: F) -> Result<T, StoreError>
    where
        T: Send + 'static,
        F: FnOnce(&Warehouse) -> Result<T, StoreError> + Send + 'static,
    {
        let warehouse = self.warehouse.clone();
        tokio::task::spawn_blocking(move || operation(&warehouse))
            .await
            .map_err(|error| StoreError::transport(format!("warehouse task failed: {error}")))?
    }
}

impl MarketStore for WarehouseStore {
    fn get_stock<'a>(&'a self, symbol: &'a StockSymbol) -> StoreFuture<'a, Option<Stock>> {
        let symbol = symbol.to_string();
        Box::pin(self.blocking(move |warehouse| {
            warehouse
                .get_stock(&symbol)?
                .map(stock_from_record)
                .transpose()
        }))
    }

    fn create_stock<'a>(&'a self, stock: Stock) -> StoreFuture<'a, Uuid> {
        Box::pin(self.blocking(move |warehouse| {
            let record = stock_to_record(&stock);
            if warehouse.insert_stock(&record)? {
                Ok(stock.id)
            } else {
                Err(StoreError::Conflict {
                    symbol: record.symbol,
                })
            }
        }))
    }

    fn update_stock_price<'a>(
        &'a self,
        symbol: &'a StockSymbol,
        price: Price,
    ) -> StoreFuture<'a, ()> {
        let symbol = symbol.to_string();
        Box::pin(async move {
            ensure_positive_price(&price)?;
            self.blocking(move |warehouse| {
                let now = UtcDateTime::now().unix_micros();
                if warehouse.update_stock_price(&symbol, price.value(), now)? {
                    Ok(())
                } else {
                    Err(StoreError::NotFound { symbol })
                }
            })
            .await
        })
    }

    fn list_stocks<'a>(&'a self, filter: StockFilter) -> StoreFuture<'a, Vec<Stock>> {
        Box::pin(self.blocking(move |warehouse| {
            warehouse
                .list_stocks(filter.active_only)?
                .into_iter()
                .map(stock_from_record)
                .collect()
        }))
    }

    fn append_tick<'a>(&'a self, tick: Tick) -> StoreFuture<'a, Uuid> {
        Box::pin(self.blocking(move |warehouse| {
            warehouse.append_ticks(&[tick_to_record(&tick)])?;
            Ok(tick.id)
        }))
    }

    fn append_ticks<'a>(&'a self, ticks: Vec<Tick>) -> StoreFuture<'a, usize> {
        Box::pin(self.blocking(move |warehouse| {
            let records: Vec<TickRecord> = ticks.iter().map(tick_to_record).collect();
            Ok(warehouse.append_ticks(&records)?)
        }))
    }

    fn recent_ticks<'a>(&'a self, limit: usize) -> StoreFuture<'a, Vec<Tick>> {
        Box::pin(self.blocking(move |warehouse| {
            warehouse
                .recent_ticks(limit)?
                .into_iter()
                .map(tick_from_record)
                .collect()
        }))
    }

    fn latest_tick<'a>(&'a self, symbol: &'a StockSymbol) -> StoreFuture<'a, Option<Tick>> {
        let symbol = symbol.to_string();
        Box::pin(self.blocking(move |warehouse| {
            warehouse
                .latest_tick(&symbol)?
                .map(tick_from_record)
                .transpose()
        }))
    }

    fn symbol_ticks<'a>(
        &'a self,
        symbol: &'a StockSymbol,
        window: TickWindow,
    ) -> StoreFuture<'a, Vec<Tick>> {
        let symbol = symbol.to_string();
        Box::pin(self.blocking(move |warehouse| {
            let from = window.from.map(UtcDateTime::unix_micros);
            let to = window.to.map(UtcDateTime::unix_micros);
            warehouse
                .symbol_ticks(&symbol, from, to)?
                .into_iter()
                .map(tick_from_record)
                .collect()
        }))
    }

    fn health<'a>(&'a self) -> ProbeFuture<'a> {
        Box::pin(async move {
            match self.blocking(|warehouse| Ok(warehouse.ping()?)).await {
                Ok(()) => true,
                Err(error) => {
                    tracing::debug!(%error, "warehouse health probe failed");
                    false
                }
            }
        })
    }
}

fn stock_to_record(stock: &Stock) -> StockRecord {
    StockRecord {
        id: stock.id.to_string(),
        symbol: stock.symbol.to_string(),
        name: stock.name.clone(),
        exchange: stock.exchange.clone(),
        sector: stock.sector.clone(),
        industry: stock.industry.clone(),
        price: stock.current_price.value(),
        currency: stock.current_price.currency().to_owned(),
        market_cap: stock.market_cap,
        is_active: stock.is_active,
        created_us: stock.created_at.unix_micros(),
        updated_us: stock.updated_at.map(UtcDateTime::unix_micros),
    }
}

fn stock_from_record(record: StockRecord) -> Result<Stock, StoreError> {
    Ok(Stock {
        id: parse_id(&record.id)?,
        symbol: StockSymbol::parse(&record.symbol)?,
        current_price: Price::new(record.price, &record.currency)?,
        name: record.name,
        exchange: record.exchange,
        sector: record.sector,
        industry: record.industry,
        market_cap: record.market_cap,
        is_active: record.is_active,
        created_at: UtcDateTime::from_unix_micros(record.created_us)?,
        updated_at: record
            .updated_us
            .map(UtcDateTime::from_unix_micros)
            .transpose()?,
    })
}

fn tick_to_record(tick: &Tick) -> TickRecord {
    TickRecord {
        id: tick.id.to_string(),
        symbol: tick.symbol.to_string(),
        price: tick.price.value(),
        volume: i64::try_from(tick.volume.value()).unwrap_or(i64::MAX),
        high: tick.high.value(),
        low: tick.low.value(),
        open: tick.open.value(),
        previous_close: tick.previous_close.value(),
        currency: tick.price.currency().to_owned(),
        ts_us: tick.timestamp.unix_micros(),
    }
}

fn tick_from_record(record: TickRecord) -> Result<Tick, StoreError> {
    let timestamp = UtcDateTime::from_unix_micros(record.ts_us)?;
    Ok(Tick::restore(
        parse_id(&record.id)?,
        &record.currency,
        &record.symbol,
        TickValues {
            price: record.price,
            volume: record.volume,
            high: record.high,
            low: record.low,
            open: record.open,
            previous_close: record.previous_close,
        },
        timestamp,
    )?)
}

fn parse_id(raw: &str) -> Result<Uuid, StoreError> {
    Uuid::parse_str(raw)
        .map_err(|error| StoreError::transport(format!("stored id '{raw}' is not a uuid: {error}")))
}
