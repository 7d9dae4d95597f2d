//! Delivery of generated ticks to a [`MarketStore`], followed by the matching
//! stock price updates.
//!
//! The tick write and the price write are separate calls and are not atomic:
//! a failure between them leaves tick history ahead of the stock's current
//! price until the next successful cycle.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::store::{validate_batch_item, MarketStore, MAX_BATCH_SIZE};
use crate::{IngestionError, StockSymbol, StoreError, Tick};

/// How ticks are handed to the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryMode {
    /// One `append_ticks` call per chunk of at most [`MAX_BATCH_SIZE`] ticks.
    #[default]
    Batch,
    /// One `append_tick` call per tick; item failures do not stop siblings.
    PerItem,
}

/// Outcome of one [`IngestionChannel::deliver`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DeliveryReport {
    pub ticks_written: usize,
    pub prices_updated: usize,
    pub skipped: usize,
}

/// Sends tick batches to a store and propagates new prices to stock records.
#[derive(Debug, Clone)]
pub struct IngestionChannel<S> {
    store: S,
    mode: DeliveryMode,
}

impl<S: MarketStore> IngestionChannel<S> {
    pub fn new(store: S, mode: DeliveryMode) -> Self {
        Self { store, mode }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub const fn mode(&self) -> DeliveryMode {
        self.mode
    }

    /// Deliver `batch` and update each written symbol's current price.
    ///
    /// Transport failures are returned, never retried here. Once anything has
    /// been written they come back as [`IngestionError::Interrupted`] carrying
    /// the number of ticks already delivered.
    pub async fn deliver(&self, batch: Vec<Tick>) -> Result<DeliveryReport, IngestionError> {
        if batch.is_empty() {
            return Ok(DeliveryReport::default());
        }

        let mut report = DeliveryReport::default();
        let written = match self.mode {
            DeliveryMode::Batch => self.deliver_batched(batch, &mut report).await?,
            DeliveryMode::PerItem => self.deliver_each(batch, &mut report).await?,
        };

        for (symbol, tick) in latest_per_symbol(&written) {
            match self.store.update_stock_price(symbol, tick.price.clone()).await {
                Ok(()) => report.prices_updated += 1,
                Err(error) if error.is_item_scoped() => {
                    tracing::warn!(symbol = %symbol, %error, "stock price not updated");
                }
                Err(source) => return Err(interrupted(report.ticks_written, source)),
            }
        }

        tracing::debug!(
            written = report.ticks_written,
            prices = report.prices_updated,
            skipped = report.skipped,
            "delivered tick batch"
        );
        Ok(report)
    }

    async fn deliver_batched(
        &self,
        batch: Vec<Tick>,
        report: &mut DeliveryReport,
    ) -> Result<Vec<Tick>, IngestionError> {
        let mut delivered = Vec::with_capacity(batch.len());
        for chunk in batch.chunks(MAX_BATCH_SIZE) {
            let count = self
                .store
                .append_ticks(chunk.to_vec())
                .await
                .map_err(|source| interrupted(report.ticks_written, source))?;
            report.ticks_written += count;
            report.skipped += chunk.len().saturating_sub(count);
            if count == chunk.len() {
                delivered.extend_from_slice(chunk);
            } else {
                // The store dropped invalid items; only valid ones move prices.
                delivered.extend(
                    chunk
                        .iter()
                        .filter(|tick| validate_batch_item(tick).is_ok())
                        .cloned(),
                );
            }
        }
        Ok(delivered)
    }

    async fn deliver_each(
        &self,
        batch: Vec<Tick>,
        report: &mut DeliveryReport,
    ) -> Result<Vec<Tick>, IngestionError> {
        let mut delivered = Vec::with_capacity(batch.len());
        for tick in batch {
            match self.store.append_tick(tick.clone()).await {
                Ok(_) => {
                    report.ticks_written += 1;
                    delivered.push(tick);
                }
                Err(error) if error.is_item_scoped() => {
                    tracing::warn!(symbol = %tick.symbol, %error, "tick rejected");
                    report.skipped += 1;
                }
                Err(source) => return Err(interrupted(report.ticks_written, source)),
            }
        }
        Ok(delivered)
    }
}

fn interrupted(delivered: usize, source: StoreError) -> IngestionError {
    if delivered == 0 {
        IngestionError::Store(source)
    } else {
        IngestionError::Interrupted { delivered, source }
    }
}

/// Last tick of each symbol in batch order.
fn latest_per_symbol(ticks: &[Tick]) -> BTreeMap<&StockSymbol, &Tick> {
    let mut latest = BTreeMap::new();
    for tick in ticks {
        latest.insert(&tick.symbol, tick);
    }
    latest
}
