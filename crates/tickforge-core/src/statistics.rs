//! Market-wide statistics folded from stocks and a recent tick sample.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::store::{MarketStore, StockFilter};
use crate::{Stock, StoreError, Tick, UtcDateTime};

/// Default number of most recent ticks sampled for a snapshot.
pub const DEFAULT_TICK_SAMPLE: usize = 1_000;

/// Point-in-time market snapshot. Not persisted.
///
/// The advancing, declining and unchanged counts are taken over ticks in the
/// sample, not distinct symbols: a symbol with several ticks in the window is
/// counted once per tick.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarketStatistics {
    pub total_stocks: usize,
    pub active_stocks: usize,
    pub total_market_cap: Decimal,
    pub average_price: Decimal,
    pub total_volume: u64,
    pub advancing_stocks: usize,
    pub declining_stocks: usize,
    pub unchanged_stocks: usize,
    pub generated_at: UtcDateTime,
}

/// Fold stocks and a tick sample into a snapshot stamped with the current time.
pub fn aggregate(stocks: &[Stock], ticks: &[Tick]) -> MarketStatistics {
    aggregate_at(stocks, ticks, UtcDateTime::now())
}

/// Same as [`aggregate`] with an explicit snapshot instant.
pub fn aggregate_at(stocks: &[Stock], ticks: &[Tick], generated_at: UtcDateTime) -> MarketStatistics {
    let mut active_stocks = 0_usize;
    let mut total_market_cap = Decimal::ZERO;
    let mut price_sum = Decimal::ZERO;

    for stock in stocks.iter().filter(|stock| stock.is_active) {
        active_stocks += 1;
        total_market_cap = total_market_cap.saturating_add(stock.market_cap);
        price_sum = price_sum.saturating_add(stock.current_price.value());
    }

    let average_price = if active_stocks == 0 {
        Decimal::ZERO
    } else {
        price_sum
            .checked_div(Decimal::from(active_stocks))
            .unwrap_or(Decimal::ZERO)
    };

    let mut total_volume = 0_u64;
    let mut advancing_stocks = 0;
    let mut declining_stocks = 0;
    let mut unchanged_stocks = 0;
    for tick in ticks {
        total_volume = total_volume.saturating_add(tick.volume.value());
        if tick.change > Decimal::ZERO {
            advancing_stocks += 1;
        } else if tick.change < Decimal::ZERO {
            declining_stocks += 1;
        } else {
            unchanged_stocks += 1;
        }
    }

    MarketStatistics {
        total_stocks: stocks.len(),
        active_stocks,
        total_market_cap,
        average_price,
        total_volume,
        advancing_stocks,
        declining_stocks,
        unchanged_stocks,
        generated_at,
    }
}

/// Read every stock and the `sample` most recent ticks from `store`, then aggregate.
pub async fn collect_statistics(
    store: &dyn MarketStore,
    sample: usize,
) -> Result<MarketStatistics, StoreError> {
    let stocks = store.list_stocks(StockFilter::all()).await?;
    let ticks = store.recent_ticks(sample).await?;
    tracing::debug!(
        stocks = stocks.len(),
        ticks = ticks.len(),
        "aggregating market statistics"
    );
    Ok(aggregate(&stocks, &ticks))
}
