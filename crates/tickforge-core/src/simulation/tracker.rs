use std::collections::BTreeMap;

use rust_decimal::Decimal;

use crate::StockSymbol;

/// Last known price per symbol, owned by one worker.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PriceTracker {
    prices: BTreeMap<StockSymbol, Decimal>,
}

impl PriceTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, symbol: &StockSymbol) -> Option<Decimal> {
        self.prices.get(symbol).copied()
    }

    /// Record `price`, replacing any previous value.
    pub fn set(&mut self, symbol: StockSymbol, price: Decimal) {
        self.prices.insert(symbol, price);
    }

    /// Current price for `symbol`, adopting `fallback` when it is not tracked yet.
    pub fn get_or_adopt(&mut self, symbol: &StockSymbol, fallback: Decimal) -> Decimal {
        *self.prices.entry(symbol.clone()).or_insert(fallback)
    }

    pub fn len(&self) -> usize {
        self.prices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prices.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&StockSymbol, Decimal)> {
        self.prices.iter().map(|(symbol, price)| (symbol, *price))
    }
}
