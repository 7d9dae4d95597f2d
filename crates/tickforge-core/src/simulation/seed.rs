use rust_decimal::Decimal;

use crate::{Stock, ValidationError};

/// A stock the worker makes sure exists before simulating.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeedStock {
    pub symbol: &'static str,
    pub name: &'static str,
    pub exchange: &'static str,
    pub sector: &'static str,
    pub industry: &'static str,
    price_cents: i64,
}

impl SeedStock {
    const fn new(
        symbol: &'static str,
        name: &'static str,
        exchange: &'static str,
        sector: &'static str,
        industry: &'static str,
        price_cents: i64,
    ) -> Self {
        Self {
            symbol,
            name,
            exchange,
            sector,
            industry,
            price_cents,
        }
    }

    pub fn initial_price(&self) -> Decimal {
        Decimal::new(self.price_cents, 2)
    }

    pub fn to_stock(&self) -> Result<Stock, ValidationError> {
        Stock::create(
            self.symbol,
            self.name,
            self.exchange,
            self.sector,
            self.industry,
            self.initial_price(),
        )
    }
}

/// Default seed catalog.
pub const SEED_STOCKS: [SeedStock; 10] = [
    SeedStock::new("AAPL", "Apple Inc.", "NASDAQ", "Technology", "Consumer Electronics", 17_550),
    SeedStock::new("GOOGL", "Alphabet Inc.", "NASDAQ", "Technology", "Internet Services", 14_025),
    SeedStock::new("MSFT", "Microsoft Corp.", "NASDAQ", "Technology", "Software", 38_075),
    SeedStock::new("AMZN", "Amazon.com Inc.", "NASDAQ", "Consumer Cyclical", "Internet Retail", 14_580),
    SeedStock::new("TSLA", "Tesla Inc.", "NASDAQ", "Consumer Cyclical", "Auto Manufacturers", 24_530),
    SeedStock::new("META", "Meta Platforms Inc.", "NASDAQ", "Technology", "Social Media", 48_560),
    SeedStock::new("NVDA", "NVIDIA Corp.", "NASDAQ", "Technology", "Semiconductors", 49_525),
    SeedStock::new("JPM", "JPMorgan Chase & Co.", "NYSE", "Financial", "Banks", 18_540),
    SeedStock::new("V", "Visa Inc.", "NYSE", "Financial", "Credit Services", 26_590),
    SeedStock::new("WMT", "Walmart Inc.", "NYSE", "Consumer Defensive", "Retail", 16_575),
];
