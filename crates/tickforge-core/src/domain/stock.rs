use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Price, StockSymbol, UtcDateTime, ValidationError};

/// A listed stock and its current simulated price.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stock {
    pub id: Uuid,
    pub symbol: StockSymbol,
    pub name: String,
    pub exchange: String,
    pub sector: String,
    pub industry: String,
    pub current_price: Price,
    pub market_cap: Decimal,
    pub is_active: bool,
    pub created_at: UtcDateTime,
    pub updated_at: Option<UtcDateTime>,
}

impl Stock {
    /// Create a new active stock with zero market cap.
    pub fn create(
        symbol: &str,
        name: &str,
        exchange: &str,
        sector: &str,
        industry: &str,
        initial_price: Decimal,
    ) -> Result<Self, ValidationError> {
        let symbol = StockSymbol::parse(symbol)?;
        let name = required("name", name)?;
        let exchange = required("exchange", exchange)?;
        let sector = required("sector", sector)?;
        let industry = required("industry", industry)?;
        let current_price = positive_price(initial_price)?;

        Ok(Self {
            id: Uuid::new_v4(),
            symbol,
            name,
            exchange,
            sector,
            industry,
            current_price,
            market_cap: Decimal::ZERO,
            is_active: true,
            created_at: UtcDateTime::now(),
            updated_at: None,
        })
    }

    /// Set a new current price, keeping the existing currency.
    pub fn update_price(&mut self, new_price: Decimal) -> Result<(), ValidationError> {
        if new_price <= Decimal::ZERO {
            return Err(ValidationError::NonPositiveValue { field: "price" });
        }
        self.current_price = Price::new(new_price, self.current_price.currency())?;
        self.touch();
        Ok(())
    }

    pub fn update_market_cap(&mut self, market_cap: Decimal) -> Result<(), ValidationError> {
        if market_cap < Decimal::ZERO {
            return Err(ValidationError::NegativeValue {
                field: "market_cap",
            });
        }
        self.market_cap = market_cap;
        self.touch();
        Ok(())
    }

    pub fn activate(&mut self) {
        self.is_active = true;
        self.touch();
    }

    pub fn deactivate(&mut self) {
        self.is_active = false;
        self.touch();
    }

    pub fn update_info(
        &mut self,
        name: &str,
        sector: &str,
        industry: &str,
    ) -> Result<(), ValidationError> {
        let name = required("name", name)?;
        let sector = required("sector", sector)?;
        let industry = required("industry", industry)?;
        self.name = name;
        self.sector = sector;
        self.industry = industry;
        self.touch();
        Ok(())
    }

    fn touch(&mut self) {
        self.updated_at = Some(UtcDateTime::now());
    }
}

fn required(field: &'static str, value: &str) -> Result<String, ValidationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::EmptyField { field });
    }
    Ok(trimmed.to_owned())
}

fn positive_price(value: Decimal) -> Result<Price, ValidationError> {
    if value <= Decimal::ZERO {
        return Err(ValidationError::NonPositiveValue { field: "price" });
    }
    Price::usd(value)
}
