use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::price::DEFAULT_CURRENCY;
use crate::{Price, StockSymbol, UtcDateTime, ValidationError, Volume};

/// One immutable observation of a stock's simulated trade.
///
/// `change` and `change_percent` are derived from `price` and `previous_close`
/// at construction and never recomputed. Deserialization goes through the same
/// path, so serialized derived values are ignored and derived again.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawTick")]
pub struct Tick {
    pub id: Uuid,
    pub symbol: StockSymbol,
    pub price: Price,
    pub volume: Volume,
    pub high: Price,
    pub low: Price,
    pub open: Price,
    pub previous_close: Price,
    pub change: Decimal,
    pub change_percent: Decimal,
    pub timestamp: UtcDateTime,
}

impl Tick {
    /// Build a validated tick in the default currency.
    ///
    /// Fails when the symbol is malformed, any price-like field is negative or
    /// the volume is negative. `timestamp` defaults to now.
    #[allow(clippy::too_many_arguments)]
    pub fn create(
        symbol: &str,
        price: Decimal,
        volume: i64,
        high: Decimal,
        low: Decimal,
        open: Decimal,
        previous_close: Decimal,
        timestamp: Option<UtcDateTime>,
    ) -> Result<Self, ValidationError> {
        Self::create_in(
            DEFAULT_CURRENCY,
            symbol,
            price,
            volume,
            high,
            low,
            open,
            previous_close,
            timestamp,
        )
    }

    /// Same as [`Tick::create`] with every price expressed in `currency`.
    #[allow(clippy::too_many_arguments)]
    pub fn create_in(
        currency: &str,
        symbol: &str,
        price: Decimal,
        volume: i64,
        high: Decimal,
        low: Decimal,
        open: Decimal,
        previous_close: Decimal,
        timestamp: Option<UtcDateTime>,
    ) -> Result<Self, ValidationError> {
        Self::assemble(
            Uuid::new_v4(),
            currency,
            symbol,
            TickValues {
                price,
                volume,
                high,
                low,
                open,
                previous_close,
            },
            timestamp.unwrap_or_else(UtcDateTime::now),
        )
    }

    /// Rebuild a stored tick under its original identity.
    pub(crate) fn restore(
        id: Uuid,
        currency: &str,
        symbol: &str,
        values: TickValues,
        timestamp: UtcDateTime,
    ) -> Result<Self, ValidationError> {
        Self::assemble(id, currency, symbol, values, timestamp)
    }

    fn assemble(
        id: Uuid,
        currency: &str,
        symbol: &str,
        values: TickValues,
        timestamp: UtcDateTime,
    ) -> Result<Self, ValidationError> {
        let symbol = StockSymbol::parse(symbol)?;
        let price = Price::for_field("price", values.price, currency)?;
        let volume = Volume::new(values.volume)?;
        let high = Price::for_field("high", values.high, currency)?;
        let low = Price::for_field("low", values.low, currency)?;
        let open = Price::for_field("open", values.open, currency)?;
        let previous_close = Price::for_field("previous_close", values.previous_close, currency)?;

        let (change, change_percent) = derive_change(values.price, values.previous_close)?;

        Ok(Self {
            id,
            symbol,
            price,
            volume,
            high,
            low,
            open,
            previous_close,
            change,
            change_percent,
            timestamp,
        })
    }
}

#[derive(Deserialize)]
struct RawTick {
    id: Uuid,
    symbol: String,
    price: Price,
    volume: i64,
    high: Price,
    low: Price,
    open: Price,
    previous_close: Price,
    timestamp: UtcDateTime,
}

impl TryFrom<RawTick> for Tick {
    type Error = ValidationError;

    fn try_from(raw: RawTick) -> Result<Self, Self::Error> {
        let values = TickValues {
            price: raw.price.value(),
            volume: raw.volume,
            high: raw.high.value(),
            low: raw.low.value(),
            open: raw.open.value(),
            previous_close: raw.previous_close.value(),
        };
        Self::restore(raw.id, raw.price.currency(), &raw.symbol, values, raw.timestamp)
    }
}

/// Raw numeric inputs of a tick, before validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct TickValues {
    pub price: Decimal,
    pub volume: i64,
    pub high: Decimal,
    pub low: Decimal,
    pub open: Decimal,
    pub previous_close: Decimal,
}

/// `change = price - previous_close`; the percentage is zero when there is no
/// previous close to compare against.
pub fn derive_change(
    price: Decimal,
    previous_close: Decimal,
) -> Result<(Decimal, Decimal), ValidationError> {
    let change = price
        .checked_sub(previous_close)
        .ok_or(ValidationError::UnrepresentableValue { field: "change" })?;

    if previous_close.is_zero() {
        return Ok((change, Decimal::ZERO));
    }

    let change_percent = change
        .checked_div(previous_close)
        .and_then(|ratio| ratio.checked_mul(Decimal::ONE_HUNDRED))
        .ok_or(ValidationError::UnrepresentableValue {
            field: "change_percent",
        })?;

    Ok((change, change_percent))
}
