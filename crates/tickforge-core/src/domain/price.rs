use std::fmt::{Display, Formatter};

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use crate::ValidationError;

pub const DEFAULT_CURRENCY: &str = "USD";

/// Non-negative decimal amount in a 3-letter currency.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawPrice")]
pub struct Price {
    value: Decimal,
    currency: String,
}

#[derive(Deserialize)]
struct RawPrice {
    value: Decimal,
    #[serde(default = "default_currency")]
    currency: String,
}

fn default_currency() -> String {
    String::from(DEFAULT_CURRENCY)
}

impl TryFrom<RawPrice> for Price {
    type Error = ValidationError;

    fn try_from(raw: RawPrice) -> Result<Self, Self::Error> {
        Self::new(raw.value, raw.currency)
    }
}

impl Price {
    pub fn new(value: Decimal, currency: impl AsRef<str>) -> Result<Self, ValidationError> {
        Self::for_field("price", value, currency)
    }

    /// A price in the default currency.
    pub fn usd(value: Decimal) -> Result<Self, ValidationError> {
        Self::new(value, DEFAULT_CURRENCY)
    }

    /// Like [`Price::new`], naming `field` in the validation error.
    pub fn for_field(
        field: &'static str,
        value: Decimal,
        currency: impl AsRef<str>,
    ) -> Result<Self, ValidationError> {
        if value.is_sign_negative() && !value.is_zero() {
            return Err(ValidationError::NegativeValue { field });
        }

        Ok(Self {
            value,
            currency: validate_currency_code(currency.as_ref())?,
        })
    }

    pub const fn value(&self) -> Decimal {
        self.value
    }

    pub fn currency(&self) -> &str {
        &self.currency
    }
}

impl Display for Price {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.value, self.currency)
    }
}

/// Non-negative count of traded shares.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Volume(u64);

impl Volume {
    /// Accepts a signed count, as received from loosely typed callers.
    pub fn new(value: i64) -> Result<Self, ValidationError> {
        u64::try_from(value)
            .map(Self)
            .map_err(|_| ValidationError::NegativeValue { field: "volume" })
    }

    pub const fn value(self) -> u64 {
        self.0
    }
}

impl From<u64> for Volume {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

impl Display for Volume {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Validate a 3-letter currency code and return it upper-cased.
pub fn validate_currency_code(value: &str) -> Result<String, ValidationError> {
    let trimmed = value.trim();
    let valid = trimmed.len() == 3 && trimmed.chars().all(|ch| ch.is_ascii_alphabetic());
    if !valid {
        return Err(ValidationError::InvalidCurrency {
            value: value.to_owned(),
        });
    }
    Ok(trimmed.to_ascii_uppercase())
}

/// Round to cents using banker's rounding (half to even).
pub fn round_to_cents(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointNearestEven)
}
