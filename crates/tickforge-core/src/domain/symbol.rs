use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

use crate::ValidationError;

pub const MAX_SYMBOL_LEN: usize = 10;

/// Normalized stock ticker: 1 to 10 ASCII alphanumerics, upper-cased.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct StockSymbol(String);

impl StockSymbol {
    /// Parse and normalize a symbol to uppercase.
    pub fn parse(input: &str) -> Result<Self, ValidationError> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(ValidationError::EmptySymbol);
        }

        let normalized = trimmed.to_ascii_uppercase();
        let len = normalized.chars().count();
        if len > MAX_SYMBOL_LEN {
            return Err(ValidationError::SymbolTooLong {
                len,
                max: MAX_SYMBOL_LEN,
            });
        }

        if let Some((index, ch)) = normalized
            .chars()
            .enumerate()
            .find(|(_, ch)| !ch.is_ascii_alphanumeric())
        {
            return Err(ValidationError::SymbolInvalidChar { ch, index });
        }

        Ok(Self(normalized))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for StockSymbol {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<String> for StockSymbol {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl TryFrom<&str> for StockSymbol {
    type Error = ValidationError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<StockSymbol> for String {
    fn from(value: StockSymbol) -> Self {
        value.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_and_normalizes_symbol() {
        let parsed = StockSymbol::parse(" aapl ").expect("symbol should parse");
        assert_eq!(parsed.as_str(), "AAPL");
        assert_eq!(parsed, StockSymbol::parse("AAPL").expect("symbol should parse"));
    }

    #[test]
    fn accepts_exactly_ten_characters() {
        assert!(StockSymbol::parse("ABCDEFGHIJ").is_ok());
        let err = StockSymbol::parse("ABCDEFGHIJK").expect_err("must fail");
        assert_eq!(err, ValidationError::SymbolTooLong { len: 11, max: 10 });
    }

    #[test]
    fn rejects_empty_and_punctuated_symbols() {
        assert_eq!(
            StockSymbol::parse("   ").expect_err("must fail"),
            ValidationError::EmptySymbol
        );
        let err = StockSymbol::parse("BRK.B").expect_err("must fail");
        assert!(matches!(err, ValidationError::SymbolInvalidChar { ch: '.', index: 3 }));
    }

    #[test]
    fn deserializes_through_validation() {
        let parsed: StockSymbol = serde_json::from_str("\"msft\"").expect("valid json symbol");
        assert_eq!(parsed.as_str(), "MSFT");
        assert!(serde_json::from_str::<StockSymbol>("\"\"").is_err());
    }
}
