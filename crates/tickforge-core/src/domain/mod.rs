//! # Domain Models
//!
//! Validated value types and entities for the simulated market.
//!
//! | Type | Description |
//! |------|-------------|
//! | [`StockSymbol`] | Normalized ticker, 1 to 10 alphanumerics |
//! | [`Price`] | Non-negative decimal amount with a currency |
//! | [`Volume`] | Non-negative share count |
//! | [`Stock`] | Aggregate root with current price and lifecycle flags |
//! | [`Tick`] | Immutable price observation with derived change |
//! | [`UtcDateTime`] | UTC timestamp |
//!
//! Construction validates every invariant, so a value that exists is valid:
//!
//! ```rust
//! use rust_decimal::Decimal;
//! use tickforge_core::{Tick, ValidationError};
//!
//! let negative = Tick::create(
//!     "AAPL",
//!     Decimal::ONE,
//!     -1,
//!     Decimal::ONE,
//!     Decimal::ONE,
//!     Decimal::ONE,
//!     Decimal::ONE,
//!     None,
//! );
//! assert!(matches!(negative, Err(ValidationError::NegativeValue { field: "volume" })));
//! ```

mod price;
mod stock;
mod symbol;
mod tick;
mod timestamp;

pub use price::{round_to_cents, validate_currency_code, Price, Volume, DEFAULT_CURRENCY};
pub use stock::Stock;
pub use symbol::{StockSymbol, MAX_SYMBOL_LEN};
pub use tick::{derive_change, Tick};
pub(crate) use tick::TickValues;
pub use timestamp::UtcDateTime;
