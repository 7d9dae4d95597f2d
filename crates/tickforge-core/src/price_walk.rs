//! Bounded random walk that turns a current price into the next tick's values.

use std::fmt::{Debug, Formatter};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{round_to_cents, ValidationError};

/// Source of the uniform draws consumed by [`PriceWalk`].
pub trait RandomSource: Send + Sync {
    /// Draw from `[low, high)`. Returns `low` when the interval is empty.
    fn uniform(&mut self, low: f64, high: f64) -> f64;

    /// Draw an integer from `[low, high]`. Returns `low` when `high < low`.
    fn uniform_volume(&mut self, low: u64, high: u64) -> u64;
}

/// [`RandomSource`] backed by any `rand` generator.
pub struct RngSource<R> {
    rng: R,
}

impl RngSource<StdRng> {
    /// Reproducible source for a given seed.
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn from_entropy() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }
}

impl<R: Rng> RngSource<R> {
    pub fn new(rng: R) -> Self {
        Self { rng }
    }
}

impl<R> Debug for RngSource<R> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RngSource").finish_non_exhaustive()
    }
}

impl<R: Rng + Send + Sync> RandomSource for RngSource<R> {
    fn uniform(&mut self, low: f64, high: f64) -> f64 {
        if low >= high {
            return low;
        }
        self.rng.gen_range(low..high)
    }

    fn uniform_volume(&mut self, low: u64, high: u64) -> u64 {
        if high <= low {
            return low;
        }
        self.rng.gen_range(low..=high)
    }
}

/// Replays fixed draws in order, wrapping around when exhausted.
///
/// Each scripted value is clamped into the interval requested by the caller.
#[derive(Debug, Clone, Default)]
pub struct ScriptedSource {
    draws: Vec<f64>,
    volumes: Vec<u64>,
    next_draw: usize,
    next_volume: usize,
}

impl ScriptedSource {
    pub fn new(draws: Vec<f64>, volumes: Vec<u64>) -> Self {
        Self {
            draws,
            volumes,
            next_draw: 0,
            next_volume: 0,
        }
    }
}

impl RandomSource for ScriptedSource {
    fn uniform(&mut self, low: f64, high: f64) -> f64 {
        let Some(value) = self.draws.get(self.next_draw % self.draws.len().max(1)) else {
            return low;
        };
        self.next_draw += 1;
        value.clamp(low, high.max(low))
    }

    fn uniform_volume(&mut self, low: u64, high: u64) -> u64 {
        let Some(value) = self.volumes.get(self.next_volume % self.volumes.len().max(1)) else {
            return low;
        };
        self.next_volume += 1;
        (*value).clamp(low, high.max(low))
    }
}

/// How the sampled intraday range relates to the new price and the open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RangePolicy {
    /// Keep the independently sampled high and low. The open may fall outside them.
    #[default]
    AsSampled,
    /// Widen the range so it contains both the new price and the open.
    Envelope,
}

/// Bounds for one step of the walk.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PriceWalkConfig {
    pub min_change_percent: f64,
    pub max_change_percent: f64,
    pub min_volume: u64,
    pub max_volume: u64,
    pub range_policy: RangePolicy,
}

impl Default for PriceWalkConfig {
    fn default() -> Self {
        Self {
            min_change_percent: -2.0,
            max_change_percent: 2.0,
            min_volume: 100_000,
            max_volume: 10_000_000,
            range_policy: RangePolicy::AsSampled,
        }
    }
}

impl PriceWalkConfig {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if !self.min_change_percent.is_finite() || !self.max_change_percent.is_finite() {
            return Err(ValidationError::InvalidSetting {
                name: "price_change_percent",
                reason: String::from("bounds must be finite"),
            });
        }
        if self.min_change_percent >= self.max_change_percent {
            return Err(ValidationError::InvalidSetting {
                name: "price_change_percent",
                reason: format!(
                    "min {} must be below max {}",
                    self.min_change_percent, self.max_change_percent
                ),
            });
        }
        if self.min_change_percent <= -100.0 {
            return Err(ValidationError::InvalidSetting {
                name: "min_price_change_percent",
                reason: String::from("must be above -100"),
            });
        }
        if self.min_volume > self.max_volume {
            return Err(ValidationError::InvalidSetting {
                name: "volume",
                reason: format!(
                    "min {} must not exceed max {}",
                    self.min_volume, self.max_volume
                ),
            });
        }
        Ok(())
    }
}

/// Values for the next tick, before they are validated into a [`crate::Tick`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawTickValues {
    pub price: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub open: Decimal,
    pub previous_close: Decimal,
    pub volume: u64,
}

/// Upper bound of the intraday range offsets, as a fraction of the new price.
const RANGE_FRACTION: f64 = 0.01;

/// Stateless step function; all state lives in the caller and the random source.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PriceWalk {
    config: PriceWalkConfig,
}

impl PriceWalk {
    pub fn new(config: PriceWalkConfig) -> Result<Self, ValidationError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub const fn config(&self) -> &PriceWalkConfig {
        &self.config
    }

    /// Draw the next tick for a symbol currently priced at `current`.
    ///
    /// Consumes three uniform draws (price change, high offset, low offset) and
    /// one volume draw, in that order.
    pub fn next_tick(
        &self,
        current: Decimal,
        rng: &mut dyn RandomSource,
    ) -> Result<RawTickValues, ValidationError> {
        let change = rng.uniform(
            self.config.min_change_percent / 100.0,
            self.config.max_change_percent / 100.0,
        );
        let high_offset = rng.uniform(0.0, RANGE_FRACTION);
        let low_offset = rng.uniform(0.0, RANGE_FRACTION);
        let volume = rng.uniform_volume(self.config.min_volume, self.config.max_volume);

        let price = scale(current, change, "price")?;
        let mut high = scale(price, high_offset, "high")?;
        let mut low = scale(price, -low_offset, "low")?;

        if self.config.range_policy == RangePolicy::Envelope {
            high = high.max(price).max(current);
            low = low.min(price).min(current);
        }

        Ok(RawTickValues {
            price,
            high,
            low,
            open: current,
            previous_close: current,
            volume,
        })
    }
}

/// `round(base * (1 + fraction), 2)`.
fn scale(base: Decimal, fraction: f64, field: &'static str) -> Result<Decimal, ValidationError> {
    let fraction = fraction_to_decimal(fraction, field)?;
    base.checked_mul(Decimal::ONE + fraction)
        .map(round_to_cents)
        .ok_or(ValidationError::UnrepresentableValue { field })
}

/// Binary floating point noise beyond ten places is dropped so midpoints round
/// the same way they would for the decimal literal.
fn fraction_to_decimal(value: f64, field: &'static str) -> Result<Decimal, ValidationError> {
    Decimal::from_f64(value)
        .map(|fraction| fraction.round_dp(10))
        .ok_or(ValidationError::UnrepresentableValue { field })
}
