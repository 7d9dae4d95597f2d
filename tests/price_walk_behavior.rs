//! Behavior-driven tests for the price walk
//!
//! These tests verify WHAT the next tick looks like for a given current price
//! and sequence of random draws, and that generated ticks satisfy the tick
//! invariants once validated.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tickforge_core::{
    PriceWalk, PriceWalkConfig, RangePolicy, RngSource, ScriptedSource, Tick, ValidationError,
};

fn default_walk() -> PriceWalk {
    PriceWalk::new(PriceWalkConfig::default()).expect("default config is valid")
}

// =============================================================================
// PriceWalk: Known Draws
// =============================================================================

#[test]
fn when_draws_are_fixed_then_next_tick_matches_the_worked_example() {
    // Given: AAPL at 175.50 and draws of +1% change, +0.5% high, 0.5% low, 500000 volume
    let walk = default_walk();
    let mut draws = ScriptedSource::new(vec![0.01, 0.005, 0.005], vec![500_000]);

    // When: The walk produces the next tick
    let next = walk.next_tick(dec!(175.50), &mut draws).expect("next tick");

    // Then: Prices are rounded half-to-even to cents
    assert_eq!(next.price, dec!(177.26));
    assert_eq!(next.high, dec!(178.15));
    assert_eq!(next.low, dec!(176.37));
    assert_eq!(next.open, dec!(175.50));
    assert_eq!(next.previous_close, dec!(175.50));
    assert_eq!(next.volume, 500_000);
}

#[test]
fn when_draw_lands_on_a_half_cent_then_rounding_goes_to_even() {
    // Given: A +0.5% move, which lands 1.00 on 1.005 and 3.00 on 3.015
    let walk = default_walk();
    let mut draws = ScriptedSource::new(vec![0.005, 0.0, 0.0], vec![100_000]);

    // When: The walk moves both prices
    let from_one = walk.next_tick(dec!(1.00), &mut draws).expect("next tick");
    let from_three = walk.next_tick(dec!(3.00), &mut draws).expect("next tick");

    // Then: Midpoints go to the even cent
    assert_eq!(from_one.price, dec!(1.00));
    assert_eq!(from_three.price, dec!(3.02));
    assert_eq!(from_three.high, from_three.price);
    assert_eq!(from_three.low, from_three.price);
}

// =============================================================================
// PriceWalk: Bounds
// =============================================================================

#[test]
fn when_walking_with_any_seed_then_change_stays_within_configured_bounds() {
    // Given: The default +/-2% walk and a seeded source
    let walk = default_walk();
    let mut rng = RngSource::seeded(2024);
    let mut current = dec!(175.50);

    for _ in 0..500 {
        // When: The walk takes another step
        let next = walk.next_tick(current, &mut rng).expect("next tick");

        // Then: The change is within +/-2% of the previous price, plus half a cent of rounding
        let tolerance = dec!(0.005);
        let lower = current * dec!(0.98) - tolerance;
        let upper = current * dec!(1.02) + tolerance;
        assert!(
            next.price >= lower && next.price <= upper,
            "{} outside [{lower}, {upper}]",
            next.price
        );
        assert!((100_000..=10_000_000).contains(&next.volume));
        current = next.price;
    }
}

#[test]
fn when_volume_bounds_are_equal_then_volume_is_exactly_that_value() {
    // Given: A walk whose volume range is a single value
    let walk = PriceWalk::new(PriceWalkConfig {
        min_volume: 42,
        max_volume: 42,
        ..PriceWalkConfig::default()
    })
    .expect("config");
    let mut rng = RngSource::seeded(1);

    // When / Then: Every draw returns the bound
    for _ in 0..10 {
        assert_eq!(walk.next_tick(dec!(10), &mut rng).expect("tick").volume, 42);
    }
}

#[test]
fn when_envelope_policy_is_selected_then_range_contains_price_and_open() {
    // Given: A large down move with zero range offsets
    let walk = PriceWalk::new(PriceWalkConfig {
        range_policy: RangePolicy::Envelope,
        ..PriceWalkConfig::default()
    })
    .expect("config");
    let mut draws = ScriptedSource::new(vec![-0.02, 0.0, 0.0], vec![100_000]);

    // When: The walk steps down from 100
    let next = walk.next_tick(dec!(100), &mut draws).expect("next tick");

    // Then: High stretches up to the open, low covers the new price
    assert_eq!(next.price, dec!(98));
    assert_eq!(next.high, dec!(100));
    assert_eq!(next.low, dec!(98));
}

#[test]
fn when_bounds_are_inverted_then_walk_is_not_built() {
    // Given: min change above max change
    let config = PriceWalkConfig {
        min_change_percent: 2.0,
        max_change_percent: -2.0,
        ..PriceWalkConfig::default()
    };

    // When: Building the walk
    let result = PriceWalk::new(config);

    // Then: The configuration is rejected
    assert!(matches!(result, Err(ValidationError::InvalidSetting { .. })));
}

// =============================================================================
// TickFactory: Derived Fields
// =============================================================================

#[test]
fn when_walk_output_becomes_a_tick_then_change_is_exactly_derived() {
    // Given: A seeded walk
    let walk = default_walk();
    let mut rng = RngSource::seeded(99);
    let mut current = dec!(245.30);

    for _ in 0..200 {
        let next = walk.next_tick(current, &mut rng).expect("next tick");

        // When: The values are validated into a tick
        let tick = Tick::create(
            "TSLA",
            next.price,
            i64::try_from(next.volume).expect("volume fits"),
            next.high,
            next.low,
            next.open,
            next.previous_close,
            None,
        )
        .expect("valid tick");

        // Then: Change and percent follow from price and previous close, and nothing is negative
        let change = next.price - next.previous_close;
        assert_eq!(tick.change, change);
        assert_eq!(tick.change_percent, change / next.previous_close * Decimal::ONE_HUNDRED);
        assert!(tick.low.value() >= Decimal::ZERO);
        current = next.price;
    }
}

#[test]
fn when_previous_close_is_zero_then_change_percent_is_zero() {
    // Given / When: A tick with a zero previous close
    let tick = Tick::create(
        "NEW",
        dec!(5),
        1,
        dec!(5),
        dec!(5),
        dec!(5),
        Decimal::ZERO,
        None,
    )
    .expect("tick");

    // Then: The percent is defined as zero instead of dividing by zero
    assert_eq!(tick.change, dec!(5));
    assert_eq!(tick.change_percent, Decimal::ZERO);
}

#[test]
fn when_any_price_is_negative_then_tick_construction_fails() {
    // Given / When: A tick with a negative low
    let result = Tick::create(
        "AAPL",
        dec!(1),
        1,
        dec!(1),
        dec!(-1),
        dec!(1),
        dec!(1),
        None,
    );

    // Then: Validation fails naming the field
    assert_eq!(
        result,
        Err(ValidationError::NegativeValue { field: "low" })
    );
}
