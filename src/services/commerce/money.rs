//! Integer-cents arithmetic.
//!
//! Catalog prices are stored as decimals in major units. They are turned into
//! cents exactly once, when the cart snapshot is read, and every later
//! computation stays in `i64` cents.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};

/// Upper bound for any single amount. Keeps values exact in JSON numbers.
pub const MAX_AMOUNT_CENTS: i64 = 1 << 53;

const BPS_DENOMINATOR: i64 = 10_000;

/// Converts a major-unit decimal price to cents, rounding half-up.
///
/// Returns `None` for negative prices or values beyond [`MAX_AMOUNT_CENTS`].
pub fn decimal_to_cents(price: Decimal) -> Option<i64> {
    if price.is_sign_negative() && !price.is_zero() {
        return None;
    }
    let cents = price
        .checked_mul(Decimal::ONE_HUNDRED)?
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
        .to_i64()?;
    within_bounds(cents)
}

/// `unit_price_cents * quantity`, checked.
pub fn line_total(unit_price_cents: i64, quantity: i32) -> Option<i64> {
    if unit_price_cents < 0 || quantity < 0 {
        return None;
    }
    unit_price_cents
        .checked_mul(i64::from(quantity))
        .and_then(within_bounds)
}

/// Checked addition that also enforces [`MAX_AMOUNT_CENTS`].
pub fn add(a: i64, b: i64) -> Option<i64> {
    a.checked_add(b).and_then(within_bounds)
}

/// `amount * bps / 10000`, rounded half-up. `amount` must be non-negative.
pub fn apply_rate_bps(amount_cents: i64, rate_bps: u32) -> Option<i64> {
    if amount_cents < 0 {
        return None;
    }
    amount_cents
        .checked_mul(i64::from(rate_bps))?
        .checked_add(BPS_DENOMINATOR / 2)
        .map(|scaled| scaled / BPS_DENOMINATOR)
        .and_then(within_bounds)
}

fn within_bounds(cents: i64) -> Option<i64> {
    (0..=MAX_AMOUNT_CENTS).contains(&cents).then_some(cents)
}
