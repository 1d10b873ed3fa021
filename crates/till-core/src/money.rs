//! # Money Module
//!
//! Integer money and the small amount of arithmetic the till needs: line
//! totals, percentage discounts and loyalty points.
//!
//! ## Why Integer Money?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  0.1 + 0.2 = 0.30000000000000004 in binary floating point.              │
//! │                                                                         │
//! │  Every amount in Till is an i64 count of cents and every percentage    │
//! │  is an integer count of basis points (1 bps = 0.01 %). Rounding        │
//! │  happens exactly once, in the functions below, and is documented.      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use till_core::money::Money;
//!
//! let price = Money::from_cents(1099); // 10.99
//! let line = price.multiply_quantity(2).apply_discount_bps(1000); // 10 % off
//! assert_eq!(line.cents(), 1978);
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Sub};
use ts_rs::TS;

use crate::BPS_SCALE;

// =============================================================================
// Money Type
// =============================================================================

/// A monetary value in the smallest currency unit (cents).
///
/// Signed so that refunds and discount adjustments can be expressed, although
/// every amount persisted by the sale engine is validated non-negative.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from cents.
    #[inline]
    pub const fn from_cents(cents: i64) -> Self {
        Money(cents)
    }

    /// Returns the value in cents.
    #[inline]
    pub const fn cents(&self) -> i64 {
        self.0
    }

    /// Returns the whole currency units, truncated toward zero.
    #[inline]
    pub const fn units(&self) -> i64 {
        self.0 / 100
    }

    /// Returns zero money value.
    #[inline]
    pub const fn zero() -> Self {
        Money(0)
    }

    /// Checks if the value is negative.
    #[inline]
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Multiplies a unit price by a quantity.
    #[inline]
    pub const fn multiply_quantity(&self, qty: i64) -> Self {
        Money(self.0 * qty)
    }

    /// Returns the amount after a percentage discount in basis points.
    ///
    /// The discount amount is rounded half up to the nearest cent before it is
    /// subtracted, so `apply_discount_bps(1000)` on 10.05 takes off 1.01
    /// (1.005 rounds up) and leaves 9.04.
    pub fn apply_discount_bps(&self, discount_bps: i64) -> Money {
        let discount = (self.0 as i128 * discount_bps as i128 + (BPS_SCALE as i128 / 2))
            / BPS_SCALE as i128;
        Money(self.0 - discount as i64)
    }
}

/// Loyalty points earned for a purchase.
///
/// One point per whole currency unit spent, scaled by the tier multiplier in
/// basis points (10000 = 1.0×) and rounded down. Negative spend earns nothing.
///
/// ## Example
/// ```rust
/// use till_core::money::{points_for_spend, Money};
///
/// // 45.99 spent at a 1.5× tier: 45.99 × 1.5 = 68.985 → 68 points
/// assert_eq!(points_for_spend(Money::from_cents(4599), 15_000), 68);
/// ```
pub fn points_for_spend(total: Money, multiplier_bps: i64) -> i64 {
    if total.is_negative() || multiplier_bps <= 0 {
        return 0;
    }
    let scaled = total.cents() as i128 * multiplier_bps as i128;
    (scaled / (100 * BPS_SCALE as i128)) as i64
}

/// Line total for one sale line: price × quantity, less the line discount.
pub fn line_total(price_per_unit: Money, quantity: i64, discount_bps: i64) -> Money {
    price_per_unit
        .multiply_quantity(quantity)
        .apply_discount_bps(discount_bps)
}

// =============================================================================
// Trait Implementations
// =============================================================================

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        write!(f, "{}{}.{:02}", sign, self.units().abs(), (self.0 % 100).abs())
    }
}

impl Default for Money {
    fn default() -> Self {
        Money::zero()
    }
}

impl Add for Money {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Money(self.0 + other.0)
    }
}

impl AddAssign for Money {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        self.0 += other.0;
    }
}

impl Sub for Money {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Money(self.0 - other.0)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), |acc, m| acc + m)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
