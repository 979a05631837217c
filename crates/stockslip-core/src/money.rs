//! Integer money.
//!
//! Prices, discounts and totals are whole minor units (`i64`). A cover at
//! 100.00 is `10000`; the bulk discount of 10.00 per unit is `1000`; ten
//! covers at 90.00 are exactly `90000`. Persisted rows keep their raw
//! `*_cents` columns and convert at the edge.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Mul, Neg, Sub, SubAssign};
use ts_rs::TS;

/// Signed amount in minor units. Negative values are legitimate: a manual
/// price above base is a negative discount.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Money(i64);

impl Money {
    /// ```rust
    /// use stockslip_core::money::Money;
    ///
    /// assert_eq!(Money::from_cents(8999).to_string(), "89.99");
    /// ```
    #[inline]
    pub const fn from_cents(cents: i64) -> Self {
        Money(cents)
    }

    /// ```rust
    /// use stockslip_core::money::Money;
    ///
    /// assert_eq!(Money::from_major(10).cents(), 1000);
    /// ```
    #[inline]
    pub const fn from_major(units: i64) -> Self {
        Money(units * 100)
    }

    #[inline]
    pub const fn cents(&self) -> i64 {
        self.0
    }

    /// Whole units, truncated toward zero.
    #[inline]
    pub const fn major(&self) -> i64 {
        self.0 / 100
    }

    /// Fractional part, 0..=99 regardless of sign.
    #[inline]
    pub const fn minor(&self) -> i64 {
        (self.0 % 100).abs()
    }

    #[inline]
    pub const fn zero() -> Self {
        Money(0)
    }

    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    #[inline]
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Line total for `qty` units at this unit price.
    #[inline]
    pub const fn multiply_quantity(&self, qty: i64) -> Self {
        Money(self.0 * qty)
    }
}

// =============================================================================
// Arithmetic
// =============================================================================

/// Debug-oriented display (`-12.50`). Frontends do their own localisation.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        write!(f, "{}{}.{:02}", sign, self.major().abs(), self.minor())
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

impl SubAssign for Money {
    #[inline]
    fn sub_assign(&mut self, other: Self) {
        self.0 -= other.0;
    }
}

impl Neg for Money {
    type Output = Self;

    #[inline]
    fn neg(self) -> Self {
        Money(-self.0)
    }
}

/// Multiplication by a quantity.
impl Mul<i64> for Money {
    type Output = Self;

    #[inline]
    fn mul(self, qty: i64) -> Self {
        Money(self.0 * qty)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), Add::add)
    }
}

impl From<i64> for Money {
    fn from(cents: i64) -> Self {
        Money(cents)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_major() {
        assert_eq!(Money::from_major(100).cents(), 10_000);
        assert_eq!(Money::from_major(-5).cents(), -500);
    }

    #[test]
    fn test_display() {
        assert_eq!(format!("{}", Money::from_cents(1099)), "10.99");
        assert_eq!(format!("{}", Money::from_cents(500)), "5.00");
        assert_eq!(format!("{}", Money::from_cents(-550)), "-5.50");
        assert_eq!(format!("{}", Money::zero()), "0.00");
    }

    #[test]
    fn test_discount_arithmetic() {
        let base = Money::from_cents(10_000);
        let bulk = Money::from_cents(1_000);

        assert_eq!((base - bulk).cents(), 9_000);
        assert_eq!((base + bulk).cents(), 11_000);
        assert_eq!(((base - bulk) * 3).cents(), 27_000);
        assert_eq!((-bulk).cents(), -1_000);
        assert!((bulk - base).is_negative());
    }

    #[test]
    fn test_sum() {
        let total: Money = [100, 250, 650].into_iter().map(Money::from_cents).sum();
        assert_eq!(total.cents(), 1000);
    }

    #[test]
    fn test_bulk_line_total() {
        assert_eq!(Money::from_cents(9000).multiply_quantity(10).cents(), 90_000);
    }
}
