//! # Money Module
//!
//! Provides the `Money` type for prices, totals and balances.
//!
//! ## Why Integer Money?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  THE FLOATING POINT PROBLEM                                             │
//! │                                                                         │
//! │  Balances are running sums over every sale and purchase:                │
//! │    0.1 + 0.2 = 0.30000000000000004  ❌ drifts forever                   │
//! │                                                                         │
//! │  OUR SOLUTION: whole currency units in an i64                           │
//! │    Prices are rounded once, at input time (see `numbers`)               │
//! │    Every total and balance after that is exact integer math             │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use stockbook_core::money::Money;
//!
//! let price = Money::from_units(100);
//! let total = price.checked_mul_quantity(3).unwrap();
//! assert_eq!(total.units(), 300);
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Neg, Sub, SubAssign};
use ts_rs::TS;

// =============================================================================
// Money Type
// =============================================================================

/// A signed amount in whole currency units.
///
/// ## Design Decisions
/// - **i64 (signed)**: balances go negative when the business owes a supplier
/// - **Single field tuple struct**: serializes as a bare number on the wire
///
/// ## Where Money is Used
/// ```text
/// Product.price / Product.cost ──► Transaction.price (frozen snapshot)
///                                        │
///                                        ▼
///                          Transaction.total = quantity × price
///                                        │
///                                        ▼
///                               Entity.balance ± total
/// ```
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize, TS,
)]
#[ts(export)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from whole currency units.
    #[inline]
    pub const fn from_units(units: i64) -> Self {
        Money(units)
    }

    /// Returns the value in whole currency units.
    #[inline]
    pub const fn units(&self) -> i64 {
        self.0
    }

    /// Returns zero money value.
    #[inline]
    pub const fn zero() -> Self {
        Money(0)
    }

    /// Checks if the value is zero.
    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Checks if the value is positive (greater than zero).
    #[inline]
    pub const fn is_positive(&self) -> bool {
        self.0 > 0
    }

    /// Checks if the value is negative (less than zero).
    #[inline]
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Returns the absolute value.
    #[inline]
    pub const fn abs(&self) -> Self {
        Money(self.0.abs())
    }

    /// Multiplies a unit price by a quantity.
    ///
    /// Returns `None` on overflow instead of wrapping, so a bogus quantity
    /// can never turn into a small (or negative) total.
    ///
    /// ## Example
    /// ```rust
    /// use stockbook_core::money::Money;
    ///
    /// assert_eq!(Money::from_units(60).checked_mul_quantity(10), Some(Money::from_units(600)));
    /// assert_eq!(Money::from_units(i64::MAX).checked_mul_quantity(2), None);
    /// ```
    #[inline]
    pub fn checked_mul_quantity(&self, qty: i64) -> Option<Self> {
        self.0.checked_mul(qty).map(Money)
    }

    /// Adds two amounts, returning `None` on overflow.
    #[inline]
    pub fn checked_add(&self, other: Money) -> Option<Self> {
        self.0.checked_add(other.0).map(Money)
    }

    /// Adds two amounts, clamping at the `i64` bounds.
    #[inline]
    pub const fn saturating_add(&self, other: Money) -> Self {
        Money(self.0.saturating_add(other.0))
    }

    /// Subtracts two amounts, clamping at the `i64` bounds.
    #[inline]
    pub const fn saturating_sub(&self, other: Money) -> Self {
        Money(self.0.saturating_sub(other.0))
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Display shows the signed unit amount. Currency symbols and locale
/// grouping belong to the presentation layer.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
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

/// Report totals saturate rather than overflow.
impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), |acc, m| acc.saturating_add(m))
    }
}

impl From<i64> for Money {
    fn from(units: i64) -> Self {
        Money(units)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_units() {
        let money = Money::from_units(1250);
        assert_eq!(money.units(), 1250);
        assert_eq!(money.to_string(), "1250");
        assert_eq!(Money::from_units(-40).to_string(), "-40");
    }

    #[test]
    fn test_arithmetic() {
        let a = Money::from_units(1000);
        let b = Money::from_units(500);

        assert_eq!((a + b).units(), 1500);
        assert_eq!((a - b).units(), 500);
        assert_eq!((-a).units(), -1000);

        let mut c = a;
        c -= b;
        c += Money::from_units(1);
        assert_eq!(c.units(), 501);
    }

    #[test]
    fn test_sum() {
        let total: Money = [100, 250, -50].into_iter().map(Money::from_units).sum();
        assert_eq!(total.units(), 300);

        let huge: Money = [i64::MAX, i64::MAX].into_iter().map(Money::from_units).sum();
        assert_eq!(huge.units(), i64::MAX);
    }

    #[test]
    fn test_zero_and_checks() {
        let zero = Money::zero();
        assert!(zero.is_zero());
        assert!(!zero.is_positive());
        assert!(!zero.is_negative());

        let owed = Money::from_units(-100);
        assert!(owed.is_negative());
        assert_eq!(owed.abs().units(), 100);
    }

    #[test]
    fn test_checked_mul_quantity_overflow() {
        assert_eq!(
            Money::from_units(100).checked_mul_quantity(2),
            Some(Money::from_units(200))
        );
        assert!(Money::from_units(i64::MAX / 2 + 1)
            .checked_mul_quantity(2)
            .is_none());
    }

    #[test]
    fn test_serializes_as_bare_number() {
        let json = serde_json::to_string(&Money::from_units(42)).unwrap();
        assert_eq!(json, "42");
    }
}
