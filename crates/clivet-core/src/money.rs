//! # Money Module
//!
//! Provides the `Money` type for handling monetary values safely.
//!
//! ## Why Integer Money?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  THE FLOATING POINT PROBLEM                                             │
//! │                                                                         │
//! │  In floating point:                                                     │
//! │    0.1 + 0.2 = 0.30000000000000004                                      │
//! │                                                                         │
//! │  Float currency needs a ±0.01 epsilon on every comparison to absorb    │
//! │  exactly this. With integer centavos the epsilon collapses to exact    │
//! │  comparison and stored amounts are exact.                              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use clivet_core::money::Money;
//!
//! let price = Money::from_cents(10_000); // $100.00
//! let line = price.multiply_quantity(2); // $200.00
//! let discount = line.percentage(1_000); // 10% -> $20.00
//! assert_eq!((line - discount).cents(), 18_000);
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, AddAssign, Mul, Neg, Sub, SubAssign};
use ts_rs::TS;

// =============================================================================
// Money Type
// =============================================================================

/// A monetary value in centavos (the smallest currency unit).
///
/// - **i64 (signed)**: negative values occur for vuelto entries and for
///   fixed discounts larger than a line subtotal.
/// - **Single field tuple struct**: zero-cost abstraction over i64.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from centavos.
    #[inline]
    pub const fn from_cents(cents: i64) -> Self {
        Money(cents)
    }

    /// Returns the value in centavos.
    #[inline]
    pub const fn cents(&self) -> i64 {
        self.0
    }

    /// Zero money value.
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

    /// Returns the given fraction of this amount, in basis points.
    ///
    /// 1 bps = 0.01%; 1000 bps = 10%. Used for percentage discounts and for
    /// card surcharges. Rounds half-up to the centavo.
    ///
    /// ## Example
    /// ```rust
    /// use clivet_core::money::Money;
    ///
    /// let subtotal = Money::from_cents(20_000); // $200.00
    /// assert_eq!(subtotal.percentage(1_000).cents(), 2_000); // 10% -> $20.00
    /// assert_eq!(subtotal.percentage(1_500).cents(), 3_000); // 15% -> $30.00
    /// ```
    pub fn percentage(&self, bps: u32) -> Money {
        // i128 to prevent overflow on large amounts; +5000 rounds half-up
        let part = (self.0 as i128 * bps as i128 + 5000) / 10000;
        Money::from_cents(part as i64)
    }

    /// Multiplies money by a discrete quantity.
    #[inline]
    pub const fn multiply_quantity(&self, qty: i64) -> Self {
        Money(self.0 * qty)
    }

    /// Multiplies a per-unit price by a continuous dose amount (e.g. ml).
    ///
    /// Dosed line totals are rounded half-up to the centavo; the fraction
    /// exists only during this multiplication.
    ///
    /// ## Example
    /// ```rust
    /// use clivet_core::money::Money;
    ///
    /// let per_ml = Money::from_cents(150); // $1.50 per ml
    /// assert_eq!(per_ml.multiply_dose(2.5).cents(), 375);
    /// ```
    pub fn multiply_dose(&self, dose: f64) -> Self {
        Money((self.0 as f64 * dose).round() as i64)
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Display implementation shows money in a human-readable format.
///
/// For debugging; the frontend handles localized display.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        write!(f, "{}${}.{:02}", sign, (self.0 / 100).abs(), (self.0 % 100).abs())
    }
}

/// Default money is zero.
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

impl Mul<i64> for Money {
    type Output = Self;

    #[inline]
    fn mul(self, qty: i64) -> Self {
        Money(self.0 * qty)
    }
}

impl Neg for Money {
    type Output = Self;

    #[inline]
    fn neg(self) -> Self {
        Money(-self.0)
    }
}

impl std::iter::Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Money {
        iter.fold(Money::zero(), |acc, m| acc + m)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_cents() {
        let money = Money::from_cents(1099);
        assert_eq!(money.cents(), 1099);
    }

    #[test]
    fn test_display() {
        assert_eq!(format!("{}", Money::from_cents(1099)), "$10.99");
        assert_eq!(format!("{}", Money::from_cents(500)), "$5.00");
        assert_eq!(format!("{}", Money::from_cents(-550)), "-$5.50");
        assert_eq!(format!("{}", Money::from_cents(0)), "$0.00");
    }

    #[test]
    fn test_arithmetic() {
        let a = Money::from_cents(1000);
        let b = Money::from_cents(500);

        assert_eq!((a + b).cents(), 1500);
        assert_eq!((a - b).cents(), 500);
        assert_eq!((a * 3).cents(), 3000);
        assert_eq!((-a).cents(), -1000);
    }

    #[test]
    fn test_percentage() {
        let subtotal = Money::from_cents(20_000);
        assert_eq!(subtotal.percentage(1_000).cents(), 2_000); // 10%
        assert_eq!(subtotal.percentage(1_500).cents(), 3_000); // 15%
        assert_eq!(subtotal.percentage(0).cents(), 0);
    }

    #[test]
    fn test_percentage_rounds_half_up() {
        // $10.00 at 8.25% = $0.825 -> $0.83
        assert_eq!(Money::from_cents(1000).percentage(825).cents(), 83);
    }

    #[test]
    fn test_multiply_dose() {
        let per_ml = Money::from_cents(150);
        assert_eq!(per_ml.multiply_dose(2.5).cents(), 375);
        // 333 * 0.1 = 33.3 -> 33
        assert_eq!(Money::from_cents(333).multiply_dose(0.1).cents(), 33);
        // 335 * 0.5 = 167.5 -> 168
        assert_eq!(Money::from_cents(335).multiply_dose(0.5).cents(), 168);
    }

    #[test]
    fn test_sum() {
        let total: Money = [100, 250, -50]
            .iter()
            .map(|c| Money::from_cents(*c))
            .sum();
        assert_eq!(total.cents(), 300);
    }

    #[test]
    fn test_zero_and_checks() {
        let zero = Money::zero();
        assert!(zero.is_zero());
        assert!(!zero.is_positive());
        assert!(!zero.is_negative());

        assert!(Money::from_cents(100).is_positive());
        assert!(Money::from_cents(-100).is_negative());
    }
}
