use std::str::FromStr;

use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};

/// Monetary amount backed by a base-10 decimal.
///
/// All cart and invoice arithmetic goes through this type so totals never
/// pick up binary floating point error. Serialized as a decimal string
/// (`"10.50"`).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Money(Decimal);

impl Money {
    /// Creates a money amount from a decimal value.
    pub fn new(amount: Decimal) -> Self {
        Self(amount)
    }

    /// Returns zero money.
    pub fn zero() -> Self {
        Self(Decimal::ZERO)
    }

    /// Creates an amount from minor currency units (kopecks, cents).
    pub fn from_minor_units(units: i64) -> Self {
        Self(Decimal::new(units, 2))
    }

    /// Returns the underlying decimal.
    pub fn amount(&self) -> Decimal {
        self.0
    }

    /// Returns the amount in minor units, rounded to two decimal places.
    ///
    /// Payment providers take integer minor units. Returns `None` if the
    /// amount does not fit in an `i64`.
    pub fn minor_units(&self) -> Option<i64> {
        (self.0.round_dp(2) * Decimal::ONE_HUNDRED).to_i64()
    }

    /// Multiplies by a quantity.
    pub fn multiply(&self, quantity: u32) -> Money {
        Money(self.0 * Decimal::from(quantity))
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    pub fn is_negative(&self) -> bool {
        self.0.is_sign_negative() && !self.0.is_zero()
    }
}

impl std::fmt::Display for Money {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.2}", self.0.round_dp(2))
    }
}

impl FromStr for Money {
    type Err = rust_decimal::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Decimal::from_str(s).map(Self)
    }
}

impl From<Decimal> for Money {
    fn from(amount: Decimal) -> Self {
        Self(amount)
    }
}

impl std::ops::Add for Money {
    type Output = Money;

    fn add(self, rhs: Self) -> Self::Output {
        Money(self.0 + rhs.0)
    }
}

impl std::ops::AddAssign for Money {
    fn add_assign(&mut self, rhs: Self) {
        self.0 += rhs.0;
    }
}

impl std::iter::Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), |acc, m| acc + m)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn money(s: &str) -> Money {
        s.parse().unwrap()
    }

    #[test]
    fn test_decimal_addition_is_exact() {
        let total = money("0.10") + money("0.20");
        assert_eq!(total, money("0.30"));
    }

    #[test]
    fn test_multiply_by_quantity() {
        assert_eq!(money("10.00").multiply(3), money("30.00"));
        assert_eq!(money("19.99").multiply(0), Money::zero());
    }

    #[test]
    fn test_minor_units_roundtrip() {
        let m = Money::from_minor_units(2550);
        assert_eq!(m, money("25.50"));
        assert_eq!(m.minor_units(), Some(2550));
    }

    #[test]
    fn test_display_uses_two_places() {
        assert_eq!(money("25").to_string(), "25.00");
        assert_eq!(money("5.5").to_string(), "5.50");
        assert_eq!(Money::zero().to_string(), "0.00");
    }

    #[test]
    fn test_sum() {
        let total: Money = [money("1.25"), money("2.50"), money("0.25")]
            .into_iter()
            .sum();
        assert_eq!(total, money("4.00"));
    }

    #[test]
    fn test_serializes_as_string() {
        let json = serde_json::to_string(&money("10.50")).unwrap();
        assert_eq!(json, "\"10.50\"");
        let back: Money = serde_json::from_str(&json).unwrap();
        assert_eq!(back, money("10.50"));
    }

    #[test]
    fn test_negative_detection() {
        assert!(money("-1").is_negative());
        assert!(!Money::zero().is_negative());
    }
}
