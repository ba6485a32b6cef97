//! Value objects for the order domain.

use serde::{Deserialize, Serialize};

/// Money amount in minor currency units (kopecks/cents) to avoid
/// floating point issues. This is also the unit the payment gateway
/// expects in its `Amount` fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Money(i64);

impl Money {
    /// Creates a money amount from minor units.
    pub fn from_minor_units(units: i64) -> Self {
        Self(units)
    }

    /// Returns zero money.
    pub fn zero() -> Self {
        Self(0)
    }

    /// Returns the amount in minor units.
    pub fn minor_units(&self) -> i64 {
        self.0
    }

    /// Returns true if the amount is strictly positive.
    pub fn is_positive(&self) -> bool {
        self.0 > 0
    }
}

impl Default for Money {
    fn default() -> Self {
        Self::zero()
    }
}

impl std::fmt::Display for Money {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{:02}", self.0 / 100, (self.0 % 100).abs())
    }
}

impl std::ops::Add for Money {
    type Output = Money;

    fn add(self, rhs: Self) -> Self::Output {
        Money(self.0 + rhs.0)
    }
}

impl std::ops::Sub for Money {
    type Output = Money;

    fn sub(self, rhs: Self) -> Self::Output {
        Money(self.0 - rhs.0)
    }
}

/// Rental discount tier in percent.
///
/// Opaque payload from the pipeline's point of view; it rides on the
/// order row and is passed through to pricing untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Discount {
    #[default]
    None,
    Five,
    Ten,
    Fifteen,
}

impl Discount {
    /// Returns the discount as a whole percentage.
    pub fn percent(&self) -> u8 {
        match self {
            Discount::None => 0,
            Discount::Five => 5,
            Discount::Ten => 10,
            Discount::Fifteen => 15,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn money_minor_units_roundtrip() {
        let m = Money::from_minor_units(12_345);
        assert_eq!(m.minor_units(), 12_345);
        assert_eq!(m.to_string(), "123.45");
    }

    #[test]
    fn money_arithmetic() {
        let a = Money::from_minor_units(1000);
        let b = Money::from_minor_units(250);
        assert_eq!((a + b).minor_units(), 1250);
        assert_eq!((a - b).minor_units(), 750);
    }

    #[test]
    fn money_positivity() {
        assert!(Money::from_minor_units(1).is_positive());
        assert!(!Money::zero().is_positive());
        assert!(!Money::from_minor_units(-5).is_positive());
    }

    #[test]
    fn discount_percentages() {
        assert_eq!(Discount::None.percent(), 0);
        assert_eq!(Discount::Fifteen.percent(), 15);
        assert_eq!(Discount::default(), Discount::None);
    }
}
