//! Fixed-point price
//!
//! 8 implied decimals. Levels are located by exact integer comparison, so
//! two exchange strings naming the same price always meet in the book.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, Sub};

use super::error::ValueError;
use super::fixed::{self, FIXED_DECIMALS, FIXED_SCALE};

pub const PRICE_DECIMALS: u8 = FIXED_DECIMALS;
pub const PRICE_SCALE: i64 = FIXED_SCALE;

/// Non-negative price, `8000.5` is stored as `800_050_000_000`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(transparent)]
pub struct Price(i64);

impl Price {
    pub const ZERO: Price = Price(0);
    pub const DECIMALS: u8 = PRICE_DECIMALS;
    pub const SCALE: i64 = PRICE_SCALE;

    #[inline(always)]
    pub const fn from_raw(raw: i64) -> Self {
        Self(raw)
    }

    #[inline(always)]
    pub const fn from_int(value: i64) -> Self {
        Self(value * PRICE_SCALE)
    }

    /// Scaled integer value
    #[inline(always)]
    pub const fn raw(self) -> i64 {
        self.0
    }

    #[inline(always)]
    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }

    /// Parse an exchange decimal string such as `"7990.00"`
    pub fn parse(s: &str) -> Result<Self, ValueError> {
        fixed::parse_unsigned(s).map(Self)
    }

    /// Create from a non-negative finite f64
    pub fn try_from_f64(value: f64) -> Result<Self, ValueError> {
        fixed::from_f64(value).map(Self)
    }

    /// Convert to f64 (display and analytics only)
    #[inline]
    pub fn to_f64(self) -> f64 {
        self.0 as f64 / PRICE_SCALE as f64
    }

    #[inline]
    pub fn saturating_sub(self, rhs: Self) -> Self {
        Self(self.0.saturating_sub(rhs.0))
    }
}

impl Default for Price {
    fn default() -> Self {
        Self::ZERO
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fixed::format(self.0, f)
    }
}

impl std::str::FromStr for Price {
    type Err = ValueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Price::parse(s)
    }
}

impl Add for Price {
    type Output = Price;
    #[inline(always)]
    fn add(self, rhs: Self) -> Self::Output {
        Price(self.0 + rhs.0)
    }
}

impl Sub for Price {
    type Output = Price;
    #[inline(always)]
    fn sub(self, rhs: Self) -> Self::Output {
        Price(self.0 - rhs.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exchange_strings_round_trip_display() {
        for (text, shown) in [("8000.00", "8000"), ("398.59", "398.59"), ("0.00000001", "0.00000001")] {
            assert_eq!(Price::parse(text).unwrap().to_string(), shown);
        }
        assert_eq!("10.5".parse::<Price>().unwrap().raw(), 10_50000000);
    }

    #[test]
    fn test_rejects_negative_and_non_finite() {
        assert!(matches!(Price::parse("-5"), Err(ValueError::Negative(_))));
        assert!(Price::try_from_f64(f64::NAN).is_err());
        assert_eq!(Price::try_from_f64(10.5).unwrap(), Price::parse("10.5").unwrap());
    }

    #[test]
    fn test_ordering_matches_numeric_value() {
        let mut prices: Vec<Price> = ["11", "9", "10.5", "10"]
            .iter()
            .map(|s| Price::parse(s).unwrap())
            .collect();
        prices.sort();
        let shown: Vec<String> = prices.iter().map(Price::to_string).collect();
        assert_eq!(shown, vec!["9", "10", "10.5", "11"]);
    }

    #[test]
    fn test_spread_arithmetic() {
        let bid = Price::from_int(100);
        let ask = Price::parse("100.25").unwrap();

        assert_eq!((ask - bid).to_string(), "0.25");
        assert_eq!((ask + bid).raw(), 200_25000000);
        assert_eq!(bid.saturating_sub(ask).raw(), -25000000);
        assert!((ask.to_f64() - 100.25).abs() < 1e-9);
    }
}
