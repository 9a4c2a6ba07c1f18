//! Fixed-point quantity representation
//!
//! Same 8-decimal scale as `Price`. A zero quantity in an incremental
//! book update is a deletion marker.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, Sub};

use super::error::ValueError;
use super::fixed::{self, FIXED_DECIMALS, FIXED_SCALE};

pub const QUANTITY_DECIMALS: u8 = FIXED_DECIMALS;
pub const QUANTITY_SCALE: i64 = FIXED_SCALE;

/// Non-negative fixed-point quantity with 8 decimal places
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(transparent)]
pub struct Quantity(i64);

impl Quantity {
    pub const ZERO: Quantity = Quantity(0);
    pub const DECIMALS: u8 = QUANTITY_DECIMALS;
    pub const SCALE: i64 = QUANTITY_SCALE;

    #[inline(always)]
    pub const fn from_raw(raw: i64) -> Self {
        Self(raw)
    }

    #[inline(always)]
    pub const fn from_int(value: i64) -> Self {
        Self(value * QUANTITY_SCALE)
    }

    #[inline(always)]
    pub const fn raw(self) -> i64 {
        self.0
    }

    #[inline(always)]
    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }

    /// Parse from string (e.g., "1.5")
    pub fn parse(s: &str) -> Result<Self, ValueError> {
        fixed::parse_unsigned(s).map(Self)
    }

    /// Create from a non-negative finite f64
    pub fn try_from_f64(value: f64) -> Result<Self, ValueError> {
        fixed::from_f64(value).map(Self)
    }

    #[inline]
    pub fn to_f64(self) -> f64 {
        self.0 as f64 / QUANTITY_SCALE as f64
    }
}

impl Default for Quantity {
    fn default() -> Self {
        Self::ZERO
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fixed::format(self.0, f)
    }
}

impl std::str::FromStr for Quantity {
    type Err = ValueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Quantity::parse(s)
    }
}

impl Add for Quantity {
    type Output = Quantity;
    #[inline(always)]
    fn add(self, rhs: Self) -> Self::Output {
        Quantity(self.0 + rhs.0)
    }
}

impl Sub for Quantity {
    type Output = Quantity;
    #[inline(always)]
    fn sub(self, rhs: Self) -> Self::Output {
        Quantity(self.0 - rhs.0)
    }
}

impl std::iter::Sum for Quantity {
    fn sum<I: Iterator<Item = Quantity>>(iter: I) -> Self {
        iter.fold(Quantity::ZERO, |acc, q| acc + q)
    }
}
