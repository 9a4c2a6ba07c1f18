use crate::value_objects::{Price, Quantity};
use serde::{Deserialize, Serialize};

/// Represents a single price level in the order book
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PriceLevel {
    pub price: Price,
    pub quantity: Quantity,
}

impl PriceLevel {
    pub fn new(price: Price, quantity: Quantity) -> Self {
        PriceLevel { price, quantity }
    }

    /// Parse a `[price, quantity]` pair of exchange strings
    pub fn parse(price: &str, quantity: &str) -> Result<Self, crate::ValueError> {
        Ok(PriceLevel {
            price: Price::parse(price)?,
            quantity: Quantity::parse(quantity)?,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.quantity.is_zero()
    }
}

impl From<(Price, Quantity)> for PriceLevel {
    fn from((price, quantity): (Price, Quantity)) -> Self {
        PriceLevel { price, quantity }
    }
}
