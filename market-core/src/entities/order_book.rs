//! Two-sided sorted price-level table
//!
//! Bids are kept in descending price order, asks in ascending order, so the
//! best level of each side is always at index 0. Every stored level has a
//! non-zero quantity and each price appears at most once per side.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use thiserror::Error;

use super::price_level::PriceLevel;
use crate::value_objects::{CurrencyPair, Price, Quantity, Side};

/// What a single incremental update did to the book
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LevelChange {
    /// A new price level was added
    Inserted,
    /// An existing level's quantity was overwritten
    Updated,
    /// An existing level was deleted (quantity 0)
    Removed,
    /// Deletion of a price that was not present
    Unchanged,
}

/// Why a market order could not be priced against the book
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FillError {
    #[error("fill quantity must be positive")]
    ZeroQuantity,
    #[error("{side} side holds {available}, cannot fill {requested}")]
    InsufficientDepth {
        side: Side,
        requested: Quantity,
        available: Quantity,
    },
    #[error("notional overflows while walking the {0} side")]
    Overflow(Side),
}

/// Order book for one trading pair
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderBook {
    pair: CurrencyPair,
    bids: Vec<PriceLevel>,
    asks: Vec<PriceLevel>,
}

impl OrderBook {
    /// Create an empty book
    pub fn new(pair: CurrencyPair) -> Self {
        OrderBook {
            pair,
            bids: Vec::new(),
            asks: Vec::new(),
        }
    }

    /// Build a book from full snapshot levels in any order.
    ///
    /// Zero-quantity entries are discarded first; among the remaining
    /// entries the last one seen for a price wins.
    pub fn from_snapshot(
        pair: CurrencyPair,
        bids: impl IntoIterator<Item = PriceLevel>,
        asks: impl IntoIterator<Item = PriceLevel>,
    ) -> Self {
        OrderBook {
            pair,
            bids: normalize(bids).into_iter().rev().collect(),
            asks: normalize(asks),
        }
    }

    pub fn pair(&self) -> &CurrencyPair {
        &self.pair
    }

    /// Bid levels, best (highest) first
    pub fn bids(&self) -> &[PriceLevel] {
        &self.bids
    }

    /// Ask levels, best (lowest) first
    pub fn asks(&self) -> &[PriceLevel] {
        &self.asks
    }

    pub fn levels(&self, side: Side) -> &[PriceLevel] {
        match side {
            Side::Bid => &self.bids,
            Side::Ask => &self.asks,
        }
    }

    /// Apply one incremental level update.
    ///
    /// `quantity == 0` deletes the level at `price`; any other quantity
    /// inserts or overwrites it. The side stays sorted and duplicate-free.
    pub fn apply(&mut self, side: Side, price: Price, quantity: Quantity) -> LevelChange {
        let levels = match side {
            Side::Bid => &mut self.bids,
            Side::Ask => &mut self.asks,
        };

        match search(levels, side, price) {
            Ok(index) if quantity.is_zero() => {
                levels.remove(index);
                LevelChange::Removed
            }
            Ok(index) => {
                levels[index].quantity = quantity;
                LevelChange::Updated
            }
            Err(_) if quantity.is_zero() => LevelChange::Unchanged,
            Err(index) => {
                levels.insert(index, PriceLevel::new(price, quantity));
                LevelChange::Inserted
            }
        }
    }

    /// Look up the level at an exact price
    pub fn level_at(&self, side: Side, price: Price) -> Option<&PriceLevel> {
        let levels = self.levels(side);
        search(levels, side, price).ok().map(|index| &levels[index])
    }

    /// Get the best bid (highest buy price)
    pub fn best_bid(&self) -> Option<&PriceLevel> {
        self.bids.first()
    }

    /// Get the best ask (lowest sell price)
    pub fn best_ask(&self) -> Option<&PriceLevel> {
        self.asks.first()
    }

    /// Get the spread (best ask - best bid)
    pub fn spread(&self) -> Option<Price> {
        Some(self.best_ask()?.price - self.best_bid()?.price)
    }

    /// Get the mid price
    pub fn mid_price(&self) -> Option<Price> {
        let bid = self.best_bid()?.price.raw();
        let ask = self.best_ask()?.price.raw();
        Some(Price::from_raw(bid + (ask - bid) / 2))
    }

    /// Get top N bid levels
    pub fn top_bids(&self, n: usize) -> &[PriceLevel] {
        &self.bids[..n.min(self.bids.len())]
    }

    /// Get top N ask levels
    pub fn top_asks(&self, n: usize) -> &[PriceLevel] {
        &self.asks[..n.min(self.asks.len())]
    }

    /// Total resting quantity on one side
    pub fn total_quantity(&self, side: Side) -> Quantity {
        self.levels(side).iter().map(|l| l.quantity).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.bids.is_empty() && self.asks.is_empty()
    }

    /// Volume-weighted price of taking `quantity` from one side, best level first.
    ///
    /// A buy walks `Side::Ask`, a sell walks `Side::Bid`. Fails when the side
    /// cannot absorb the whole quantity. The average is truncated to 8 decimals.
    pub fn average_fill_price(&self, side: Side, quantity: Quantity) -> Result<Price, FillError> {
        if quantity.is_zero() {
            return Err(FillError::ZeroQuantity);
        }

        let wanted = quantity.raw();
        let mut remaining = wanted;
        // price raw * quantity raw, scaled by 10^16
        let mut notional: i128 = 0;

        for level in self.levels(side) {
            let take = remaining.min(level.quantity.raw());
            notional = i128::from(level.price.raw())
                .checked_mul(i128::from(take))
                .and_then(|cost| notional.checked_add(cost))
                .ok_or(FillError::Overflow(side))?;
            remaining -= take;
            if remaining == 0 {
                break;
            }
        }

        if remaining > 0 {
            return Err(FillError::InsufficientDepth {
                side,
                requested: quantity,
                available: Quantity::from_raw(wanted - remaining),
            });
        }

        i64::try_from(notional / i128::from(wanted))
            .map(Price::from_raw)
            .map_err(|_| FillError::Overflow(side))
    }

    /// True when both sides are strictly ordered and hold no empty levels
    pub fn is_consistent(&self) -> bool {
        let no_empty = self.bids.iter().chain(&self.asks).all(|l| !l.is_empty());
        let bids_desc = self.bids.windows(2).all(|w| w[0].price > w[1].price);
        let asks_asc = self.asks.windows(2).all(|w| w[0].price < w[1].price);
        no_empty && bids_desc && asks_asc
    }
}

/// Binary search honouring the side's ordering (bids descending, asks ascending)
fn search(levels: &[PriceLevel], side: Side, price: Price) -> Result<usize, usize> {
    levels.binary_search_by(|level| -> Ordering {
        match side {
            Side::Bid => price.cmp(&level.price),
            Side::Ask => level.price.cmp(&price),
        }
    })
}

/// Ascending, de-duplicated (last wins), zero-free levels
fn normalize(levels: impl IntoIterator<Item = PriceLevel>) -> Vec<PriceLevel> {
    let mut by_price = BTreeMap::new();
    for level in levels {
        if !level.is_empty() {
            by_price.insert(level.price, level.quantity);
        }
    }
    by_price
        .into_iter()
        .map(|(price, quantity)| PriceLevel::new(price, quantity))
        .collect()
}
