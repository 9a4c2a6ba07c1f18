//! Order Book Reconciler
//!
//! Keeps one sorted level table per pair, fed by snapshot and diff events.
//! Stored books are `Arc`s updated copy-on-write, so a view handed to a
//! subscriber is never mutated after publication.

use market_core::{CurrencyPair, LevelChange, OrderBook, Price, PriceLevel, Quantity, Side};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

use crate::domain::{ReconcileError, SyncStatus};

struct PairBook {
    book: Arc<OrderBook>,
    status: SyncStatus,
}

/// Outcome of a successfully applied diff
#[derive(Debug, Clone)]
pub struct DiffOutcome {
    pub change: LevelChange,
    pub book: Arc<OrderBook>,
}

/// Per-pair order book state
pub struct OrderBookReconciler {
    books: Mutex<HashMap<CurrencyPair, PairBook>>,
}

impl Default for OrderBookReconciler {
    fn default() -> Self {
        Self::new()
    }
}

impl OrderBookReconciler {
    pub fn new() -> Self {
        OrderBookReconciler {
            books: Mutex::new(HashMap::new()),
        }
    }

    /// Replace the pair's book wholesale; this is the resync point
    pub fn apply_snapshot(
        &self,
        pair: &CurrencyPair,
        bids: Vec<PriceLevel>,
        asks: Vec<PriceLevel>,
    ) -> Arc<OrderBook> {
        let book = Arc::new(OrderBook::from_snapshot(pair.clone(), bids, asks));

        let previous = self.books.lock().insert(
            pair.clone(),
            PairBook {
                book: Arc::clone(&book),
                status: SyncStatus::Synced,
            },
        );

        let was = previous.map_or(SyncStatus::Uninitialized, |p| p.status);
        if was.is_ready() {
            tracing::trace!(pair = %pair, bids = book.bids().len(), asks = book.asks().len(), "Snapshot applied");
        } else {
            tracing::info!(pair = %pair, from = %was, bids = book.bids().len(), asks = book.asks().len(), "Order book synced");
        }

        book
    }

    /// Apply one level update to a synced book.
    ///
    /// Without a trusted snapshot the diff is rejected and nothing changes.
    pub fn apply_diff(
        &self,
        pair: &CurrencyPair,
        side: Side,
        price: Price,
        quantity: Quantity,
    ) -> Result<DiffOutcome, ReconcileError> {
        let mut books = self.books.lock();

        let entry = books
            .get_mut(pair)
            .filter(|entry| entry.status.is_ready())
            .ok_or_else(|| ReconcileError::Desync(pair.clone()))?;

        let change = Arc::make_mut(&mut entry.book).apply(side, price, quantity);

        Ok(DiffOutcome {
            change,
            book: Arc::clone(&entry.book),
        })
    }

    /// Distrust every book until its next snapshot. Returns how many were synced.
    pub fn mark_all_out_of_sync(&self) -> usize {
        let mut books = self.books.lock();
        let mut marked = 0;
        for (pair, entry) in books.iter_mut() {
            if entry.status == SyncStatus::Synced {
                entry.status = SyncStatus::OutOfSync;
                marked += 1;
                tracing::debug!(pair = %pair, "Order book marked out of sync");
            }
        }
        marked
    }

    /// Discard a pair's book
    pub fn remove(&self, pair: &CurrencyPair) -> bool {
        let removed = self.books.lock().remove(pair).is_some();
        if removed {
            tracing::debug!(pair = %pair, "Order book discarded");
        }
        removed
    }

    /// Latest trusted view, if the pair is synced
    pub fn current(&self, pair: &CurrencyPair) -> Option<Arc<OrderBook>> {
        self.books
            .lock()
            .get(pair)
            .filter(|entry| entry.status.is_ready())
            .map(|entry| Arc::clone(&entry.book))
    }

    pub fn status(&self, pair: &CurrencyPair) -> SyncStatus {
        self.books
            .lock()
            .get(pair)
            .map(|entry| entry.status)
            .unwrap_or(SyncStatus::Uninitialized)
    }

    /// Pairs with a stored book, synced or not
    pub fn pairs(&self) -> Vec<CurrencyPair> {
        self.books.lock().keys().cloned().collect()
    }

    pub fn clear(&self) {
        self.books.lock().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pair() -> CurrencyPair {
        CurrencyPair::new("X", "USDT")
    }

    fn lvl(price: &str, qty: &str) -> PriceLevel {
        PriceLevel::parse(price, qty).unwrap()
    }

    fn p(s: &str) -> Price {
        Price::parse(s).unwrap()
    }

    fn q(s: &str) -> Quantity {
        Quantity::parse(s).unwrap()
    }

    #[test]
    fn test_diff_without_snapshot_is_desync() {
        let reconciler = OrderBookReconciler::new();

        let result = reconciler.apply_diff(&pair(), Side::Bid, p("10"), q("1"));

        assert_eq!(result.unwrap_err(), ReconcileError::Desync(pair()));
        assert!(reconciler.current(&pair()).is_none());
        assert_eq!(reconciler.status(&pair()), SyncStatus::Uninitialized);
        assert!(reconciler.pairs().is_empty());
    }

    #[test]
    fn test_reference_scenario() {
        let reconciler = OrderBookReconciler::new();
        reconciler.apply_snapshot(
            &pair(),
            vec![lvl("10", "5"), lvl("9", "3")],
            vec![lvl("11", "2")],
        );

        let out = reconciler.apply_diff(&pair(), Side::Bid, p("10"), q("0")).unwrap();
        assert_eq!(out.change, LevelChange::Removed);
        assert_eq!(out.book.bids(), &[lvl("9", "3")]);

        let out = reconciler.apply_diff(&pair(), Side::Bid, p("9"), q("7")).unwrap();
        assert_eq!(out.change, LevelChange::Updated);
        assert_eq!(out.book.bids(), &[lvl("9", "7")]);

        let out = reconciler.apply_diff(&pair(), Side::Ask, p("10.5"), q("4")).unwrap();
        assert_eq!(out.change, LevelChange::Inserted);
        assert_eq!(out.book.asks(), &[lvl("10.5", "4"), lvl("11", "2")]);

        assert_eq!(reconciler.current(&pair()).unwrap(), out.book);
    }

    #[test]
    fn test_published_views_are_not_mutated() {
        let reconciler = OrderBookReconciler::new();
        let first = reconciler.apply_snapshot(&pair(), vec![lvl("10", "5")], vec![]);

        let second = reconciler.apply_diff(&pair(), Side::Bid, p("10"), q("1")).unwrap().book;

        assert_eq!(first.bids(), &[lvl("10", "5")]);
        assert_eq!(second.bids(), &[lvl("10", "1")]);
    }

    #[test]
    fn test_out_of_sync_until_fresh_snapshot() {
        let reconciler = OrderBookReconciler::new();
        reconciler.apply_snapshot(&pair(), vec![lvl("10", "5")], vec![lvl("11", "1")]);

        assert_eq!(reconciler.mark_all_out_of_sync(), 1);
        assert_eq!(reconciler.status(&pair()), SyncStatus::OutOfSync);
        assert!(reconciler.current(&pair()).is_none());
        assert!(reconciler.apply_diff(&pair(), Side::Bid, p("10"), q("2")).is_err());

        reconciler.apply_snapshot(&pair(), vec![lvl("9", "1")], vec![]);
        assert_eq!(reconciler.status(&pair()), SyncStatus::Synced);
        assert_eq!(reconciler.current(&pair()).unwrap().bids(), &[lvl("9", "1")]);
    }

    #[test]
    fn test_snapshot_normalizes_input() {
        let reconciler = OrderBookReconciler::new();
        let book = reconciler.apply_snapshot(
            &pair(),
            vec![lvl("9", "1"), lvl("10", "0"), lvl("9", "4"), lvl("11", "2")],
            vec![lvl("13", "1"), lvl("12", "1")],
        );

        assert_eq!(book.bids(), &[lvl("11", "2"), lvl("9", "4")]);
        assert_eq!(book.asks(), &[lvl("12", "1"), lvl("13", "1")]);
        assert!(book.is_consistent());
    }

    #[test]
    fn test_remove_discards_book() {
        let reconciler = OrderBookReconciler::new();
        reconciler.apply_snapshot(&pair(), vec![lvl("10", "5")], vec![]);

        assert!(reconciler.remove(&pair()));
        assert!(!reconciler.remove(&pair()));
        assert!(reconciler.current(&pair()).is_none());
    }
}
