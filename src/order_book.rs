//! Order Book - price-indexed resting order book.
//!
//! Each side is a fixed table of `PriceLevel`s addressed directly by the
//! discretized price, plus a `LevelIndex` marking which levels hold volume.
//! Best bid is the highest occupied bid level, best ask the lowest occupied
//! ask level; both are found by bit-scan without walking the tables.
//!
//! The book only rests and cancels orders. It never crosses an incoming
//! order against the opposite side, and it never releases arena slots.

use crate::arena::{Arena, ArenaIndex};
use crate::command::Side;
use crate::error::BookError;
use crate::level_index::LevelIndex;
use crate::price_level::PriceLevel;

/// Default number of discrete price levels per side.
pub const DEFAULT_MAX_LEVELS: u32 = 10_000;

/// Dense Order Book using flat tables for price levels.
///
/// Invariant: for every level `i` on either side, the index bit for `i` is set
/// iff `table[i].total_qty > 0`.
pub struct OrderBook {
    /// Bid price levels (buy orders); higher index = better
    bids: Box<[PriceLevel]>,
    /// Ask price levels (sell orders); lower index = better
    asks: Box<[PriceLevel]>,
    /// Occupied bid levels
    bid_index: LevelIndex,
    /// Occupied ask levels
    ask_index: LevelIndex,
    /// Table size per side
    max_levels: u32,
    /// Number of resting orders across both sides
    order_count: usize,
}

impl OrderBook {
    /// Create an empty book addressing prices `[0, max_levels)`.
    pub fn new(max_levels: u32) -> Self {
        let len = max_levels as usize;
        Self {
            bids: vec![PriceLevel::new(); len].into_boxed_slice(),
            asks: vec![PriceLevel::new(); len].into_boxed_slice(),
            bid_index: LevelIndex::new(len),
            ask_index: LevelIndex::new(len),
            max_levels,
            order_count: 0,
        }
    }

    /// Number of addressable price levels per side.
    #[inline]
    pub fn max_levels(&self) -> u32 {
        self.max_levels
    }

    /// Validate a discretized price against the table bounds.
    #[inline]
    pub fn check_price(&self, price: u32) -> Result<usize, BookError> {
        if price < self.max_levels {
            Ok(price as usize)
        } else {
            Err(BookError::InvalidPriceLevel {
                price,
                max_levels: self.max_levels,
            })
        }
    }

    #[inline]
    fn side_mut(&mut self, side: Side) -> (&mut [PriceLevel], &mut LevelIndex) {
        match side {
            Side::Bid => (&mut self.bids[..], &mut self.bid_index),
            Side::Ask => (&mut self.asks[..], &mut self.ask_index),
        }
    }

    #[inline]
    fn side_ref(&self, side: Side) -> (&[PriceLevel], &LevelIndex) {
        match side {
            Side::Bid => (&self.bids[..], &self.bid_index),
            Side::Ask => (&self.asks[..], &self.ask_index),
        }
    }

    // ========================================================================
    // Order Management
    // ========================================================================

    /// Rest the order held in arena slot `index`.
    ///
    /// Reads side, price and quantity from the slot, appends it to its level
    /// and marks the level occupied if it was empty. The slot must be acquired,
    /// populated and not already queued.
    ///
    /// # Complexity
    /// O(1)
    pub fn limit_order(&mut self, arena: &mut Arena, index: ArenaIndex) -> Result<(), BookError> {
        let node = arena.get(index);
        let (side, price, qty) = (node.side, node.price, node.qty);
        let slot = self.check_price(price)?;
        if qty == 0 {
            return Err(BookError::InvalidQuantity);
        }

        let (levels, occupied) = self.side_mut(side);
        let level = &mut levels[slot];
        let was_empty = level.total_qty == 0;
        level.add_order(arena, index);
        if was_empty {
            occupied.set(slot);
        }

        self.order_count += 1;
        Ok(())
    }

    /// Unlink the order held in arena slot `index` from its level.
    ///
    /// Clears the level's occupancy bit once its volume drops to zero. The
    /// slot stays allocated; releasing it is the caller's job.
    ///
    /// # Complexity
    /// O(1)
    pub fn cancel_order(&mut self, arena: &mut Arena, index: ArenaIndex) -> Result<(), BookError> {
        let node = arena.get(index);
        let (side, price) = (node.side, node.price);
        let slot = self.check_price(price)?;

        let (levels, occupied) = self.side_mut(side);
        let level = &mut levels[slot];
        level.remove_order(arena, index);
        if level.total_qty == 0 {
            occupied.clear(slot);
        }

        self.order_count -= 1;
        Ok(())
    }

    // ========================================================================
    // Best Price Access
    // ========================================================================

    /// Get the best bid level (highest occupied bid index)
    #[inline]
    pub fn best_bid(&self) -> Option<u32> {
        self.bid_index.highest().map(|i| i as u32)
    }

    /// Get the best ask level (lowest occupied ask index)
    #[inline]
    pub fn best_ask(&self) -> Option<u32> {
        self.ask_index.lowest().map(|i| i as u32)
    }

    /// Get the best price on a given side
    #[inline]
    pub fn best_price(&self, side: Side) -> Option<u32> {
        match side {
            Side::Bid => self.best_bid(),
            Side::Ask => self.best_ask(),
        }
    }

    /// Calculate spread (best_ask - best_bid), if the book is not crossed
    pub fn spread(&self) -> Option<u32> {
        match (self.best_bid(), self.best_ask()) {
            (Some(bid), Some(ask)) if ask > bid => Some(ask - bid),
            _ => None,
        }
    }

    // ========================================================================
    // Level Access
    // ========================================================================

    /// Get a price level, or `None` if the price is out of range
    #[inline]
    pub fn level(&self, side: Side, price: u32) -> Option<&PriceLevel> {
        let (levels, _) = self.side_ref(side);
        levels.get(price as usize)
    }

    /// Returns true if the level's occupancy bit is set
    #[inline]
    pub fn is_level_occupied(&self, side: Side, price: u32) -> bool {
        let (_, occupied) = self.side_ref(side);
        occupied.contains(price as usize)
    }

    /// Get depth at a price level as (total quantity, order count)
    pub fn depth_at(&self, side: Side, price: u32) -> (u64, u32) {
        self.level(side, price)
            .map(|l| (l.total_qty, l.count))
            .unwrap_or((0, 0))
    }

    /// Top `n` occupied levels on one side, best first, as
    /// (price, total quantity, order count).
    pub fn depth(&self, side: Side, n: usize) -> Vec<(u32, u64, u32)> {
        let (levels, occupied) = self.side_ref(side);
        let snapshot = |i: usize| {
            let level = &levels[i];
            (i as u32, level.total_qty, level.count)
        };
        match side {
            Side::Bid => occupied.iter_descending().take(n).map(snapshot).collect(),
            Side::Ask => occupied.iter_ascending().take(n).map(snapshot).collect(),
        }
    }

    /// Number of occupied levels on one side
    pub fn level_count(&self, side: Side) -> usize {
        let (_, occupied) = self.side_ref(side);
        occupied.count()
    }

    // ========================================================================
    // Utility Methods
    // ========================================================================

    /// Get the total number of resting orders
    #[inline]
    pub fn order_count(&self) -> usize {
        self.order_count
    }

    /// Check if the book is empty
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.order_count == 0
    }
}

impl Default for OrderBook {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_LEVELS)
    }
}

impl std::fmt::Debug for OrderBook {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OrderBook")
            .field("max_levels", &self.max_levels)
            .field("best_bid", &self.best_bid())
            .field("best_ask", &self.best_ask())
            .field("order_count", &self.order_count)
            .finish()
    }
}
