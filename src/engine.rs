//! Engine - order-id front end over the arena and the book.
//!
//! The book works on arena slots. The engine is the caller that owns both:
//! it maps external order ids to slots, runs acquire -> populate ->
//! `limit_order` for a placement and `cancel_order` -> release for a cancel,
//! and turns accepted placements into `TradeEvent`s for the risk thread.

use rustc_hash::FxHashMap;

use crate::arena::{Arena, ArenaIndex};
use crate::command::{CancelOrder, Command, PlaceOrder, Side, TradeEvent};
use crate::error::BookError;
use crate::order_book::OrderBook;

/// Outcome of a successful cancel.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Canceled {
    pub order_id: u64,
    pub side: Side,
    pub price: u32,
    /// Quantity that was resting when the order was pulled
    pub canceled_qty: u32,
}

/// Single-threaded owner of the arena, the book and the order-id map.
pub struct Engine {
    /// Memory arena for order nodes
    pub arena: Arena,
    /// The resting order book
    pub book: OrderBook,
    /// Order lookup map: OrderId -> ArenaIndex
    orders: FxHashMap<u64, ArenaIndex>,
}

impl Engine {
    /// Create an engine with `capacity` order slots and `max_levels` price levels.
    pub fn new(capacity: u32, max_levels: u32) -> Self {
        Self {
            arena: Arena::new(capacity),
            book: OrderBook::new(max_levels),
            orders: FxHashMap::with_capacity_and_hasher(capacity as usize, Default::default()),
        }
    }

    /// Process a single command.
    ///
    /// Returns the event to forward downstream, if the command produced one.
    #[inline]
    pub fn process(&mut self, cmd: Command) -> Result<Option<TradeEvent>, BookError> {
        match cmd {
            Command::Place(order) => self.place(order).map(Some),
            Command::Cancel(cancel) => self.cancel(cancel).map(|_| None),
        }
    }

    /// Rest a new order.
    ///
    /// Validation happens before a slot is claimed, so a rejected order never
    /// touches the arena.
    pub fn place(&mut self, order: PlaceOrder) -> Result<TradeEvent, BookError> {
        if order.qty == 0 {
            return Err(BookError::InvalidQuantity);
        }
        self.book.check_price(order.price)?;
        if self.orders.contains_key(&order.order_id) {
            return Err(BookError::DuplicateOrderId(order.order_id));
        }

        let index = self.arena.acquire().ok_or(BookError::PoolExhausted {
            capacity: self.arena.capacity(),
        })?;
        self.arena
            .get_mut(index)
            .fill(order.order_id, order.side, order.price, order.qty, order.timestamp);

        if let Err(err) = self.book.limit_order(&mut self.arena, index) {
            self.arena.release(index);
            return Err(err);
        }
        self.orders.insert(order.order_id, index);

        Ok(TradeEvent::new(order.qty, order.price, order.side))
    }

    /// Pull a resting order and return its slot to the arena.
    pub fn cancel(&mut self, cancel: CancelOrder) -> Result<Canceled, BookError> {
        let index = self
            .orders
            .remove(&cancel.order_id)
            .ok_or(BookError::OrderNotFound(cancel.order_id))?;

        let node = self.arena.get(index);
        let canceled = Canceled {
            order_id: cancel.order_id,
            side: node.side,
            price: node.price,
            canceled_qty: node.qty,
        };

        self.book.cancel_order(&mut self.arena, index)?;
        self.arena.release(index);
        Ok(canceled)
    }

    /// Arena slot holding a resting order.
    #[inline]
    pub fn slot_of(&self, order_id: u64) -> Option<ArenaIndex> {
        self.orders.get(&order_id).copied()
    }

    /// Check if an order is resting.
    #[inline]
    pub fn contains_order(&self, order_id: u64) -> bool {
        self.orders.contains_key(&order_id)
    }

    // ========================================================================
    // Utility Methods
    // ========================================================================

    /// Get the best bid level
    #[inline]
    pub fn best_bid(&self) -> Option<u32> {
        self.book.best_bid()
    }

    /// Get the best ask level
    #[inline]
    pub fn best_ask(&self) -> Option<u32> {
        self.book.best_ask()
    }

    /// Get the spread
    #[inline]
    pub fn spread(&self) -> Option<u32> {
        self.book.spread()
    }

    /// Get total order count
    #[inline]
    pub fn order_count(&self) -> usize {
        self.book.order_count()
    }

    /// Warm up the engine by pre-faulting memory pages.
    pub fn warm_up(&mut self) {
        self.arena.warm_up();
    }

    /// Compute a hash of the current state (for determinism testing)
    pub fn state_hash(&self) -> u64 {
        use std::collections::hash_map::DefaultHasher;
        use std::hash::{Hash, Hasher};

        let mut hasher = DefaultHasher::new();

        self.book.best_bid().hash(&mut hasher);
        self.book.best_ask().hash(&mut hasher);
        self.book.order_count().hash(&mut hasher);
        self.arena.allocated().hash(&mut hasher);

        // Every occupied level, in queue order
        for side in [Side::Bid, Side::Ask] {
            for (price, qty, count) in self.book.depth(side, usize::MAX) {
                (side, price, qty, count).hash(&mut hasher);
                if let Some(level) = self.book.level(side, price) {
                    for index in level.iter(&self.arena) {
                        self.arena.get(index).order_id.hash(&mut hasher);
                    }
                }
            }
        }

        hasher.finish()
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new(1_000_000, crate::order_book::DEFAULT_MAX_LEVELS)
    }
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("arena", &self.arena)
            .field("book", &self.book)
            .finish()
    }
}
