//! Price Level - A FIFO queue of orders at a single price point.
//!
//! Implements a doubly-linked list using arena indices for O(1)
//! append and O(1) removal from an arbitrary position.

use crate::arena::{Arena, ArenaIndex, NULL_INDEX};

/// A queue of orders at a specific price level.
///
/// Orders are kept in arrival order (price-time priority).
/// The doubly-linked structure enables O(1) cancel from any position.
///
/// Invariant: walking `next` from `head` reaches `tail` in exactly `count`
/// steps, and `total_qty` is the sum of the member orders' quantities.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PriceLevel {
    /// Index of the oldest order (highest priority)
    pub head: ArenaIndex,
    /// Index of the newest order
    pub tail: ArenaIndex,
    /// Total quantity across all orders at this level
    pub total_qty: u64,
    /// Number of orders at this level
    pub count: u32,
}

impl PriceLevel {
    /// Create a new empty price level
    #[inline]
    pub const fn new() -> Self {
        Self {
            head: NULL_INDEX,
            tail: NULL_INDEX,
            total_qty: 0,
            count: 0,
        }
    }

    /// Returns true if there are no orders at this level
    #[inline]
    pub const fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Append an order to the tail of the queue (newest order).
    ///
    /// The caller guarantees the order belongs to this level's price and side.
    ///
    /// # Complexity
    /// O(1)
    #[inline]
    pub fn add_order(&mut self, arena: &mut Arena, index: ArenaIndex) {
        let node = arena.get(index);
        debug_assert!(node.is_allocated(), "slot {index} is not allocated");
        debug_assert!(!node.is_linked(), "slot {index} is already queued");
        let qty = node.qty;

        if self.tail == NULL_INDEX {
            // Empty list: new node becomes both head and tail
            debug_assert!(self.head == NULL_INDEX);
            self.head = index;
            self.tail = index;
            let node = arena.get_mut(index);
            node.prev = NULL_INDEX;
            node.next = NULL_INDEX;
        } else {
            // Append to existing tail
            arena.get_mut(self.tail).next = index;
            let node = arena.get_mut(index);
            node.prev = self.tail;
            node.next = NULL_INDEX;
            self.tail = index;
        }

        arena.get_mut(index).set_linked(true);
        self.count += 1;
        self.total_qty += qty as u64;
    }

    /// Unlink an order from anywhere in the queue (for cancel).
    ///
    /// Handles all edge cases:
    /// - Only node in level (head == tail)
    /// - Removing head
    /// - Removing tail
    /// - Removing from middle
    ///
    /// The removed node's links are reset to `NULL_INDEX`, so the slot can be
    /// released straight back to the arena.
    ///
    /// # Returns
    /// `true` if the level is now empty, `false` otherwise.
    /// The order is NOT released from the arena; caller must do that.
    ///
    /// # Complexity
    /// O(1)
    #[inline]
    pub fn remove_order(&mut self, arena: &mut Arena, index: ArenaIndex) -> bool {
        let node = arena.get(index);
        debug_assert!(node.is_linked(), "slot {index} is not queued");
        let prev_idx = node.prev;
        let next_idx = node.next;
        let qty = node.qty;

        if prev_idx == NULL_INDEX {
            debug_assert!(self.head == index, "slot {index} is not queued at this level");
            self.head = next_idx;
        } else {
            arena.get_mut(prev_idx).next = next_idx;
        }

        if next_idx == NULL_INDEX {
            debug_assert!(self.tail == index, "slot {index} is not queued at this level");
            self.tail = prev_idx;
        } else {
            arena.get_mut(next_idx).prev = prev_idx;
        }

        self.count -= 1;
        self.total_qty -= qty as u64;

        let node = arena.get_mut(index);
        node.prev = NULL_INDEX;
        node.next = NULL_INDEX;
        node.set_linked(false);

        self.count == 0
    }

    /// Peek at the head order without removing it.
    ///
    /// # Returns
    /// Index of the head order, or `NULL_INDEX` if empty.
    #[inline]
    pub const fn peek_head(&self) -> ArenaIndex {
        self.head
    }

    /// Walk the queue front-to-back (oldest first).
    pub fn iter<'a>(&self, arena: &'a Arena) -> LevelIter<'a> {
        LevelIter {
            arena,
            cursor: self.head,
        }
    }
}

impl Default for PriceLevel {
    fn default() -> Self {
        Self::new()
    }
}

/// Front-to-back iterator over the slots queued at one level.
pub struct LevelIter<'a> {
    arena: &'a Arena,
    cursor: ArenaIndex,
}

impl Iterator for LevelIter<'_> {
    type Item = ArenaIndex;

    #[inline]
    fn next(&mut self) -> Option<ArenaIndex> {
        if self.cursor == NULL_INDEX {
            return None;
        }
        let index = self.cursor;
        self.cursor = self.arena.get(index).next;
        Some(index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arena::Arena;
    use crate::command::Side;

    fn setup_arena_with_orders(arena: &mut Arena, count: u32) -> Vec<ArenaIndex> {
        let mut indices = Vec::new();
        for i in 0..count {
            let idx = arena.acquire().unwrap();
            arena.get_mut(idx).fill(i as u64, Side::Bid, 100, 100, i as u64);
            indices.push(idx);
        }
        indices
    }

    #[test]
    fn test_empty_level() {
        let level = PriceLevel::new();
        assert!(level.is_empty());
        assert_eq!(level.count, 0);
        assert_eq!(level.total_qty, 0);
        assert_eq!(level.head, NULL_INDEX);
        assert_eq!(level.tail, NULL_INDEX);
    }

    #[test]
    fn test_add_single() {
        let mut arena = Arena::new(10);
        let mut level = PriceLevel::new();

        let idx = arena.acquire().unwrap();
        arena.get_mut(idx).qty = 100;

        level.add_order(&mut arena, idx);

        assert!(!level.is_empty());
        assert_eq!(level.count, 1);
        assert_eq!(level.total_qty, 100);
        assert_eq!(level.head, idx);
        assert_eq!(level.tail, idx);
        assert!(arena.get(idx).is_linked());
    }

    #[test]
    fn test_add_multiple_fifo() {
        let mut arena = Arena::new(10);
        let mut level = PriceLevel::new();
        let indices = setup_arena_with_orders(&mut arena, 3);

        for &idx in &indices {
            level.add_order(&mut arena, idx);
        }

        assert_eq!(level.count, 3);
        assert_eq!(level.total_qty, 300);
        assert_eq!(level.head, indices[0]);
        assert_eq!(level.tail, indices[2]);

        // Verify linkage
        assert_eq!(arena.get(indices[0]).next, indices[1]);
        assert_eq!(arena.get(indices[1]).prev, indices[0]);
        assert_eq!(arena.get(indices[1]).next, indices[2]);
        assert_eq!(arena.get(indices[2]).prev, indices[1]);

        let walked: Vec<_> = level.iter(&arena).collect();
        assert_eq!(walked, indices);
    }

    #[test]
    fn test_remove_only_node() {
        let mut arena = Arena::new(10);
        let mut level = PriceLevel::new();

        let idx = arena.acquire().unwrap();
        arena.get_mut(idx).qty = 100;
        level.add_order(&mut arena, idx);

        let is_empty = level.remove_order(&mut arena, idx);

        assert!(is_empty);
        assert!(level.is_empty());
        assert_eq!(level.total_qty, 0);
        assert_eq!(level.head, NULL_INDEX);
        assert_eq!(level.tail, NULL_INDEX);
        assert!(!arena.get(idx).is_linked());
    }

    #[test]
    fn test_remove_head() {
        let mut arena = Arena::new(10);
        let mut level = PriceLevel::new();
        let indices = setup_arena_with_orders(&mut arena, 3);

        for &idx in &indices {
            level.add_order(&mut arena, idx);
        }

        let is_empty = level.remove_order(&mut arena, indices[0]);

        assert!(!is_empty);
        assert_eq!(level.count, 2);
        assert_eq!(level.head, indices[1]);
        assert_eq!(arena.get(indices[1]).prev, NULL_INDEX);
    }

    #[test]
    fn test_remove_tail() {
        let mut arena = Arena::new(10);
        let mut level = PriceLevel::new();
        let indices = setup_arena_with_orders(&mut arena, 3);

        for &idx in &indices {
            level.add_order(&mut arena, idx);
        }

        let is_empty = level.remove_order(&mut arena, indices[2]);

        assert!(!is_empty);
        assert_eq!(level.count, 2);
        assert_eq!(level.tail, indices[1]);
        assert_eq!(arena.get(indices[1]).next, NULL_INDEX);
    }

    #[test]
    fn test_remove_middle_preserves_time_priority() {
        let mut arena = Arena::new(10);
        let mut level = PriceLevel::new();
        let indices = setup_arena_with_orders(&mut arena, 3);
        let (a, b, c) = (indices[0], indices[1], indices[2]);

        for &idx in &indices {
            level.add_order(&mut arena, idx);
        }

        let is_empty = level.remove_order(&mut arena, b);

        assert!(!is_empty);
        assert_eq!(level.count, 2);
        assert_eq!(level.total_qty, 200);
        assert_eq!(arena.get(a).next, c);
        assert_eq!(arena.get(c).prev, a);
        assert_eq!(arena.get(b).next, NULL_INDEX);
        assert_eq!(arena.get(b).prev, NULL_INDEX);

        let walked: Vec<_> = level.iter(&arena).collect();
        assert_eq!(walked, vec![a, c]);
    }

    #[test]
    fn test_removed_slot_can_be_released_and_requeued() {
        let mut arena = Arena::new(2);
        let mut level = PriceLevel::new();
        let indices = setup_arena_with_orders(&mut arena, 2);

        for &idx in &indices {
            level.add_order(&mut arena, idx);
        }
        level.remove_order(&mut arena, indices[0]);
        arena.release(indices[0]);

        let idx = arena.acquire().unwrap();
        arena.get_mut(idx).qty = 7;
        level.add_order(&mut arena, idx);

        let walked: Vec<_> = level.iter(&arena).collect();
        assert_eq!(walked, vec![indices[1], idx]);
        assert_eq!(level.total_qty, 107);
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "not queued")]
    fn test_remove_unlinked_panics_in_debug() {
        let mut arena = Arena::new(2);
        let mut level = PriceLevel::new();
        let idx = arena.acquire().unwrap();
        level.remove_order(&mut arena, idx);
    }
}
