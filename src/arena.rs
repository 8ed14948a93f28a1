//! Order Arena - fixed-capacity pool of cache-line aligned order records.
//!
//! The arena pre-allocates every order record at startup, eliminating heap
//! allocation in the hot path. Free slots are tracked on a stack of indices,
//! giving O(1) acquire and release. Exhaustion is an ordinary outcome
//! (`acquire` returns `None`), never a reallocation.

use std::fmt;

use crate::command::Side;

/// Sentinel value representing a null/unlinked index (like nullptr)
pub const NULL_INDEX: u32 = u32::MAX;

/// Type alias for arena indices - our "compressed pointers"
/// Using u32 instead of 64-bit pointers halves metadata size,
/// doubling cache efficiency.
pub type ArenaIndex = u32;

/// Slot is handed out by `acquire` and not yet released.
const FLAG_ALLOCATED: u8 = 0b01;
/// Slot is linked into a price level queue.
const FLAG_LINKED: u8 = 0b10;

/// A single order record - exactly 64 bytes (one cache line).
///
/// # Memory Layout
///
/// | Field      | Type    | Offset | Size |
/// |------------|---------|--------|------|
/// | order_id   | u64     | 0      | 8    |
/// | timestamp  | u64     | 8      | 8    |
/// | price      | u32     | 16     | 4    |
/// | qty        | u32     | 20     | 4    |
/// | next       | u32     | 24     | 4    |
/// | prev       | u32     | 28     | 4    |
/// | side       | u8      | 32     | 1    |
/// | flags      | u8      | 33     | 1    |
/// | _reserved  | [u8;30] | 34     | 30   |
/// | **Total**  |         |        | 64   |
#[repr(C)]
#[repr(align(64))]
#[derive(Clone, Copy)]
pub struct OrderNode {
    // === Order Data (populated by the caller after acquire) ===

    /// External order ID (for client tracking)
    pub order_id: u64,

    /// Arrival timestamp in nanoseconds
    pub timestamp: u64,

    /// Discretized price level
    pub price: u32,

    /// Resting quantity
    pub qty: u32,

    // === Linkage (FIFO queue pointers within a PriceLevel) ===

    /// Index of next order at same price level
    pub next: ArenaIndex,

    /// Index of previous order (enables O(1) cancel)
    pub prev: ArenaIndex,

    /// Order side
    pub side: Side,

    /// Allocation/linkage state, maintained by the arena and the queues
    flags: u8,

    _reserved: [u8; 30],
}

// Compile-time assertion: OrderNode must be exactly 64 bytes
const _: () = assert!(
    std::mem::size_of::<OrderNode>() == 64,
    "OrderNode must be exactly 64 bytes (one cache line)"
);

// Compile-time assertion: OrderNode must be 64-byte aligned
const _: () = assert!(
    std::mem::align_of::<OrderNode>() == 64,
    "OrderNode must be 64-byte aligned"
);

impl OrderNode {
    /// Create an empty/unlinked node
    #[inline]
    pub const fn empty() -> Self {
        Self {
            order_id: 0,
            timestamp: 0,
            price: 0,
            qty: 0,
            next: NULL_INDEX,
            prev: NULL_INDEX,
            side: Side::Bid,
            flags: 0,
            _reserved: [0u8; 30],
        }
    }

    /// Fill the order fields in one go.
    #[inline]
    pub fn fill(&mut self, order_id: u64, side: Side, price: u32, qty: u32, timestamp: u64) {
        self.order_id = order_id;
        self.side = side;
        self.price = price;
        self.qty = qty;
        self.timestamp = timestamp;
    }

    /// Returns true while the node sits in a price level queue.
    #[inline]
    pub const fn is_linked(&self) -> bool {
        self.flags & FLAG_LINKED != 0
    }

    /// Returns true between `acquire` and `release`.
    #[inline]
    pub const fn is_allocated(&self) -> bool {
        self.flags & FLAG_ALLOCATED != 0
    }

    #[inline]
    pub(crate) fn set_linked(&mut self, linked: bool) {
        if linked {
            self.flags |= FLAG_LINKED;
        } else {
            self.flags &= !FLAG_LINKED;
        }
    }

    /// Reset the node for reuse (when returning to the free stack)
    #[inline]
    fn reset(&mut self) {
        *self = Self::empty();
    }
}

impl fmt::Debug for OrderNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OrderNode")
            .field("order_id", &self.order_id)
            .field("side", &self.side)
            .field("price", &self.price)
            .field("qty", &self.qty)
            .field("timestamp", &self.timestamp)
            .field("prev", &self.prev)
            .field("next", &self.next)
            .field("linked", &self.is_linked())
            .finish()
    }
}

/// Pre-allocated order pool with O(1) acquire and release.
///
/// A slot index is either free (present exactly once on the free stack) or
/// in use (absent from the stack). The pool is owned by a single thread and
/// performs no synchronization.
pub struct Arena {
    /// Contiguous block of pre-allocated nodes
    nodes: Vec<OrderNode>,

    /// Stack of free slot indices; the top is handed out next
    free: Vec<ArenaIndex>,

    /// Total capacity
    capacity: u32,
}

impl Arena {
    /// Create a new arena with the specified capacity.
    ///
    /// # Panics
    /// Panics if capacity reaches `NULL_INDEX` (reserved as the sentinel)
    pub fn new(capacity: u32) -> Self {
        assert!(capacity < NULL_INDEX, "Capacity must be less than NULL_INDEX");

        let nodes = vec![OrderNode::empty(); capacity as usize];

        // Filled backwards so the lowest indices are handed out first
        let free: Vec<ArenaIndex> = (0..capacity).rev().collect();

        Self { nodes, free, capacity }
    }

    /// Claim a free slot.
    ///
    /// Returns `None` if every slot is in use.
    ///
    /// # Complexity
    /// O(1) - pops the free stack
    #[inline]
    pub fn acquire(&mut self) -> Option<ArenaIndex> {
        let index = self.free.pop()?;
        let node = &mut self.nodes[index as usize];
        debug_assert!(!node.is_allocated(), "slot {index} handed out twice");
        debug_assert!(node.next == NULL_INDEX && node.prev == NULL_INDEX);
        node.flags = FLAG_ALLOCATED;
        Some(index)
    }

    /// Return a slot to the pool.
    ///
    /// The caller must have unlinked the slot from its price level first.
    /// Releasing a linked or already-free slot is a contract violation and
    /// trips a debug assertion.
    ///
    /// # Complexity
    /// O(1) - pushes the free stack
    #[inline]
    pub fn release(&mut self, index: ArenaIndex) {
        debug_assert!(index < self.capacity, "Index out of bounds");
        let node = &mut self.nodes[index as usize];
        debug_assert!(node.is_allocated(), "double release of slot {index}");
        debug_assert!(!node.is_linked(), "slot {index} released while still queued");

        node.reset();
        self.free.push(index);
    }

    /// Get an immutable reference to a node.
    ///
    /// # Complexity
    /// O(1) - direct array access
    #[inline]
    pub fn get(&self, index: ArenaIndex) -> &OrderNode {
        debug_assert!(index < self.capacity, "Index out of bounds");
        &self.nodes[index as usize]
    }

    /// Get a mutable reference to a node.
    ///
    /// # Complexity
    /// O(1) - direct array access
    #[inline]
    pub fn get_mut(&mut self, index: ArenaIndex) -> &mut OrderNode {
        debug_assert!(index < self.capacity, "Index out of bounds");
        &mut self.nodes[index as usize]
    }

    /// Returns the number of slots currently in use.
    #[inline]
    pub fn allocated(&self) -> u32 {
        self.capacity - self.free.len() as u32
    }

    /// Returns the number of free slots.
    #[inline]
    pub fn available(&self) -> u32 {
        self.free.len() as u32
    }

    /// Returns the total capacity of the arena.
    #[inline]
    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    /// Returns true if no slot is in use.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.free.len() == self.capacity as usize
    }

    /// Returns true if no slot is free.
    #[inline]
    pub fn is_full(&self) -> bool {
        self.free.is_empty()
    }

    /// Pre-fault all memory pages (warm-up routine).
    ///
    /// Walks through all nodes to force the OS to map virtual pages
    /// to physical RAM, preventing page faults in the hot path.
    pub fn warm_up(&mut self) {
        for node in &mut self.nodes {
            // SAFETY: `node` is a valid, exclusively borrowed reference.
            unsafe {
                std::ptr::write_volatile(&mut node._reserved[0], 0);
            }
        }
    }
}

impl fmt::Debug for Arena {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Arena")
            .field("capacity", &self.capacity)
            .field("allocated", &self.allocated())
            .finish()
    }
}
