//! Event Channel - bounded lock-free single-producer/single-consumer ring.
//!
//! The channel is split into a [`Producer`] and a [`Consumer`] handle. Neither
//! handle is `Clone` and both mutate through `&mut self`, so the "exactly one
//! writer, exactly one reader" precondition is enforced by the type system.
//!
//! # Memory ordering
//!
//! Each side owns one cursor. A side reads its own cursor with `Relaxed`
//! (nobody else writes it) and publishes it with `Release` after touching the
//! slot. The other side reads it with `Acquire`, so observing an advanced
//! producer cursor guarantees the slot write is visible, and observing an
//! advanced consumer cursor guarantees the slot read has completed before the
//! producer overwrites it.
//!
//! Both cursors advance modulo `2 * capacity`, which distinguishes "full"
//! from "empty" without sacrificing a slot: a capacity `K` channel holds `K`
//! values. Each handle caches the last observed value of the opposite cursor
//! and only reloads it when the cached value says full (or empty).

use std::cell::UnsafeCell;
use std::fmt;
use std::mem::MaybeUninit;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use crossbeam::utils::CachePadded;
use thiserror::Error;

/// Returned by [`Producer::push`] when every slot is occupied; carries the
/// rejected value back to the caller.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ChannelFull<T>(pub T);

impl<T> fmt::Display for ChannelFull<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("event channel full")
    }
}

impl<T: fmt::Debug> std::error::Error for ChannelFull<T> {}

/// Returned by [`Consumer::pop`] when no value has been published.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
#[error("event channel empty")]
pub struct ChannelEmpty;

/// Shared state of the ring. Cursors live on separate cache lines.
pub struct EventChannel<T> {
    /// Consumer cursor: next slot to read
    head: CachePadded<AtomicUsize>,
    /// Producer cursor: next slot to write
    tail: CachePadded<AtomicUsize>,
    producer_dropped: AtomicBool,
    consumer_dropped: AtomicBool,
    buffer: Box<[UnsafeCell<MaybeUninit<T>>]>,
    capacity: usize,
}

// SAFETY: each slot is accessed by exactly one side at a time; ownership of a
// slot is handed over through the Release/Acquire cursor exchange.
unsafe impl<T: Send> Sync for EventChannel<T> {}
unsafe impl<T: Send> Send for EventChannel<T> {}

impl<T: Copy + Send> EventChannel<T> {
    /// Create a channel holding up to `capacity` values and split it.
    ///
    /// # Panics
    /// Panics if `capacity` is zero or `2 * capacity` overflows.
    pub fn with_capacity(capacity: usize) -> (Producer<T>, Consumer<T>) {
        assert!(capacity > 0, "channel capacity must be non-zero");
        assert!(capacity <= usize::MAX / 2, "channel capacity too large");

        let buffer = (0..capacity)
            .map(|_| UnsafeCell::new(MaybeUninit::uninit()))
            .collect();
        let shared = Arc::new(EventChannel {
            head: CachePadded::new(AtomicUsize::new(0)),
            tail: CachePadded::new(AtomicUsize::new(0)),
            producer_dropped: AtomicBool::new(false),
            consumer_dropped: AtomicBool::new(false),
            buffer,
            capacity,
        });

        let producer = Producer {
            shared: Arc::clone(&shared),
            cached_head: 0,
        };
        let consumer = Consumer {
            shared,
            cached_tail: 0,
        };
        (producer, consumer)
    }
}

impl<T> EventChannel<T> {
    #[inline]
    fn advance(&self, cursor: usize) -> usize {
        if cursor < 2 * self.capacity - 1 {
            cursor + 1
        } else {
            0
        }
    }

    #[inline]
    fn distance(&self, head: usize, tail: usize) -> usize {
        if head <= tail {
            tail - head
        } else {
            2 * self.capacity - head + tail
        }
    }

    #[inline]
    fn slot(&self, cursor: usize) -> *mut MaybeUninit<T> {
        let index = if cursor < self.capacity {
            cursor
        } else {
            cursor - self.capacity
        };
        self.buffer[index].get()
    }

    #[inline]
    fn len(&self) -> usize {
        let head = self.head.load(Ordering::Acquire);
        let tail = self.tail.load(Ordering::Acquire);
        self.distance(head, tail)
    }
}

/// Writing half. Owned by exactly one thread.
pub struct Producer<T> {
    shared: Arc<EventChannel<T>>,
    /// Last observed consumer cursor
    cached_head: usize,
}

impl<T: Copy> Producer<T> {
    /// Publish a value without blocking.
    ///
    /// Fails with the value handed back when the channel is full; the caller
    /// picks the retry/drop policy.
    #[inline]
    pub fn push(&mut self, value: T) -> Result<(), ChannelFull<T>> {
        let shared = &*self.shared;
        let tail = shared.tail.load(Ordering::Relaxed);

        if shared.distance(self.cached_head, tail) == shared.capacity {
            self.cached_head = shared.head.load(Ordering::Acquire);
            if shared.distance(self.cached_head, tail) == shared.capacity {
                return Err(ChannelFull(value));
            }
        }

        // SAFETY: the slot at `tail` is outside [head, tail) so the consumer
        // cannot be reading it, and only this producer writes.
        unsafe { (*shared.slot(tail)).write(value) };
        shared.tail.store(shared.advance(tail), Ordering::Release);
        Ok(())
    }

    /// Number of free slots, as currently visible to the producer.
    pub fn slots(&self) -> usize {
        self.shared.capacity - self.shared.len()
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.shared.capacity
    }

    /// Returns true once the consumer has been dropped.
    pub fn is_abandoned(&self) -> bool {
        self.shared.consumer_dropped.load(Ordering::Acquire)
    }
}

impl<T> Drop for Producer<T> {
    fn drop(&mut self) {
        self.shared.producer_dropped.store(true, Ordering::Release);
    }
}

impl<T> fmt::Debug for Producer<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Producer")
            .field("capacity", &self.shared.capacity)
            .field("len", &self.shared.len())
            .finish()
    }
}

/// Reading half. Owned by exactly one thread.
pub struct Consumer<T> {
    shared: Arc<EventChannel<T>>,
    /// Last observed producer cursor
    cached_tail: usize,
}

impl<T: Copy> Consumer<T> {
    /// Take the oldest published value without blocking.
    #[inline]
    pub fn pop(&mut self) -> Result<T, ChannelEmpty> {
        let shared = &*self.shared;
        let head = shared.head.load(Ordering::Relaxed);

        if head == self.cached_tail {
            self.cached_tail = shared.tail.load(Ordering::Acquire);
            if head == self.cached_tail {
                return Err(ChannelEmpty);
            }
        }

        // SAFETY: `head` is inside [head, tail), so the producer has finished
        // writing it (Acquire on tail) and will not touch it until we publish
        // the advanced head.
        let value = unsafe { (*shared.slot(head)).assume_init_read() };
        shared.head.store(shared.advance(head), Ordering::Release);
        Ok(value)
    }

    /// Number of values waiting, as currently visible to the consumer.
    pub fn len(&self) -> usize {
        self.shared.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.shared.capacity
    }

    /// Returns true once the producer has been dropped.
    ///
    /// Values pushed before the drop are still readable; a consumer that sees
    /// `true` here and then an empty `pop` has drained everything.
    pub fn is_abandoned(&self) -> bool {
        self.shared.producer_dropped.load(Ordering::Acquire)
    }
}

impl<T> Drop for Consumer<T> {
    fn drop(&mut self) {
        self.shared.consumer_dropped.store(true, Ordering::Release);
    }
}

impl<T> fmt::Debug for Consumer<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Consumer")
            .field("capacity", &self.shared.capacity)
            .field("len", &self.shared.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::{Side, TradeEvent};

    #[test]
    fn test_empty_pop() {
        let (_tx, mut rx) = EventChannel::<u32>::with_capacity(4);
        assert_eq!(rx.pop(), Err(ChannelEmpty));
        assert!(rx.is_empty());
    }

    #[test]
    fn test_capacity_k_holds_k_values() {
        const K: usize = 4;
        let (mut tx, mut rx) = EventChannel::with_capacity(K);

        for i in 0..K as u32 {
            assert!(tx.push(i).is_ok(), "push {i} should fit");
        }
        assert_eq!(tx.push(99), Err(ChannelFull(99)));
        assert_eq!(tx.slots(), 0);
        assert_eq!(rx.len(), K);

        for i in 0..K as u32 {
            assert_eq!(rx.pop(), Ok(i));
        }
        assert_eq!(rx.pop(), Err(ChannelEmpty));

        // Wrap-around after a full drain
        assert!(tx.push(100).is_ok());
        assert_eq!(rx.pop(), Ok(100));
    }

    #[test]
    fn test_wraps_many_times() {
        let (mut tx, mut rx) = EventChannel::with_capacity(3);
        for round in 0..50u32 {
            for j in 0..2 {
                tx.push(round * 10 + j).unwrap();
            }
            for j in 0..2 {
                assert_eq!(rx.pop(), Ok(round * 10 + j));
            }
        }
        assert!(rx.is_empty());
    }

    #[test]
    fn test_trade_events_by_value() {
        let (mut tx, mut rx) = EventChannel::with_capacity(8);
        let event = TradeEvent::new(10, 5000, Side::Bid);
        tx.push(event).unwrap();
        assert_eq!(rx.pop(), Ok(event));
    }

    #[test]
    fn test_abandonment_flags() {
        let (tx, rx) = EventChannel::<u8>::with_capacity(1);
        assert!(!rx.is_abandoned());
        assert!(!tx.is_abandoned());
        drop(tx);
        assert!(rx.is_abandoned());

        let (tx, rx) = EventChannel::<u8>::with_capacity(1);
        drop(rx);
        assert!(tx.is_abandoned());
    }

    #[test]
    fn test_values_survive_producer_drop() {
        let (mut tx, mut rx) = EventChannel::with_capacity(2);
        tx.push(1u64).unwrap();
        tx.push(2u64).unwrap();
        drop(tx);
        assert_eq!(rx.pop(), Ok(1));
        assert_eq!(rx.pop(), Ok(2));
        assert_eq!(rx.pop(), Err(ChannelEmpty));
    }

    #[test]
    #[should_panic(expected = "non-zero")]
    fn test_zero_capacity_panics() {
        let _ = EventChannel::<u8>::with_capacity(0);
    }

    #[test]
    fn test_cursors_on_separate_cache_lines() {
        assert!(std::mem::align_of::<CachePadded<AtomicUsize>>() >= 64);
    }
}
