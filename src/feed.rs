//! Mock market feed.
//!
//! Generates a deterministic stream of commands: a random walk of one tick
//! per order, quantities in `1..=100`, either side with equal probability,
//! and, with a configurable probability, a cancel of a previously issued
//! order instead of a new placement.

use std::time::Instant;

use rand::prelude::*;
use rand_chacha::ChaCha8Rng;

use crate::command::{CancelOrder, Command, PlaceOrder, Side};

/// Seeded command generator. An endless iterator; bound it with `take`.
#[derive(Debug)]
pub struct MockFeed {
    rng: ChaCha8Rng,
    price: u32,
    max_levels: u32,
    cancel_ratio: f64,
    next_order_id: u64,
    /// Ids issued and not yet canceled by this feed
    live: Vec<u64>,
    epoch: Instant,
}

impl MockFeed {
    /// # Panics
    /// Panics if `max_levels` is zero.
    pub fn new(seed: u64, start_price: u32, max_levels: u32, cancel_ratio: f64) -> Self {
        assert!(max_levels > 0, "feed needs at least one price level");
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
            price: start_price.min(max_levels - 1),
            max_levels,
            cancel_ratio: cancel_ratio.clamp(0.0, 1.0),
            next_order_id: 1,
            live: Vec::new(),
            epoch: Instant::now(),
        }
    }

    /// Current level of the random walk.
    #[inline]
    pub fn price(&self) -> u32 {
        self.price
    }

    /// Orders issued and not yet canceled by this feed.
    #[inline]
    pub fn live_orders(&self) -> usize {
        self.live.len()
    }

    fn step_price(&mut self) {
        match self.rng.gen_range(0..3) {
            0 => self.price = self.price.saturating_sub(1),
            2 => self.price = (self.price + 1).min(self.max_levels - 1),
            _ => {}
        }
    }

    fn next_place(&mut self) -> Command {
        self.step_price();
        let order_id = self.next_order_id;
        self.next_order_id += 1;
        self.live.push(order_id);

        Command::Place(PlaceOrder {
            order_id,
            side: if self.rng.gen_bool(0.5) { Side::Bid } else { Side::Ask },
            price: self.price,
            qty: self.rng.gen_range(1..=100),
            timestamp: self.epoch.elapsed().as_nanos() as u64,
        })
    }

    fn next_cancel(&mut self) -> Command {
        let idx = self.rng.gen_range(0..self.live.len());
        let order_id = self.live.swap_remove(idx);
        Command::Cancel(CancelOrder { order_id })
    }
}

impl Iterator for MockFeed {
    type Item = Command;

    fn next(&mut self) -> Option<Command> {
        if !self.live.is_empty() && self.rng.gen_bool(self.cancel_ratio) {
            Some(self.next_cancel())
        } else {
            Some(self.next_place())
        }
    }
}
