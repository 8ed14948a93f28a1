//! Risk - downstream consumers of the trade-event stream.
//!
//! [`RiskModel`] is the narrow seam between the event channel and whatever
//! numeric analysis runs on the risk thread. [`VpinEstimator`] is the stock
//! model: a volume-bucketed order-flow imbalance.
//!
//! Volume accumulates per side until buy + sell reaches the bucket threshold,
//! which closes a bucket. Once [`VPIN_WINDOW`] buckets are closed the metric
//!
//! ```text
//! sum(|buy_i - sell_i|) / (VPIN_WINDOW * bucket_volume)
//! ```
//!
//! is emitted and the window starts over.

use arrayvec::ArrayVec;

use crate::command::{Side, TradeEvent};

/// Buckets per emitted metric.
pub const VPIN_WINDOW: usize = 16;

/// Default volume that closes a bucket.
pub const DEFAULT_BUCKET_VOLUME: f32 = 1000.0;

/// Lanes of the imbalance reduction. Eight `f32`s fill a 256-bit vector.
const LANES: usize = 8;

/// A consumer of trade events that occasionally produces a metric.
pub trait RiskModel {
    type Metric;

    /// Fold one event into the model, returning a metric when one completes.
    fn consume(&mut self, trade: &TradeEvent) -> Option<Self::Metric>;
}

/// Volume-synchronized probability of informed trading.
#[derive(Clone, Debug)]
pub struct VpinEstimator {
    bucket_volume: f32,
    buy_volume: f32,
    sell_volume: f32,
    buy_buckets: ArrayVec<f32, VPIN_WINDOW>,
    sell_buckets: ArrayVec<f32, VPIN_WINDOW>,
}

impl VpinEstimator {
    /// # Panics
    /// Panics if `bucket_volume` is not strictly positive.
    pub fn new(bucket_volume: f32) -> Self {
        assert!(bucket_volume > 0.0, "bucket volume must be positive");
        Self {
            bucket_volume,
            buy_volume: 0.0,
            sell_volume: 0.0,
            buy_buckets: ArrayVec::new(),
            sell_buckets: ArrayVec::new(),
        }
    }

    #[inline]
    pub fn bucket_volume(&self) -> f32 {
        self.bucket_volume
    }

    /// Buckets closed in the current window.
    #[inline]
    pub fn closed_buckets(&self) -> usize {
        self.buy_buckets.len()
    }

    /// Volume accumulated in the open bucket as (buy, sell).
    #[inline]
    pub fn open_bucket(&self) -> (f32, f32) {
        (self.buy_volume, self.sell_volume)
    }

    fn close_bucket(&mut self) -> Option<f32> {
        // Window is cleared as soon as it fills, so there is always room here
        self.buy_buckets.push(self.buy_volume);
        self.sell_buckets.push(self.sell_volume);
        self.buy_volume = 0.0;
        self.sell_volume = 0.0;

        if !self.buy_buckets.is_full() {
            return None;
        }
        let vpin = bucket_imbalance(&self.buy_buckets, &self.sell_buckets)
            / (VPIN_WINDOW as f32 * self.bucket_volume);
        self.buy_buckets.clear();
        self.sell_buckets.clear();
        Some(vpin)
    }
}

impl Default for VpinEstimator {
    fn default() -> Self {
        Self::new(DEFAULT_BUCKET_VOLUME)
    }
}

impl RiskModel for VpinEstimator {
    type Metric = f32;

    #[inline]
    fn consume(&mut self, trade: &TradeEvent) -> Option<f32> {
        match trade.side {
            Side::Bid => self.buy_volume += trade.qty as f32,
            Side::Ask => self.sell_volume += trade.qty as f32,
        }
        if self.buy_volume + self.sell_volume >= self.bucket_volume {
            self.close_bucket()
        } else {
            None
        }
    }
}

/// `sum(|buy_i - sell_i|)` over equal-length bucket slices.
///
/// Accumulates into `LANES` independent partial sums so the compiler can keep
/// them in one vector register; the tail is folded in scalar.
pub fn bucket_imbalance(buy: &[f32], sell: &[f32]) -> f32 {
    debug_assert_eq!(buy.len(), sell.len());
    let mut acc = [0.0f32; LANES];

    let buy_chunks = buy.chunks_exact(LANES);
    let sell_chunks = sell.chunks_exact(LANES);
    let (buy_tail, sell_tail) = (buy_chunks.remainder(), sell_chunks.remainder());

    for (b, s) in buy_chunks.zip(sell_chunks) {
        for lane in 0..LANES {
            acc[lane] += (b[lane] - s[lane]).abs();
        }
    }

    let tail: f32 = buy_tail
        .iter()
        .zip(sell_tail)
        .map(|(b, s)| (b - s).abs())
        .sum();
    acc.iter().sum::<f32>() + tail
}
