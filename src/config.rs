//! Pipeline configuration.

use serde::{Deserialize, Serialize};

use crate::arena::NULL_INDEX;
use crate::error::ConfigError;
use crate::order_book::DEFAULT_MAX_LEVELS;
use crate::risk::DEFAULT_BUCKET_VOLUME;

/// CPU cores for the three pipeline threads.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoreAssignment {
    pub feed: usize,
    pub matcher: usize,
    pub risk: usize,
}

impl Default for CoreAssignment {
    fn default() -> Self {
        Self {
            feed: 3,
            matcher: 1,
            risk: 2,
        }
    }
}

/// Sizing and tuning knobs for the feed -> matcher -> risk topology.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Order slots pre-allocated in the arena
    pub arena_capacity: u32,
    /// Discrete price levels per side
    pub max_levels: u32,
    /// Slots in the matcher -> risk event channel
    pub event_capacity: usize,
    /// Slots in the feed -> matcher command ring
    pub command_capacity: usize,
    /// Volume that closes one imbalance bucket
    pub bucket_volume: f32,
    /// Cap on latency samples kept by the matcher
    pub latency_samples: u64,
    /// Seed for the mock feed
    pub feed_seed: u64,
    /// First price level of the mock feed's random walk
    pub feed_start_price: u32,
    /// Probability that the mock feed cancels instead of placing
    pub feed_cancel_ratio: f64,
    /// Pin threads to these cores, if set
    pub cores: Option<CoreAssignment>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            arena_capacity: 1_000_000,
            max_levels: DEFAULT_MAX_LEVELS,
            event_capacity: 4096,
            command_capacity: 4096,
            bucket_volume: DEFAULT_BUCKET_VOLUME,
            latency_samples: 10_000,
            feed_seed: 0x5EED,
            feed_start_price: 5000,
            feed_cancel_ratio: 0.3,
            cores: None,
        }
    }
}

impl PipelineConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.arena_capacity == 0 {
            return Err(ConfigError::ZeroCapacity("arena_capacity"));
        }
        if self.arena_capacity >= NULL_INDEX {
            return Err(ConfigError::ArenaTooLarge(self.arena_capacity));
        }
        if self.max_levels == 0 {
            return Err(ConfigError::ZeroCapacity("max_levels"));
        }
        if self.event_capacity == 0 {
            return Err(ConfigError::ZeroCapacity("event_capacity"));
        }
        if self.command_capacity == 0 {
            return Err(ConfigError::ZeroCapacity("command_capacity"));
        }
        if self.feed_start_price >= self.max_levels {
            return Err(ConfigError::StartPriceOutOfRange {
                price: self.feed_start_price,
                max_levels: self.max_levels,
            });
        }
        // Written so that NaN fails too
        if !(self.bucket_volume > 0.0) {
            return Err(ConfigError::InvalidBucketVolume(self.bucket_volume));
        }
        if !(0.0..=1.0).contains(&self.feed_cancel_ratio) {
            return Err(ConfigError::InvalidCancelRatio(self.feed_cancel_ratio));
        }
        Ok(())
    }
}
