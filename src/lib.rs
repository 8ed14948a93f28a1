//! # LOB Pipeline
//!
//! A single-writer limit order book feeding a lock-free risk pipeline.
//!
//! ## Design Principles
//!
//! - **Single-Writer**: The matcher thread owns the arena and the book; nothing is locked
//! - **O(1) Operations**: Insert, cancel and best bid/ask run in constant time
//! - **Cache-Optimized**: 64-byte aligned nodes, 32-bit indices, padded ring cursors
//! - **Arena Allocation**: Every order slot is allocated up front; the hot path never allocates
//!
//! ## Architecture
//!
//! ```text
//! [Feed Thread] --> [rtrb Ring] --> [Matcher Thread (Pinned)] --> [EventChannel] --> [Risk Thread]
//!                                          |                                            |
//!                                   [Arena + OrderBook]                             [VPIN]
//! ```

pub mod arena;
pub mod channel;
pub mod command;
pub mod config;
pub mod engine;
pub mod error;
pub mod feed;
pub mod latency;
pub mod level_index;
pub mod order_book;
#[cfg(feature = "runtime")]
pub mod pipeline;
pub mod price_level;
pub mod replay;
pub mod risk;

// Re-exports for convenience
pub use arena::{Arena, ArenaIndex, OrderNode, NULL_INDEX};
pub use channel::{ChannelEmpty, ChannelFull, Consumer, EventChannel, Producer};
pub use command::{CancelOrder, Command, PlaceOrder, Side, TradeEvent};
pub use config::{CoreAssignment, PipelineConfig};
pub use engine::{Canceled, Engine};
pub use error::{BookError, ConfigError, PipelineError, ReplayError};
pub use feed::MockFeed;
pub use latency::{LatencySummary, LatencyTracker};
pub use level_index::LevelIndex;
pub use order_book::{OrderBook, DEFAULT_MAX_LEVELS};
#[cfg(feature = "runtime")]
pub use pipeline::{pin_to_core, run_pipeline, PipelineReport, StopToken};
pub use price_level::PriceLevel;
pub use risk::{RiskModel, VpinEstimator, VPIN_WINDOW};
