//! Error types.
//!
//! Book errors sit on the insert/cancel hot path, so they are small `Copy`
//! values with no heap payload. Contract violations (double release,
//! releasing a linked slot, unlinking a slot that is not queued) are not
//! represented here: they are `debug_assert!` failures.

use thiserror::Error;

/// Recoverable failures reported by the arena, the book and the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum BookError {
    /// Every arena slot is in use.
    #[error("order arena exhausted: all {capacity} slots in use")]
    PoolExhausted { capacity: u32 },

    /// Discretized price outside `[0, max_levels)`.
    #[error("price level {price} outside [0, {max_levels})")]
    InvalidPriceLevel { price: u32, max_levels: u32 },

    /// Zero quantity orders cannot rest (a level's bit tracks non-zero volume).
    #[error("order quantity must be non-zero")]
    InvalidQuantity,

    /// Order id is already resting in the book.
    #[error("order {0} already resting")]
    DuplicateOrderId(u64),

    /// Order id is not resting in the book.
    #[error("order {0} not found")]
    OrderNotFound(u64),
}

/// Invalid pipeline configuration.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("{0} must be non-zero")]
    ZeroCapacity(&'static str),

    #[error("arena capacity {0} exceeds the index space")]
    ArenaTooLarge(u32),

    #[error("feed start price {price} outside [0, {max_levels})")]
    StartPriceOutOfRange { price: u32, max_levels: u32 },

    #[error("bucket volume must be positive, got {0}")]
    InvalidBucketVolume(f32),

    #[error("cancel ratio must be within [0, 1], got {0}")]
    InvalidCancelRatio(f64),
}

/// Failures while starting or joining the pipeline threads.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("failed to spawn {name} thread")]
    Spawn {
        name: &'static str,
        #[source]
        source: std::io::Error,
    },

    #[error("{0} thread panicked")]
    ThreadPanicked(&'static str),

    #[error("latency histogram: {0}")]
    Histogram(#[from] hdrhistogram::CreationError),
}

/// Failures while loading an order log.
#[derive(Debug, Error)]
pub enum ReplayError {
    #[error("failed to open order log")]
    Io(#[from] std::io::Error),

    #[error("malformed order log")]
    Csv(#[from] csv::Error),

    #[error("row {line}: {reason}")]
    InvalidRow { line: u64, reason: &'static str },
}
