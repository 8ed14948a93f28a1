//! Command and Event types for the pipeline.
//!
//! Commands flow from the feed thread into the matcher.
//! Events flow from the matcher to the risk consumer.

use serde::{Deserialize, Serialize};

/// Order side (bid = buy, ask = sell)
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum Side {
    /// Buy side (bids)
    #[default]
    #[serde(alias = "buy", alias = "b")]
    Bid = 0,
    /// Sell side (asks)
    #[serde(alias = "sell", alias = "s")]
    Ask = 1,
}

impl Side {
    /// Returns the opposite side
    #[inline]
    pub const fn opposite(self) -> Self {
        match self {
            Side::Bid => Side::Ask,
            Side::Ask => Side::Bid,
        }
    }

    #[inline]
    pub const fn is_buy(self) -> bool {
        matches!(self, Side::Bid)
    }
}

// ============================================================================
// Input Commands
// ============================================================================

/// Rest a new limit order
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PlaceOrder {
    /// External order ID (client-assigned)
    pub order_id: u64,
    /// Order side (bid/ask)
    pub side: Side,
    /// Discretized price level in `[0, max_levels)`
    pub price: u32,
    /// Order quantity
    pub qty: u32,
    /// Arrival timestamp in nanoseconds
    pub timestamp: u64,
}

/// Cancel a resting order
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CancelOrder {
    /// Order ID to cancel
    pub order_id: u64,
}

/// Input commands from the feed thread
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Command {
    /// Rest a new limit order
    Place(PlaceOrder),
    /// Cancel a resting order
    Cancel(CancelOrder),
}

// ============================================================================
// Output Events
// ============================================================================

/// Fixed-layout record handed from the matcher to the risk consumer.
///
/// Plain value: copied through the channel, no identity beyond its fields.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[repr(C)]
pub struct TradeEvent {
    /// Quantity
    pub qty: u32,
    /// Discretized price level
    pub price: u32,
    /// Side of the order that produced the event
    pub side: Side,
}

impl TradeEvent {
    #[inline]
    pub const fn new(qty: u32, price: u32, side: Side) -> Self {
        Self { qty, price, side }
    }
}
