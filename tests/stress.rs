//! Stress Tests - Push the book to its limits.
//!
//! These tests verify correctness under extreme conditions:
//! - Near-capacity operation
//! - High contention at single price levels
//! - Rapid order churn
//! - Boundary prices and quantities

use lob_pipeline::{BookError, CancelOrder, Command, Engine, PlaceOrder, Side, TradeEvent};
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;

fn place(order_id: u64, side: Side, price: u32, qty: u32) -> Command {
    Command::Place(PlaceOrder {
        order_id,
        side,
        price,
        qty,
        timestamp: order_id,
    })
}

fn cancel(order_id: u64) -> Command {
    Command::Cancel(CancelOrder { order_id })
}

// ============================================================================
// Capacity Stress Tests
// ============================================================================

#[test]
fn test_near_capacity_operation() {
    const CAPACITY: u32 = 10_000;
    let mut engine = Engine::new(CAPACITY, 10_000);

    // Fill to 95% capacity
    let target_orders = (CAPACITY as f64 * 0.95) as u64;

    for i in 0..target_orders {
        // bids 0-999, asks 5000-5999
        let (side, price) = if i % 2 == 0 {
            (Side::Bid, (i % 1000) as u32)
        } else {
            (Side::Ask, 5000 + (i % 1000) as u32)
        };
        let result = engine.process(place(i, side, price, 100));
        assert!(
            matches!(result, Ok(Some(_))),
            "Order {} should be accepted, got {:?}", i, result
        );
    }

    assert_eq!(engine.order_count(), target_orders as usize);
    assert_eq!(engine.arena.available(), CAPACITY - target_orders as u32);
}

#[test]
fn test_arena_full_rejection() {
    const CAPACITY: u32 = 100;
    let mut engine = Engine::new(CAPACITY, 1_000);

    for i in 0..CAPACITY as u64 {
        engine.process(place(i, Side::Bid, i as u32, 100)).unwrap();
    }

    assert_eq!(
        engine.process(place(CAPACITY as u64, Side::Bid, 500, 100)),
        Err(BookError::PoolExhausted { capacity: CAPACITY })
    );
    // The rejected order must not have disturbed the book
    assert_eq!(engine.best_bid(), Some(CAPACITY - 1));
    assert!(!engine.book.is_level_occupied(Side::Bid, 500));
}

#[test]
fn test_arena_reuse_after_cancel() {
    const CAPACITY: u32 = 100;
    let mut engine = Engine::new(CAPACITY, 1_000);

    for i in 0..CAPACITY as u64 {
        engine.process(place(i, Side::Bid, 900, 100)).unwrap();
    }
    let freed = engine.slot_of(50).unwrap();

    engine.process(cancel(50)).unwrap();

    // The freed slot is the next one handed out
    engine.process(place(1000, Side::Bid, 900, 100)).unwrap();
    assert_eq!(engine.slot_of(1000), Some(freed));
}

// ============================================================================
// High Contention Tests
// ============================================================================

#[test]
fn test_single_price_level_contention() {
    let mut engine = Engine::new(10_000, 1_000);
    const ORDERS: u64 = 1000;

    for i in 0..ORDERS {
        engine.process(place(i, Side::Ask, 500, 100)).unwrap();
    }

    assert_eq!(engine.order_count(), ORDERS as usize);
    assert_eq!(engine.book.depth_at(Side::Ask, 500), (ORDERS * 100, ORDERS as u32));
    assert_eq!(engine.book.level_count(Side::Ask), 1);

    // Drain from the back so the level stays occupied until the last cancel
    for i in (0..ORDERS).rev() {
        assert_eq!(engine.best_ask(), Some(500));
        engine.process(cancel(i)).unwrap();
    }
    assert_eq!(engine.best_ask(), None);
    assert!(engine.book.is_empty());
}

#[test]
fn test_fifo_priority_under_contention() {
    let mut engine = Engine::new(1000, 1_000);

    for i in 0..100u64 {
        engine.process(place(i, Side::Ask, 700, 10)).unwrap();
    }

    // Pull every third order
    for i in (0..100u64).step_by(3) {
        engine.process(cancel(i)).unwrap();
    }

    let level = engine.book.level(Side::Ask, 700).unwrap();
    let queued: Vec<u64> = level
        .iter(&engine.arena)
        .map(|idx| engine.arena.get(idx).order_id)
        .collect();
    let expected: Vec<u64> = (0..100u64).filter(|i| i % 3 != 0).collect();
    assert_eq!(queued, expected, "queue must keep arrival order");
}

// ============================================================================
// Rapid Churn Tests
// ============================================================================

#[test]
fn test_rapid_add_cancel_cycles() {
    let mut engine = Engine::new(1000, 1_000);
    const CYCLES: u64 = 10_000;

    for order_id in 0..CYCLES {
        let side = if order_id % 2 == 0 { Side::Bid } else { Side::Ask };
        assert_eq!(
            engine.process(place(order_id, side, 100, 100)),
            Ok(Some(TradeEvent::new(100, 100, side)))
        );
        assert_eq!(engine.process(cancel(order_id)), Ok(None));
    }

    assert_eq!(engine.order_count(), 0, "All orders should be canceled");
    assert!(engine.arena.is_empty());
    assert_eq!(engine.best_bid(), None);
    assert_eq!(engine.best_ask(), None);
}

// ============================================================================
// Edge Case Tests
// ============================================================================

#[test]
fn test_zero_price() {
    let mut engine = Engine::new(1000, 1_000);
    engine.process(place(1, Side::Bid, 0, 100)).unwrap();
    assert_eq!(engine.best_bid(), Some(0));
}

#[test]
fn test_top_price_level() {
    let mut engine = Engine::new(1000, 1_000);
    engine.process(place(1, Side::Ask, 999, 100)).unwrap();
    assert_eq!(engine.best_ask(), Some(999));

    assert_eq!(
        engine.process(place(2, Side::Ask, 1_000, 100)),
        Err(BookError::InvalidPriceLevel { price: 1_000, max_levels: 1_000 })
    );
    assert_eq!(
        engine.process(place(3, Side::Ask, u32::MAX, 100)),
        Err(BookError::InvalidPriceLevel { price: u32::MAX, max_levels: 1_000 })
    );
}

#[test]
fn test_max_quantity_accumulates_without_overflow() {
    let mut engine = Engine::new(1000, 1_000);

    for i in 0..4 {
        engine.process(place(i, Side::Bid, 10, u32::MAX)).unwrap();
    }
    assert_eq!(engine.book.depth_at(Side::Bid, 10), (4 * u32::MAX as u64, 4));
}

#[test]
fn test_quantity_one() {
    let mut engine = Engine::new(1000, 1_000);
    engine.process(place(1, Side::Bid, 10, 1)).unwrap();
    assert_eq!(engine.book.depth_at(Side::Bid, 10), (1, 1));
}

#[test]
fn test_many_price_levels() {
    const LEVELS: u32 = 10_000;
    let mut engine = Engine::new(100_000, LEVELS);

    // Every level on both sides, so the index crosses many words
    for i in 0..LEVELS {
        engine.process(place(i as u64, Side::Bid, i, 100)).unwrap();
        engine.process(place((LEVELS + i) as u64, Side::Ask, i, 100)).unwrap();
    }

    assert_eq!(engine.order_count(), 2 * LEVELS as usize);
    assert_eq!(engine.best_bid(), Some(LEVELS - 1));
    assert_eq!(engine.best_ask(), Some(0));
    assert_eq!(engine.book.level_count(Side::Bid), LEVELS as usize);
}

#[test]
fn test_sparse_levels_best_moves_on_cancel() {
    let mut engine = Engine::new(1000, 10_000);

    for (i, price) in [3u32, 64, 65, 4095, 9999].into_iter().enumerate() {
        engine.process(place(i as u64, Side::Bid, price, 1)).unwrap();
    }

    let mut expected = vec![9999, 4095, 65, 64, 3];
    for id in [4u64, 3, 2, 1, 0] {
        assert_eq!(engine.best_bid(), Some(expected.remove(0)));
        engine.process(cancel(id)).unwrap();
    }
    assert_eq!(engine.best_bid(), None);
}

// ============================================================================
// Cancel Edge Cases
// ============================================================================

#[test]
fn test_double_cancel() {
    let mut engine = Engine::new(1000, 1_000);

    engine.process(place(1, Side::Bid, 100, 100)).unwrap();
    assert_eq!(engine.process(cancel(1)), Ok(None));
    assert_eq!(engine.process(cancel(1)), Err(BookError::OrderNotFound(1)));
}

// ============================================================================
// Large Scale Fuzzing
// ============================================================================

#[test]
fn test_large_random_workload() {
    const SEED: u64 = 0xABCDEF123456;
    const OPS: usize = 50_000;

    let mut rng = ChaCha8Rng::seed_from_u64(SEED);
    let mut engine = Engine::new(100_000, 2_000);

    let mut next_order_id = 1u64;
    let mut resting_orders = Vec::new();
    let mut total_cancels = 0u64;

    for _ in 0..OPS {
        if rng.gen_range(0..100) < 60 || resting_orders.is_empty() {
            let side = if rng.gen_bool(0.5) { Side::Bid } else { Side::Ask };
            let result = engine.process(place(
                next_order_id,
                side,
                rng.gen_range(0..2_000),
                rng.gen_range(1..500),
            ));
            if result.is_ok() {
                resting_orders.push(next_order_id);
            }
            next_order_id += 1;
        } else {
            let idx = rng.gen_range(0..resting_orders.len());
            let order_id = resting_orders.swap_remove(idx);
            if engine.process(cancel(order_id)).is_ok() {
                total_cancels += 1;
            }
        }
    }

    assert_eq!(engine.order_count(), resting_orders.len());
    assert_eq!(engine.arena.allocated() as usize, resting_orders.len());
    println!("Large workload test completed:");
    println!("  Operations: {}", OPS);
    println!("  Orders placed: {}", next_order_id - 1);
    println!("  Total cancels: {}", total_cancels);
    println!("  Final book size: {}", engine.order_count());
}

// ============================================================================
// Memory Leak Detection
// ============================================================================

#[test]
fn test_arena_returns_all_slots() {
    const CAPACITY: u32 = 1000;
    let mut engine = Engine::new(CAPACITY, 1_000);

    for i in 0..CAPACITY as u64 {
        let side = if i % 2 == 0 { Side::Bid } else { Side::Ask };
        engine.process(place(i, side, ((i / 2) % 500) as u32, 100)).unwrap();
    }
    assert!(engine.arena.is_full());

    for i in 0..CAPACITY as u64 {
        engine.process(cancel(i)).unwrap();
    }
    assert_eq!(engine.order_count(), 0);
    assert!(engine.arena.is_empty());

    // Should be able to fill again (arena slots reused)
    for i in 0..CAPACITY as u64 {
        let result = engine.process(place(i + CAPACITY as u64, Side::Bid, 100, 100));
        assert!(result.is_ok(), "Order {} should be accepted after arena reset", i);
    }
}
