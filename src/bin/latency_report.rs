use anyhow::Result;
use hdrhistogram::Histogram;
use lob_pipeline::{CancelOrder, Command, Engine, PlaceOrder, Side};
use std::collections::VecDeque;
use std::time::{Duration, Instant};

const ITERATIONS: u64 = 1_000_000;
/// Orders kept resting; once reached, each place is paired with a cancel of the oldest.
const RESTING: usize = 10_000;

fn print_report(name: &str, histogram: &Histogram<u64>, total: Duration) {
    println!("\n=== {} Latency (ns) ===", name);
    println!("Total Ops:  {}", histogram.len());
    println!("Throughput: {:.2} ops/sec", histogram.len() as f64 / total.as_secs_f64());
    println!("---------------------------");
    println!("Min:    {:6} ns", histogram.min());
    println!("P50:    {:6} ns", histogram.value_at_quantile(0.50));
    println!("P90:    {:6} ns", histogram.value_at_quantile(0.90));
    println!("P99:    {:6} ns", histogram.value_at_quantile(0.99));
    println!("P99.9:  {:6} ns", histogram.value_at_quantile(0.999));
    println!("P99.99: {:6} ns", histogram.value_at_quantile(0.9999));
    println!("Max:    {:6} ns", histogram.max());
    println!("---------------------------");

    println!("Distribution:");
    let mut floor = 0;
    for v in histogram.iter_log(16, 2.0) {
        let count = v.count_since_last_iteration();
        if count > 0 {
            println!("{:6} ns - {:6} ns: {:10} count", floor, v.value_iterated_to(), count);
        }
        floor = v.value_iterated_to() + 1;
    }
}

fn main() -> Result<()> {
    println!("Preparing Latency Benchmark...");

    let mut engine = Engine::new(RESTING as u32 + 1, 10_000);
    engine.warm_up();

    let mut place_hist = Histogram::<u64>::new_with_bounds(1, 1_000_000, 3)?;
    let mut cancel_hist = Histogram::<u64>::new_with_bounds(1, 1_000_000, 3)?;
    let mut place_total = Duration::ZERO;
    let mut cancel_total = Duration::ZERO;
    let mut resting = VecDeque::with_capacity(RESTING);

    println!("Running {} iterations...", ITERATIONS);

    for order_id in 1..=ITERATIONS {
        let cmd = Command::Place(PlaceOrder {
            order_id,
            side: if order_id % 2 == 0 { Side::Bid } else { Side::Ask },
            price: 5_000 + (order_id % 100) as u32,
            qty: 10,
            timestamp: order_id,
        });

        let start = Instant::now();
        std::hint::black_box(engine.process(cmd))?;
        let elapsed = start.elapsed();
        place_hist.saturating_record(elapsed.as_nanos().max(1) as u64);
        place_total += elapsed;
        resting.push_back(order_id);

        if resting.len() > RESTING {
            if let Some(oldest) = resting.pop_front() {
                let cmd = Command::Cancel(CancelOrder { order_id: oldest });
                let start = Instant::now();
                std::hint::black_box(engine.process(cmd))?;
                let elapsed = start.elapsed();
                cancel_hist.saturating_record(elapsed.as_nanos().max(1) as u64);
                cancel_total += elapsed;
            }
        }
    }

    print_report("Place", &place_hist, place_total);
    print_report("Cancel", &cancel_hist, cancel_total);
    println!(
        "\nResting orders: {} (best bid {:?}, best ask {:?})",
        engine.order_count(),
        engine.best_bid(),
        engine.best_ask()
    );
    Ok(())
}
