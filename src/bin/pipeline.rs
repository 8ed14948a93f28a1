//! Pipeline runner
//!
//! Usage:
//!   pipeline --duration-secs 5
//!   pipeline --replay orders.csv --pin

use std::path::PathBuf;
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use lob_pipeline::{replay, run_pipeline, CoreAssignment, MockFeed, PipelineConfig, StopToken};

#[derive(Parser, Debug)]
#[command(name = "pipeline")]
#[command(about = "Run the feed -> matcher -> risk pipeline")]
struct Cli {
    /// Seconds to run the mock feed for (ignored with --replay)
    #[arg(long, default_value_t = 5)]
    duration_secs: u64,

    /// Replay a CSV order log instead of the mock feed
    #[arg(long)]
    replay: Option<PathBuf>,

    /// Pin feed/matcher/risk threads to cores 3/1/2
    #[arg(long)]
    pin: bool,

    /// Mock feed seed
    #[arg(long)]
    seed: Option<u64>,

    /// Order slots in the arena
    #[arg(long)]
    arena_capacity: Option<u32>,

    /// Price levels per side
    #[arg(long)]
    max_levels: Option<u32>,

    /// Slots in the matcher -> risk channel
    #[arg(long)]
    event_capacity: Option<usize>,

    /// Volume that closes an imbalance bucket
    #[arg(long)]
    bucket_volume: Option<f32>,

    /// Probability that the mock feed cancels instead of placing
    #[arg(long)]
    cancel_ratio: Option<f64>,
}

impl Cli {
    fn config(&self) -> PipelineConfig {
        let defaults = PipelineConfig::default();
        let max_levels = self.max_levels.unwrap_or(defaults.max_levels);
        PipelineConfig {
            arena_capacity: self.arena_capacity.unwrap_or(defaults.arena_capacity),
            max_levels,
            event_capacity: self.event_capacity.unwrap_or(defaults.event_capacity),
            bucket_volume: self.bucket_volume.unwrap_or(defaults.bucket_volume),
            feed_seed: self.seed.unwrap_or(defaults.feed_seed),
            feed_start_price: defaults.feed_start_price.min(max_levels.saturating_sub(1)),
            feed_cancel_ratio: self.cancel_ratio.unwrap_or(defaults.feed_cancel_ratio),
            cores: self.pin.then(CoreAssignment::default),
            ..defaults
        }
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("lob_pipeline=info")),
        )
        .init();

    let cli = Cli::parse();
    let config = cli.config();
    config.validate().context("invalid configuration")?;

    let stop = StopToken::new();
    let report = match &cli.replay {
        Some(path) => {
            let commands = replay::load(path)
                .with_context(|| format!("loading {}", path.display()))?;
            run_pipeline(&config, commands.into_iter(), stop)?
        }
        None => {
            let feed = MockFeed::new(
                config.feed_seed,
                config.feed_start_price,
                config.max_levels,
                config.feed_cancel_ratio,
            );
            let timer = stop.clone();
            let duration = Duration::from_secs(cli.duration_secs);
            thread::spawn(move || {
                thread::sleep(duration);
                timer.cancel();
            });
            info!(secs = cli.duration_secs, "running mock feed");
            run_pipeline(&config, feed, stop)?
        }
    };

    println!("\n=== Pipeline Report ===");
    println!("Commands:         {}", report.commands);
    println!("Accepted:         {}", report.accepted);
    println!("Rejected:         {}", report.rejected);
    println!("Canceled:         {}", report.canceled);
    println!("Resting:          {}", report.resting_orders);
    println!("Events delivered: {}", report.events_delivered);
    println!("Metrics emitted:  {}", report.metrics_emitted);
    if let Some(vpin) = report.last_metric {
        println!("Last VPIN:        {:.4}", vpin);
    }
    println!("State hash:       {:016x}", report.state_hash);
    if let Some(latency) = report.latency {
        println!("\n{}", latency);
    }
    Ok(())
}
