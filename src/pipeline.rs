//! Pipeline - the feed -> matcher -> risk thread topology.
//!
//! ```text
//! [Feed Thread] --rtrb ring--> [Matcher Thread] --EventChannel--> [Risk Thread]
//!   (source)      Command        (sole owner of     TradeEvent      (VPIN)
//!                                 engine + book)
//! ```
//!
//! Shutdown is cooperative. Cancelling the [`StopToken`] (or exhausting the
//! command source) ends the feed. The matcher keeps going until the command
//! ring is abandoned and empty, then drops its event producer. The risk thread
//! does the same on the event channel. Every command the feed issued is
//! therefore processed, and every event the matcher emitted is consumed.

use std::sync::atomic::{self, AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Instant;

use crossbeam::utils::Backoff;
use tracing::{debug, info, warn};

use crate::channel::{ChannelFull, Consumer, EventChannel, Producer};
use crate::command::{Command, TradeEvent};
use crate::config::PipelineConfig;
use crate::engine::Engine;
use crate::error::PipelineError;
use crate::latency::{LatencySummary, LatencyTracker};
use crate::risk::{RiskModel, VpinEstimator};

/// Shared shutdown flag.
#[derive(Clone, Debug, Default)]
pub struct StopToken(Arc<AtomicBool>);

impl StopToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    #[inline]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// Pin the current thread to the CPU core with the given id.
///
/// Returns `false` if the core does not exist or the OS refused.
pub fn pin_to_core(core: usize) -> bool {
    let pinned = core_affinity::get_core_ids()
        .and_then(|ids| ids.into_iter().find(|id| id.id == core))
        .map(core_affinity::set_for_current)
        .unwrap_or(false);
    if !pinned {
        warn!(core, "could not pin thread; running unpinned");
    }
    pinned
}

/// Totals gathered from the three threads after they have joined.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PipelineReport {
    /// Commands the feed pushed into the ring
    pub commands: u64,
    /// Placements that now rest in the book
    pub accepted: u64,
    /// Commands the engine refused
    pub rejected: u64,
    /// Successful cancels
    pub canceled: u64,
    /// Events the risk thread consumed
    pub events_delivered: u64,
    /// Imbalance metrics produced
    pub metrics_emitted: u64,
    pub last_metric: Option<f32>,
    /// Orders resting when the matcher stopped
    pub resting_orders: usize,
    /// `Engine::state_hash` when the matcher stopped
    pub state_hash: u64,
    pub latency: Option<LatencySummary>,
}

#[derive(Debug, Default)]
struct MatcherStats {
    accepted: u64,
    rejected: u64,
    canceled: u64,
    latency: Option<LatencySummary>,
    resting_orders: usize,
    state_hash: u64,
}

#[derive(Debug, Default)]
struct RiskStats {
    events_delivered: u64,
    metrics_emitted: u64,
    last_metric: Option<f32>,
}

/// Matcher thread state: the engine plus its outbound side.
struct Matcher {
    engine: Engine,
    latency: LatencyTracker,
    events: Producer<TradeEvent>,
    stats: MatcherStats,
}

impl Matcher {
    fn handle(&mut self, cmd: Command) {
        let start = Instant::now();
        let outcome = self.engine.process(cmd);
        self.latency.record(start.elapsed());

        match outcome {
            Ok(Some(event)) => {
                self.stats.accepted += 1;
                self.forward(event);
            }
            Ok(None) => self.stats.canceled += 1,
            Err(err) => {
                self.stats.rejected += 1;
                debug!(error = %err, ?cmd, "command rejected");
            }
        }
    }

    /// Hand an event to the risk thread, waiting while the channel is full.
    fn forward(&mut self, mut event: TradeEvent) {
        let backoff = Backoff::new();
        while let Err(ChannelFull(rejected)) = self.events.push(event) {
            if self.events.is_abandoned() {
                warn!("risk thread gone; dropping event");
                return;
            }
            event = rejected;
            backoff.snooze();
        }
    }

    fn run(mut self, mut commands: rtrb::Consumer<Command>) -> MatcherStats {
        let backoff = Backoff::new();
        loop {
            match commands.pop() {
                Ok(cmd) => {
                    self.handle(cmd);
                    backoff.reset();
                }
                Err(_) if commands.is_abandoned() => {
                    // Feed is gone; whatever it pushed before leaving is visible now
                    atomic::fence(Ordering::Acquire);
                    while let Ok(cmd) = commands.pop() {
                        self.handle(cmd);
                    }
                    break;
                }
                Err(_) => backoff.snooze(),
            }
        }

        self.stats.latency = self.latency.summary();
        self.stats.resting_orders = self.engine.order_count();
        self.stats.state_hash = self.engine.state_hash();
        self.stats
        // `self.events` drops here, which lets the risk thread finish
    }
}

fn run_feed<I>(source: I, mut commands: rtrb::Producer<Command>, stop: StopToken) -> u64
where
    I: Iterator<Item = Command>,
{
    let mut issued = 0u64;
    let backoff = Backoff::new();

    'feed: for mut cmd in source {
        if stop.is_cancelled() {
            break;
        }
        loop {
            match commands.push(cmd) {
                Ok(()) => break,
                Err(rtrb::PushError::Full(rejected)) => {
                    if stop.is_cancelled() || commands.is_abandoned() {
                        break 'feed;
                    }
                    cmd = rejected;
                    backoff.snooze();
                }
            }
        }
        backoff.reset();
        issued += 1;
    }
    issued
}

fn run_risk<M>(mut model: M, mut events: Consumer<TradeEvent>) -> RiskStats
where
    M: RiskModel<Metric = f32>,
{
    let mut stats = RiskStats::default();
    let backoff = Backoff::new();

    let mut consume = |event: TradeEvent, stats: &mut RiskStats| {
        stats.events_delivered += 1;
        if let Some(metric) = model.consume(&event) {
            stats.metrics_emitted += 1;
            stats.last_metric = Some(metric);
            info!(vpin = metric, events = stats.events_delivered, "imbalance window closed");
        }
    };

    loop {
        match events.pop() {
            Ok(event) => {
                consume(event, &mut stats);
                backoff.reset();
            }
            Err(_) if events.is_abandoned() => {
                while let Ok(event) = events.pop() {
                    consume(event, &mut stats);
                }
                break;
            }
            Err(_) => backoff.snooze(),
        }
    }
    stats
}

fn spawn<T, F>(name: &'static str, core: Option<usize>, f: F) -> Result<thread::JoinHandle<T>, PipelineError>
where
    T: Send + 'static,
    F: FnOnce() -> T + Send + 'static,
{
    thread::Builder::new()
        .name(name.to_string())
        .spawn(move || {
            if let Some(core) = core {
                pin_to_core(core);
            }
            debug!(thread = name, "started");
            f()
        })
        .map_err(|source| PipelineError::Spawn { name, source })
}

fn join<T>(name: &'static str, handle: thread::JoinHandle<T>) -> Result<T, PipelineError> {
    handle.join().map_err(|_| PipelineError::ThreadPanicked(name))
}

/// Run the three-thread pipeline until `source` is exhausted or `stop` is
/// cancelled, then drain and report.
pub fn run_pipeline<I>(
    config: &PipelineConfig,
    source: I,
    stop: StopToken,
) -> Result<PipelineReport, PipelineError>
where
    I: Iterator<Item = Command> + Send + 'static,
{
    config.validate()?;

    let mut engine = Engine::new(config.arena_capacity, config.max_levels);
    engine.warm_up();
    let latency = LatencyTracker::new(config.latency_samples)?;
    let model = VpinEstimator::new(config.bucket_volume);

    let (cmd_tx, cmd_rx) = rtrb::RingBuffer::<Command>::new(config.command_capacity);
    let (event_tx, event_rx) = EventChannel::<TradeEvent>::with_capacity(config.event_capacity);

    info!(
        arena_capacity = config.arena_capacity,
        max_levels = config.max_levels,
        command_capacity = config.command_capacity,
        event_capacity = config.event_capacity,
        "starting pipeline"
    );

    let cores = config.cores;

    // Consumers first, so a spawn failure never leaves a producer blocked on them
    let risk = spawn("risk", cores.map(|c| c.risk), move || run_risk(model, event_rx))?;

    let matcher = Matcher {
        engine,
        latency,
        events: event_tx,
        stats: MatcherStats::default(),
    };
    let matcher = spawn("matcher", cores.map(|c| c.matcher), move || matcher.run(cmd_rx))?;

    let feed_stop = stop.clone();
    let feed = match spawn("feed", cores.map(|c| c.feed), move || {
        run_feed(source, cmd_tx, feed_stop)
    }) {
        Ok(handle) => handle,
        Err(err) => {
            stop.cancel();
            return Err(err);
        }
    };

    let commands = join("feed", feed)?;
    info!(commands, "feed finished; draining");
    let matched = join("matcher", matcher)?;
    let risked = join("risk", risk)?;

    let report = PipelineReport {
        commands,
        accepted: matched.accepted,
        rejected: matched.rejected,
        canceled: matched.canceled,
        events_delivered: risked.events_delivered,
        metrics_emitted: risked.metrics_emitted,
        last_metric: risked.last_metric,
        resting_orders: matched.resting_orders,
        state_hash: matched.state_hash,
        latency: matched.latency,
    };
    info!(
        accepted = report.accepted,
        rejected = report.rejected,
        canceled = report.canceled,
        metrics = report.metrics_emitted,
        "pipeline stopped"
    );
    Ok(report)
}
