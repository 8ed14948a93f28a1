//! Latency Tracker - samples book-operation durations into an HDR histogram.
//!
//! The tracker is owned by the thread that times the operations; nothing here
//! is shared. Recording stops once the sample cap is reached so a long run
//! cannot grow the tracker's cost.

use std::fmt;
use std::time::Duration;

use hdrhistogram::{CreationError, Histogram};

/// Highest trackable latency: one second, in nanoseconds.
const MAX_TRACKABLE_NS: u64 = 1_000_000_000;

/// Collects nanosecond latency samples.
pub struct LatencyTracker {
    histogram: Histogram<u64>,
    max_samples: u64,
}

impl LatencyTracker {
    /// Create a tracker that keeps at most `max_samples` samples.
    pub fn new(max_samples: u64) -> Result<Self, CreationError> {
        Ok(Self {
            histogram: Histogram::new_with_bounds(1, MAX_TRACKABLE_NS, 3)?,
            max_samples,
        })
    }

    /// Record one measurement. Ignored once the cap is reached.
    #[inline]
    pub fn record(&mut self, elapsed: Duration) {
        if self.histogram.len() >= self.max_samples {
            return;
        }
        let ns = u64::try_from(elapsed.as_nanos()).unwrap_or(u64::MAX).max(1);
        self.histogram.saturating_record(ns);
    }

    /// Number of recorded samples.
    #[inline]
    pub fn samples(&self) -> u64 {
        self.histogram.len()
    }

    pub fn is_empty(&self) -> bool {
        self.histogram.is_empty()
    }

    /// Summary statistics, or `None` if nothing has been recorded.
    pub fn summary(&self) -> Option<LatencySummary> {
        if self.histogram.is_empty() {
            return None;
        }
        let h = &self.histogram;
        Some(LatencySummary {
            samples: h.len(),
            min: h.min(),
            mean: h.mean(),
            p50: h.value_at_quantile(0.50),
            p90: h.value_at_quantile(0.90),
            p99: h.value_at_quantile(0.99),
            p999: h.value_at_quantile(0.999),
            max: h.max(),
        })
    }

    pub fn reset(&mut self) {
        self.histogram.reset();
    }
}

impl fmt::Debug for LatencyTracker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LatencyTracker")
            .field("samples", &self.histogram.len())
            .field("max_samples", &self.max_samples)
            .finish()
    }
}

/// Latency distribution in nanoseconds.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LatencySummary {
    pub samples: u64,
    pub min: u64,
    pub mean: f64,
    pub p50: u64,
    pub p90: u64,
    pub p99: u64,
    pub p999: u64,
    pub max: u64,
}

impl fmt::Display for LatencySummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== Latency Report (ns) ===")?;
        writeln!(f, "Samples: {:8}", self.samples)?;
        writeln!(f, "Mean:    {:8.1}", self.mean)?;
        writeln!(f, "Min:     {:8}", self.min)?;
        writeln!(f, "P50:     {:8}", self.p50)?;
        writeln!(f, "P90:     {:8}", self.p90)?;
        writeln!(f, "P99:     {:8}", self.p99)?;
        writeln!(f, "P99.9:   {:8}", self.p999)?;
        write!(f, "Max:     {:8}", self.max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_tracker() {
        let tracker = LatencyTracker::new(10).unwrap();
        assert!(tracker.is_empty());
        assert!(tracker.summary().is_none());
    }

    #[test]
    fn test_records_and_summarizes() {
        let mut tracker = LatencyTracker::new(1_000).unwrap();
        for ns in 1..=100u64 {
            tracker.record(Duration::from_nanos(ns));
        }
        let summary = tracker.summary().unwrap();
        assert_eq!(summary.samples, 100);
        assert_eq!(summary.min, 1);
        assert_eq!(summary.max, 100);
        assert_eq!(summary.p50, 50);
        assert!((summary.mean - 50.5).abs() < 0.5);
    }

    #[test]
    fn test_sample_cap() {
        let mut tracker = LatencyTracker::new(3).unwrap();
        for _ in 0..10 {
            tracker.record(Duration::from_nanos(20));
        }
        assert_eq!(tracker.samples(), 3);
    }

    #[test]
    fn test_zero_and_huge_durations_are_clamped() {
        let mut tracker = LatencyTracker::new(10).unwrap();
        tracker.record(Duration::ZERO);
        tracker.record(Duration::from_secs(60));
        let summary = tracker.summary().unwrap();
        assert_eq!(summary.samples, 2);
        assert_eq!(summary.min, 1);
        assert!(summary.max >= MAX_TRACKABLE_NS);
    }

    #[test]
    fn test_summary_display() {
        let mut tracker = LatencyTracker::new(10).unwrap();
        tracker.record(Duration::from_nanos(42));
        let text = tracker.summary().unwrap().to_string();
        assert!(text.contains("P99:"));
        assert!(text.contains("42"));
    }
}
