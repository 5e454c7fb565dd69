//! In-memory latency histograms for ingestion instrumentation.
//! Records time from call entry to the last cache write.

use std::sync::Mutex;
use std::time::Duration;

use serde::Serialize;

/// Shared latency stats. Ingestion records, API reads.
/// Values stored in microseconds.
pub struct LatencyStats {
    inner: Mutex<hdrhistogram::Histogram<u64>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LatencySummary {
    pub samples: u64,
    pub p50_us: Option<u64>,
    pub p95_us: Option<u64>,
    pub p99_us: Option<u64>,
}

impl LatencyStats {
    /// Create a new histogram. Tracks 1us to 100s, 3 significant figures.
    pub fn new() -> Self {
        let histogram = hdrhistogram::Histogram::new_with_bounds(1, 100_000_000, 3)
            .expect("valid histogram bounds");
        Self {
            inner: Mutex::new(histogram),
        }
    }

    /// Record a latency in microseconds. Values past the upper bound saturate.
    pub fn record_us(&self, us: u64) {
        if let Ok(mut h) = self.inner.lock() {
            let _ = h.saturating_record(us.max(1));
        }
    }

    pub fn record(&self, d: Duration) {
        let us = d.as_micros().min(u128::from(u64::MAX)) as u64;
        self.record_us(us);
    }

    /// Return (p50_us, p95_us, p99_us). None if no samples.
    pub fn percentiles(&self) -> (Option<u64>, Option<u64>, Option<u64>) {
        let Ok(h) = self.inner.lock() else {
            return (None, None, None);
        };
        if h.len() == 0 {
            return (None, None, None);
        }
        let p50 = h.value_at_quantile(0.5);
        let p95 = h.value_at_quantile(0.95);
        let p99 = h.value_at_quantile(0.99);
        (Some(p50), Some(p95), Some(p99))
    }

    /// Sample count.
    pub fn len(&self) -> u64 {
        self.inner.lock().map(|h| h.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn summary(&self) -> LatencySummary {
        let (p50_us, p95_us, p99_us) = self.percentiles();
        LatencySummary { samples: self.len(), p50_us, p95_us, p99_us }
    }
}

impl Default for LatencyStats {
    fn default() -> Self {
        Self::new()
    }
}

/// One histogram per ingestion path.
#[derive(Default)]
pub struct IngestLatency {
    pub odds_change: LatencyStats,
    pub bet_stop: LatencyStats,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_histogram_has_no_percentiles() {
        let stats = LatencyStats::new();
        assert!(stats.is_empty());
        assert_eq!(stats.percentiles(), (None, None, None));
    }

    #[test]
    fn percentiles_track_recorded_values() {
        let stats = LatencyStats::new();
        for us in 1..=100u64 {
            stats.record_us(us * 10);
        }
        let summary = stats.summary();
        assert_eq!(summary.samples, 100);
        let p50 = summary.p50_us.unwrap();
        assert!((495..=505).contains(&p50), "p50={p50}");
        assert!(summary.p99_us.unwrap() >= summary.p50_us.unwrap());
    }
}
