//! Shared health state for the /health endpoint.
//! Updated by the snapshot store, the ingestion paths, and the recovery pipeline.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Shared health counters. Updated by cache components, read by API.
#[derive(Default)]
pub struct HealthState {
    /// Nanosecond timestamp of the last applied odds change or bet stop (0 = none).
    pub last_ingest_at_ns: AtomicU64,
    /// Store calls that failed or timed out since start.
    pub store_failures: AtomicU64,
    /// Recovery requests handed to the worker since start.
    pub recovery_requested: AtomicU64,
    /// Recovery requests dropped (full channel) or rejected by the bus.
    pub recovery_failures: AtomicU64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct HealthSnapshot {
    pub last_ingest_at_ns: u64,
    pub store_failures: u64,
    pub recovery_requested: u64,
    pub recovery_failures: u64,
}

impl HealthState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_last_ingest_at_ns(&self, ns: u64) {
        self.last_ingest_at_ns.store(ns, Ordering::Relaxed);
    }

    pub fn inc_store_failures(&self) {
        self.store_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_recovery_requested(&self) {
        self.recovery_requested.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_recovery_failures(&self) {
        self.recovery_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn store_failures(&self) -> u64 {
        self.store_failures.load(Ordering::Relaxed)
    }

    pub fn recovery_requested(&self) -> u64 {
        self.recovery_requested.load(Ordering::Relaxed)
    }

    pub fn recovery_failures(&self) -> u64 {
        self.recovery_failures.load(Ordering::Relaxed)
    }

    pub fn snapshot(&self) -> HealthSnapshot {
        HealthSnapshot {
            last_ingest_at_ns: self.last_ingest_at_ns.load(Ordering::Relaxed),
            store_failures: self.store_failures(),
            recovery_requested: self.recovery_requested(),
            recovery_failures: self.recovery_failures(),
        }
    }
}
