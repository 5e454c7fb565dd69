//! Odds cache and reconciliation engine.
//!
//! One `OddsCache` is built at startup and shared behind an `Arc`. Writers
//! (`apply_odds_change`, `apply_bet_stop`) and readers run concurrently
//! against the same store with no cross-key locking: last write wins per key.

pub mod bet_stop;
pub mod default_market;
pub mod merge;
pub mod purge;
pub mod tier;
pub mod views;

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::api::health::HealthState;
use crate::api::latency::IngestLatency;
use crate::config::CacheConfig;
use crate::keys::KeySchema;
use crate::recovery::RecoveryPublisher;
use crate::store::{KvStore, SnapshotStore};

pub use default_market::DefaultMarketSelector;
pub use tier::TierRouter;
pub use views::{order_by_list, select_specified};

pub struct OddsCache {
    store: SnapshotStore,
    keys: KeySchema,
    tiers: TierRouter,
    cfg: CacheConfig,
    recovery: RecoveryPublisher,
    health: Arc<HealthState>,
    latency: Arc<IngestLatency>,
}

impl OddsCache {
    pub fn new(
        kv: Arc<dyn KvStore>,
        recovery: RecoveryPublisher,
        cfg: CacheConfig,
        health: Arc<HealthState>,
        latency: Arc<IngestLatency>,
    ) -> Self {
        Self {
            store: SnapshotStore::new(kv, cfg.op_timeout, Arc::clone(&health)),
            keys: KeySchema::new(cfg.namespace.clone()),
            tiers: TierRouter::new(cfg.live_producers.clone()),
            cfg,
            recovery,
            health,
            latency,
        }
    }

    pub fn keys(&self) -> &KeySchema {
        &self.keys
    }

    pub fn config(&self) -> &CacheConfig {
        &self.cfg
    }

    pub fn health(&self) -> &Arc<HealthState> {
        &self.health
    }

    pub fn latency(&self) -> &Arc<IngestLatency> {
        &self.latency
    }
}

fn now_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as i64
}

fn now_ns() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos() as u64
}

// ---------------------------------------------------------------------------
// Test fixtures shared by the cache submodules
// ---------------------------------------------------------------------------
