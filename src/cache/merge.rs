use std::collections::HashMap;
use std::time::Instant;

use futures_util::future::join_all;
use tracing::{debug, info, warn};

use crate::cache::{now_ms, now_ns, DefaultMarketSelector, OddsCache};
use crate::types::{Market, OddsChange, Tier};

// ---------------------------------------------------------------------------
// WorkingSet
// ---------------------------------------------------------------------------

/// Market keys of one fixture+tier in index order, each with its record once
/// loaded. `None` means the key is indexed but its value has not been read.
#[derive(Debug, Default)]
struct WorkingSet {
    order: Vec<String>,
    records: HashMap<String, Option<Market>>,
}

impl WorkingSet {
    fn seed(&mut self, key: String, record: Option<Market>) {
        if !self.records.contains_key(&key) {
            self.order.push(key.clone());
            self.records.insert(key, record);
        }
    }

    fn put(&mut self, key: String, record: Market) {
        match self.records.get_mut(&key) {
            Some(slot) => *slot = Some(record),
            None => {
                self.order.push(key.clone());
                self.records.insert(key, Some(record));
            }
        }
    }

    fn loaded(&self, key: &str) -> Option<&Market> {
        self.records.get(key).and_then(Option::as_ref)
    }

    fn unloaded_keys(&self) -> Vec<String> {
        self.order
            .iter()
            .filter(|k| matches!(self.records.get(*k), Some(None)))
            .cloned()
            .collect()
    }

    fn forget(&mut self, key: &str) {
        self.records.remove(key);
        self.order.retain(|k| k != key);
    }

    /// Loaded records in index order, with their keys.
    fn into_parts(mut self) -> (Vec<String>, Vec<Market>) {
        let mut keys = Vec::with_capacity(self.order.len());
        let mut markets = Vec::with_capacity(self.order.len());
        for key in self.order {
            if let Some(Some(market)) = self.records.remove(&key) {
                keys.push(key);
                markets.push(market);
            }
        }
        (keys, markets)
    }
}

pub fn active_market_count(markets: &[Market]) -> i64 {
    markets.iter().filter(|m| m.is_active()).count() as i64
}

// ---------------------------------------------------------------------------
// Merge engine
// ---------------------------------------------------------------------------

impl OddsCache {
    /// Merges a batch of market updates into the fixture's cached snapshot and
    /// returns how many markets were written.
    ///
    /// Markets with outcomes replace the stored record for their key. Markets
    /// without outcomes only change `status`/`status_name` of a record that
    /// already exists. Markets absent from the batch are carried over from the
    /// store. Store failures are logged and the affected market skipped, so
    /// this never returns `Err`.
    pub async fn apply_odds_change(&self, odds: &OddsChange) -> crate::error::Result<usize> {
        let started = Instant::now();
        let fixture_id = odds.fixture_id;
        let debug_fixture = self.cfg.is_debug_fixture(fixture_id);

        if debug_fixture {
            info!(
                fixture_id,
                markets = odds.markets.len(),
                payload = %serde_json::to_string(odds).unwrap_or_default(),
                "odds change received"
            );
        }

        // Score and match-status events carry no markets; another consumer owns them.
        if odds.markets.is_empty() {
            if debug_fixture {
                info!(fixture_id, "no markets in odds change");
            }
            return Ok(0);
        }

        let tier = self.tiers.tier_for(odds.producer_id);
        self.set_producer_id(fixture_id, odds.producer_id).await;
        if odds.sport_id > 0 {
            let _ = self.store.set_i64(&self.keys.sport(fixture_id), odds.sport_id).await;
        }

        let snapshot_key = self.keys.snapshot(tier, fixture_id);
        let fresh = match self.store.exists(&snapshot_key).await {
            Ok(found) => !found,
            Err(_) => {
                // Treating the fixture as new would overwrite every untouched market.
                warn!(fixture_id, %tier, "cannot tell if snapshot exists, skipping odds change");
                self.report_odds_change_latency(odds, started);
                return Ok(0);
            }
        };

        let mut working = if fresh {
            WorkingSet::default()
        } else {
            self.load_working_set(tier, fixture_id, debug_fixture).await
        };

        let mut selector = DefaultMarketSelector::new(&self.cfg.default_market_priority);
        let mut processed = 0usize;

        for incoming in &odds.markets {
            let key = self.keys.market(tier, fixture_id, incoming.market_id, &incoming.specifier);

            if incoming.is_status_only() {
                if fresh {
                    continue;
                }
                let prior = match working.loaded(&key) {
                    Some(record) => Some(record.clone()),
                    None => self.store.get_json::<Market>(&key).await.ok().flatten(),
                };
                let Some(mut record) = prior else {
                    debug!(fixture_id, key = %key, "status update for unknown market ignored");
                    continue;
                };
                record.status = incoming.status;
                record.status_name = incoming.status_name.clone();
                if self.store.set_json(&key, &record).await.is_ok() {
                    working.put(key, record);
                    processed += 1;
                }
                continue;
            }

            if self.store.set_json(&key, incoming).await.is_ok() {
                selector.observe(incoming);
                working.put(key, incoming.clone());
                processed += 1;
            }
        }

        self.refetch_untouched(&mut working, fixture_id, debug_fixture).await;

        let (index, merged) = working.into_parts();
        if merged.is_empty() {
            debug!(fixture_id, %tier, "nothing to persist for odds change");
            self.report_odds_change_latency(odds, started);
            return Ok(processed);
        }

        let _ = self.store.set_json(&snapshot_key, &merged).await;
        let _ = self.store.set_json(&self.keys.market_index(tier, fixture_id), &index).await;
        self.latch_default_market(fixture_id, selector.candidate()).await;
        let active = active_market_count(&merged);
        let _ = self.store.set_i64(&self.keys.market_count(fixture_id), active).await;

        self.report_odds_change_latency(odds, started);

        debug!(
            fixture_id,
            %tier,
            processed,
            total = merged.len(),
            active,
            fresh,
            "odds change applied"
        );
        Ok(processed)
    }

    /// Seeds the working set from the market-key index. When the index is
    /// missing or unreadable it is rebuilt from the snapshot array instead.
    async fn load_working_set(&self, tier: Tier, fixture_id: i64, debug_fixture: bool) -> WorkingSet {
        let mut working = WorkingSet::default();
        let index_key = self.keys.market_index(tier, fixture_id);

        match self.store.get_json::<Vec<String>>(&index_key).await {
            Ok(Some(keys)) => {
                if debug_fixture {
                    info!(fixture_id, keys = ?keys, "loaded market keys");
                }
                for key in keys {
                    working.seed(key, None);
                }
            }
            _ => {
                warn!(fixture_id, %tier, "market key index unavailable, rebuilding from snapshot");
                let snapshot_key = self.keys.snapshot(tier, fixture_id);
                if let Ok(Some(markets)) = self.store.get_json::<Vec<Market>>(&snapshot_key).await {
                    for market in markets {
                        let key = self.keys.market(tier, fixture_id, market.market_id, &market.specifier);
                        working.seed(key, Some(market));
                    }
                }
            }
        }
        working
    }

    /// Reads back every indexed market the batch did not touch so it survives
    /// into the rebuilt snapshot. Keys that vanished or no longer parse drop
    /// out of the index.
    async fn refetch_untouched(&self, working: &mut WorkingSet, fixture_id: i64, debug_fixture: bool) {
        let keys = working.unloaded_keys();
        if keys.is_empty() {
            return;
        }
        let fetched = join_all(keys.iter().map(|k| self.store.get_json::<Market>(k))).await;
        for (key, result) in keys.into_iter().zip(fetched) {
            match result {
                Ok(Some(market)) => {
                    if debug_fixture {
                        info!(fixture_id, key = %key, "carried over untouched market");
                    }
                    working.put(key, market);
                }
                Ok(None) => {
                    debug!(fixture_id, key = %key, "indexed market key vanished");
                    working.forget(&key);
                }
                Err(_) => working.forget(&key),
            }
        }
    }

    fn report_odds_change_latency(&self, odds: &OddsChange, started: Instant) {
        let elapsed = started.elapsed();
        self.latency.odds_change.record(elapsed);
        self.health.set_last_ingest_at_ns(now_ns());

        if odds.event_timestamp <= 0 {
            return;
        }
        let now = now_ms();
        let ttl = now - odds.event_timestamp;
        if ttl > self.cfg.latency_budget_ms {
            let processing = if odds.received_at > 0 {
                now - odds.received_at
            } else {
                elapsed.as_millis() as i64
            };
            let queueing = if odds.received_at > 0 && odds.publish_timestamp > 0 {
                odds.received_at - odds.publish_timestamp
            } else {
                0
            };
            // TODO: page on-call when this fires more than 5 times a minute.
            warn!(
                producer_id = odds.producer_id,
                fixture_id = odds.fixture_id,
                ttl_ms = ttl,
                processing_ms = processing,
                queueing_ms = queueing,
                publisher_ms = odds.publisher_processing_ms,
                "OddsChange over latency budget | {ttl}ms | processing {processing}ms | queueing {queueing}ms | publisher {}ms",
                odds.publisher_processing_ms,
            );
        }
    }
}
