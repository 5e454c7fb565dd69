use std::time::Instant;

use futures_util::future::join_all;
use tracing::{debug, warn};

use crate::cache::merge::active_market_count;
use crate::cache::{now_ms, now_ns, OddsCache};
use crate::error::{CacheError, Result};
use crate::types::{BetStop, Market};

impl OddsCache {
    /// Applies a blanket status to every cached market of the fixture's tier.
    /// Outcomes are left alone; a later odds change reopens the markets.
    ///
    /// Fails with [`CacheError::UnknownFixture`] when the tier has no snapshot,
    /// in which case nothing is written.
    pub async fn apply_bet_stop(&self, stop: &BetStop) -> Result<()> {
        let started = Instant::now();
        let arrival = now_ms();
        let fixture_id = stop.fixture_id;
        let tier = self.tiers.tier_for(stop.producer_id);
        let snapshot_key = self.keys.snapshot(tier, fixture_id);

        let mut markets = match self.store.get_json::<Vec<Market>>(&snapshot_key).await {
            Ok(Some(markets)) => markets,
            _ => {
                warn!(fixture_id, producer_id = stop.producer_id, %tier, "bet stop for fixture with no snapshot");
                return Err(CacheError::UnknownFixture(fixture_id));
            }
        };

        self.set_producer_id(fixture_id, stop.producer_id).await;

        for market in &mut markets {
            market.status = stop.status;
            market.status_name = stop.status_name.clone();
        }

        let writes = markets.iter().map(|m| {
            let key = self.keys.market(tier, fixture_id, m.market_id, &m.specifier);
            async move { self.store.set_json(&key, m).await }
        });
        let failed = join_all(writes).await.iter().filter(|r| r.is_err()).count();

        let _ = self.store.set_json(&snapshot_key, &markets).await;
        let _ = self
            .store
            .set_i64(&self.keys.market_count(fixture_id), active_market_count(&markets))
            .await;

        self.report_bet_stop_latency(stop, started, arrival);

        debug!(
            fixture_id,
            %tier,
            status = stop.status,
            markets = markets.len(),
            failed,
            "bet stop applied"
        );
        Ok(())
    }

    fn report_bet_stop_latency(&self, stop: &BetStop, started: Instant, arrival: i64) {
        let elapsed = started.elapsed();
        self.latency.bet_stop.record(elapsed);
        self.health.set_last_ingest_at_ns(now_ns());

        if stop.event_timestamp <= 0 {
            return;
        }
        let now = now_ms();
        let ttl = now - stop.event_timestamp;
        if ttl > self.cfg.latency_budget_ms {
            let processing = now - arrival;
            let waiting = if stop.publish_timestamp > 0 { arrival - stop.publish_timestamp } else { 0 };
            warn!(
                producer_id = stop.producer_id,
                fixture_id = stop.fixture_id,
                ttl_ms = ttl,
                processing_ms = processing,
                waiting_ms = waiting,
                publisher_ms = stop.publisher_processing_ms,
                network_latency_ms = stop.network_latency_ms,
                "BetStop over latency budget | {ttl}ms | processing {processing}ms | waiting {waiting}ms | publisher {}ms | latency {}ms",
                stop.publisher_processing_ms,
                stop.network_latency_ms,
            );
        }
    }
}
