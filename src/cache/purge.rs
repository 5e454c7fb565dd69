use futures_util::future::join_all;
use tracing::{info, warn};

use crate::cache::OddsCache;
use crate::types::Tier;

impl OddsCache {
    /// Deletes every key in `keys`, returning how many deletes succeeded.
    async fn delete_keys(&self, keys: &[String]) -> usize {
        join_all(keys.iter().map(|k| self.store.del(k)))
            .await
            .into_iter()
            .filter(Result::is_ok)
            .count()
    }

    async fn purge_tier(&self, tier: Tier, fixture_id: i64) -> usize {
        let mut keys = match self.store.scan_prefix(&self.keys.snapshot_children(tier, fixture_id)).await {
            Ok(keys) => keys,
            Err(_) => {
                warn!(fixture_id, %tier, "scan failed, deleting snapshot only");
                Vec::new()
            }
        };
        keys.push(self.keys.snapshot(tier, fixture_id));
        self.delete_keys(&keys).await
    }

    /// Drops the snapshot, per-market keys and index of the tier `producer_id`
    /// reports into. Other tiers and fixture-level keys are left alone.
    pub async fn delete_all_markets(&self, producer_id: i64, fixture_id: i64) -> usize {
        let tier = self.tiers.tier_for(producer_id);
        let deleted = self.purge_tier(tier, fixture_id).await;
        info!(fixture_id, producer_id, %tier, deleted, "deleted fixture markets");
        deleted
    }

    /// Removes everything cached for the fixture in both tiers, including the
    /// producer assignment, default market, market count and sport.
    pub async fn delete_fixture_data(&self, fixture_id: i64) -> usize {
        let mut deleted = 0;
        for tier in Tier::ALL {
            deleted += self.purge_tier(tier, fixture_id).await;
        }
        let fixture_keys = [
            self.keys.producer(fixture_id),
            self.keys.default_market(fixture_id),
            self.keys.market_count(fixture_id),
            self.keys.sport(fixture_id),
        ];
        deleted += self.delete_keys(&fixture_keys).await;
        info!(fixture_id, deleted, "deleted fixture data");
        deleted
    }

    /// Removes every key under the namespace. Producer status keys live
    /// outside it and survive.
    pub async fn delete_all(&self) -> usize {
        let keys = match self.store.scan_prefix(&self.keys.all()).await {
            Ok(keys) => keys,
            Err(_) => return 0,
        };
        let deleted = self.delete_keys(&keys).await;
        warn!(namespace = self.keys.namespace(), deleted, "purged namespace");
        deleted
    }
}
