use tracing::debug;

use crate::cache::OddsCache;
use crate::types::{ProducerAssignment, Tier};

/// Maps the producer that reported an update to the tier its data lives in.
#[derive(Debug, Clone)]
pub struct TierRouter {
    live_producers: Vec<i64>,
}

impl TierRouter {
    pub fn new(live_producers: Vec<i64>) -> Self {
        Self { live_producers }
    }

    pub fn tier_for(&self, producer_id: i64) -> Tier {
        if self.live_producers.contains(&producer_id) {
            Tier::Live
        } else {
            Tier::PreMatch
        }
    }
}

impl OddsCache {
    pub fn tier_for(&self, producer_id: i64) -> Tier {
        self.tiers.tier_for(producer_id)
    }

    /// Records `producer_id` as the fixture's current producer. Last write wins.
    pub async fn set_producer_id(&self, fixture_id: i64, producer_id: i64) -> bool {
        self.store
            .set_i64(&self.keys.producer(fixture_id), producer_id)
            .await
            .is_ok()
    }

    /// Current producer for the fixture and that producer's status. Missing or
    /// unreadable values come back as 0.
    pub async fn producer_assignment(&self, fixture_id: i64) -> ProducerAssignment {
        let producer_id = self
            .store
            .get_i64(&self.keys.producer(fixture_id))
            .await
            .ok()
            .flatten()
            .unwrap_or(0);
        let status = if producer_id == 0 {
            0
        } else {
            self.store
                .get_i64(&self.keys.producer_status(producer_id))
                .await
                .ok()
                .flatten()
                .unwrap_or(0)
        };
        ProducerAssignment { producer_id, status }
    }

    /// Tier for reads, derived from the stored producer assignment.
    pub(crate) async fn read_tier(&self, fixture_id: i64) -> (Tier, i64) {
        let producer_id = self
            .store
            .get_i64(&self.keys.producer(fixture_id))
            .await
            .ok()
            .flatten()
            .unwrap_or(0);
        let tier = self.tiers.tier_for(producer_id);
        debug!(fixture_id, producer_id, %tier, "resolved read tier");
        (tier, producer_id)
    }
}
