use std::collections::HashSet;

use tracing::debug;

use crate::cache::OddsCache;
use crate::types::{Market, MarketOrder, OddsDetails, Tier};

/// Markets on the list first, in list order, then every other market in
/// stored order. Each list entry emits every stored line with its id in
/// stored order, so a repeated id is emitted twice.
pub fn order_by_list(markets: &[Market], order: &[MarketOrder]) -> Vec<Market> {
    let listed: HashSet<i64> = order.iter().map(|o| o.market_id).collect();
    let (in_list, others): (Vec<&Market>, Vec<&Market>) =
        markets.iter().partition(|m| listed.contains(&m.market_id));

    let mut ordered: Vec<Market> = order
        .iter()
        .flat_map(|o| in_list.iter().filter(move |m| m.market_id == o.market_id))
        .map(|m| (*m).clone())
        .collect();
    ordered.extend(others.into_iter().cloned());
    ordered
}

/// Only the markets on the list, in list order with every stored line of
/// each id, renamed when the entry carries a display name.
pub fn select_specified(markets: &[Market], list: &[MarketOrder]) -> Vec<Market> {
    list.iter()
        .flat_map(|entry| {
            markets
                .iter()
                .filter(move |m| m.market_id == entry.market_id)
                .map(move |m| {
                    let mut market = m.clone();
                    if !entry.name.is_empty() {
                        market.name = entry.name.clone();
                    }
                    market
                })
        })
        .collect()
}

impl OddsCache {
    /// Snapshot array for a fixture+tier without triggering recovery.
    async fn load_snapshot(&self, tier: Tier, fixture_id: i64) -> Option<Vec<Market>> {
        self.store
            .get_json::<Vec<Market>>(&self.keys.snapshot(tier, fixture_id))
            .await
            .ok()
            .flatten()
    }

    fn miss(&self, fixture_id: i64, what: &'static str) {
        debug!(fixture_id, what, "cache miss, requesting recovery");
        self.recovery.request(fixture_id);
    }

    pub async fn all_markets(&self, fixture_id: i64) -> Option<Vec<Market>> {
        let (tier, _) = self.read_tier(fixture_id).await;
        let markets = self.load_snapshot(tier, fixture_id).await;
        if markets.is_none() {
            self.miss(fixture_id, "snapshot");
        }
        markets
    }

    /// Reads the per-market key directly, not the snapshot array.
    pub async fn market(&self, fixture_id: i64, market_id: i64, specifier: &str) -> Option<Market> {
        let (tier, _) = self.read_tier(fixture_id).await;
        let key = self.keys.market(tier, fixture_id, market_id, specifier);
        let market = self.store.get_json::<Market>(&key).await.ok().flatten();
        if market.is_none() {
            self.miss(fixture_id, "market");
        }
        market
    }

    /// Resolves one outcome. When the per-market key is missing the snapshot
    /// array is searched instead, since the two can briefly disagree after a
    /// partial update.
    pub async fn odds(
        &self,
        fixture_id: i64,
        market_id: i64,
        specifier: &str,
        outcome_id: &str,
    ) -> Option<OddsDetails> {
        let (tier, producer_id) = self.read_tier(fixture_id).await;
        let sport_id = self
            .store
            .get_i64(&self.keys.sport(fixture_id))
            .await
            .ok()
            .flatten()
            .unwrap_or(0);

        let key = self.keys.market(tier, fixture_id, market_id, specifier);
        let direct = self.store.get_json::<Market>(&key).await.ok().flatten();

        let details = match direct {
            Some(market) => market
                .outcome(outcome_id)
                .map(|o| OddsDetails::from_market(&market, o, fixture_id, sport_id, producer_id)),
            None => self.load_snapshot(tier, fixture_id).await.and_then(|markets| {
                markets
                    .iter()
                    .filter(|m| m.market_id == market_id && m.specifier == specifier)
                    .find_map(|m| {
                        m.outcome(outcome_id)
                            .map(|o| OddsDetails::from_market(m, o, fixture_id, sport_id, producer_id))
                    })
            }),
        };

        if details.is_none() {
            self.miss(fixture_id, "outcome");
        }
        details
    }

    pub async fn all_markets_ordered_by(
        &self,
        fixture_id: i64,
        order: &[MarketOrder],
    ) -> Option<Vec<Market>> {
        let markets = self.all_markets(fixture_id).await?;
        Some(order_by_list(&markets, order))
    }

    pub async fn specified_markets(
        &self,
        fixture_id: i64,
        list: &[MarketOrder],
    ) -> Option<Vec<Market>> {
        let markets = self.all_markets(fixture_id).await?;
        Some(select_specified(&markets, list))
    }
}
