use tracing::debug;

use crate::cache::OddsCache;
use crate::config::{FALLBACK_DEFAULT_MARKET, SOCCER_DEFAULT_MARKET, SOCCER_SPORT_ID};
use crate::types::Market;

/// Picks the first market of a batch, in arrival order, whose id is on the
/// priority list and which carries outcomes. Priority order does not rank
/// candidates; the list is only an eligibility set.
#[derive(Debug)]
pub struct DefaultMarketSelector<'a> {
    priority: &'a [i64],
    candidate: Option<i64>,
}

impl<'a> DefaultMarketSelector<'a> {
    pub fn new(priority: &'a [i64]) -> Self {
        Self { priority, candidate: None }
    }

    pub fn observe(&mut self, market: &Market) {
        if self.candidate.is_none()
            && !market.outcomes.is_empty()
            && self.priority.contains(&market.market_id)
        {
            self.candidate = Some(market.market_id);
        }
    }

    pub fn candidate(&self) -> Option<i64> {
        self.candidate
    }
}

impl OddsCache {
    /// Persists `candidate` unless the fixture already has a default market.
    /// Once set, the value is never replaced by later candidates.
    pub(crate) async fn latch_default_market(&self, fixture_id: i64, candidate: Option<i64>) {
        let Some(market_id) = candidate else {
            return;
        };
        let key = self.keys.default_market(fixture_id);
        match self.store.get_i64(&key).await {
            Ok(Some(existing)) if existing > 0 => {
                debug!(fixture_id, existing, candidate = market_id, "default market already latched");
            }
            Ok(_) => {
                if self.store.set_i64(&key, market_id).await.is_ok() {
                    debug!(fixture_id, market_id, "default market latched");
                }
            }
            // Unknown current value: leave it rather than risk overwriting a latch.
            Err(_) => {}
        }
    }

    /// Latched default market, else 1 for soccer and 186 for other sports.
    pub async fn default_market_id(&self, fixture_id: i64, sport_id: i64) -> i64 {
        let latched = self
            .store
            .get_i64(&self.keys.default_market(fixture_id))
            .await
            .ok()
            .flatten()
            .unwrap_or(0);
        if latched > 0 {
            return latched;
        }
        if sport_id == SOCCER_SPORT_ID {
            SOCCER_DEFAULT_MARKET
        } else {
            FALLBACK_DEFAULT_MARKET
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::testkit::{market, odds_change, status_only, Harness};
    use crate::config::DEFAULT_MARKET_PRIORITY;

    #[test]
    fn first_eligible_market_in_arrival_order_wins() {
        let mut selector = DefaultMarketSelector::new(DEFAULT_MARKET_PRIORITY);
        selector.observe(&market(18, "total=2.5", 1.9));
        selector.observe(&market(219, "", 1.9));
        selector.observe(&market(1, "", 1.9));
        assert_eq!(selector.candidate(), Some(219));
    }

    #[test]
    fn market_without_outcomes_is_not_eligible() {
        let mut selector = DefaultMarketSelector::new(DEFAULT_MARKET_PRIORITY);
        selector.observe(&status_only(1, "", 1, "suspended"));
        assert_eq!(selector.candidate(), None);
        selector.observe(&market(186, "", 2.0));
        assert_eq!(selector.candidate(), Some(186));
    }

    #[tokio::test]
    async fn latch_keeps_first_value_across_updates() {
        let h = Harness::new();
        h.cache
            .apply_odds_change(&odds_change(30, 3, vec![market(219, "", 1.8)]))
            .await
            .unwrap();
        h.cache
            .apply_odds_change(&odds_change(30, 3, vec![market(1, "", 2.2)]))
            .await
            .unwrap();
        assert_eq!(h.cache.default_market_id(30, 1).await, 219);
    }

    #[tokio::test]
    async fn fallback_depends_on_sport() {
        let h = Harness::new();
        assert_eq!(h.cache.default_market_id(31, 1).await, 1);
        assert_eq!(h.cache.default_market_id(31, 2).await, 186);
    }
}
