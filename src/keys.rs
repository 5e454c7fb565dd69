//! Cache key layout. Every key is a pure string composition of its inputs.
//!
//! ```text
//! <ns>:<tier>:match-<fixture>                         snapshot (array of markets)
//! <ns>:<tier>:match-<fixture>:market-<id>:<specifier> one market
//! <ns>:<tier>:match-<fixture>:keys                    index of populated market keys
//! <ns>:producer-id:<fixture>                          last producer id
//! <ns>:default-market-id:<fixture>                    latched default market
//! <ns>:market-count:<fixture>                         active market tally
//! <ns>:sport-id:<fixture>                             sport of the fixture
//! producer:status:<producer>                          written by the producer monitor
//! ```

use crate::types::Tier;

/// Stands in for an empty specifier inside keys. Real specifiers are
/// `name=value` pairs, so a token without `=` cannot collide with one.
pub const EMPTY_SPECIFIER: &str = "no-specifier";

#[derive(Debug, Clone)]
pub struct KeySchema {
    namespace: String,
}

impl KeySchema {
    pub fn new(namespace: impl Into<String>) -> Self {
        Self { namespace: namespace.into() }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn snapshot(&self, tier: Tier, fixture_id: i64) -> String {
        format!("{}:{}:match-{}", self.namespace, tier, fixture_id)
    }

    pub fn market(&self, tier: Tier, fixture_id: i64, market_id: i64, specifier: &str) -> String {
        format!(
            "{}:market-{}:{}",
            self.snapshot(tier, fixture_id),
            market_id,
            normalize_specifier(specifier)
        )
    }

    pub fn market_index(&self, tier: Tier, fixture_id: i64) -> String {
        format!("{}:keys", self.snapshot(tier, fixture_id))
    }

    /// Prefix shared by every per-market key and the index of one fixture+tier.
    pub fn snapshot_children(&self, tier: Tier, fixture_id: i64) -> String {
        format!("{}:", self.snapshot(tier, fixture_id))
    }

    pub fn producer(&self, fixture_id: i64) -> String {
        format!("{}:producer-id:{}", self.namespace, fixture_id)
    }

    pub fn default_market(&self, fixture_id: i64) -> String {
        format!("{}:default-market-id:{}", self.namespace, fixture_id)
    }

    pub fn market_count(&self, fixture_id: i64) -> String {
        format!("{}:market-count:{}", self.namespace, fixture_id)
    }

    pub fn sport(&self, fixture_id: i64) -> String {
        format!("{}:sport-id:{}", self.namespace, fixture_id)
    }

    /// Not namespaced: the producer monitor shares it across feed deployments.
    pub fn producer_status(&self, producer_id: i64) -> String {
        format!("producer:status:{producer_id}")
    }

    /// Prefix covering every namespaced key.
    pub fn all(&self) -> String {
        format!("{}:", self.namespace)
    }
}

pub fn normalize_specifier(specifier: &str) -> &str {
    if specifier.is_empty() {
        EMPTY_SPECIFIER
    } else {
        specifier
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn market_key_extends_snapshot_key() {
        let keys = KeySchema::new("odds");
        let snapshot = keys.snapshot(Tier::Live, 42);
        assert_eq!(snapshot, "odds:live:match-42");
        assert_eq!(
            keys.market(Tier::Live, 42, 18, "total=2.5"),
            "odds:live:match-42:market-18:total=2.5"
        );
        assert!(keys.market(Tier::Live, 42, 18, "").starts_with(&keys.snapshot_children(Tier::Live, 42)));
        assert!(keys.market_index(Tier::Live, 42).starts_with(&keys.snapshot_children(Tier::Live, 42)));
    }

    #[test]
    fn empty_specifier_uses_sentinel() {
        let keys = KeySchema::new("odds");
        assert_eq!(
            keys.market(Tier::PreMatch, 7, 1, ""),
            format!("odds:prematch:match-7:market-1:{EMPTY_SPECIFIER}")
        );
        assert_ne!(keys.market(Tier::PreMatch, 7, 1, ""), keys.market(Tier::PreMatch, 7, 1, "hcp=0:1"));
        assert!(!EMPTY_SPECIFIER.contains('='));
    }

    #[test]
    fn tiers_do_not_share_keys() {
        let keys = KeySchema::new("odds");
        assert_ne!(keys.snapshot(Tier::Live, 1), keys.snapshot(Tier::PreMatch, 1));
        assert_ne!(keys.market_index(Tier::Live, 1), keys.market_index(Tier::PreMatch, 1));
    }

    #[test]
    fn fixture_keys_are_namespaced() {
        let keys = KeySchema::new("feed-a");
        assert_eq!(keys.producer(9), "feed-a:producer-id:9");
        assert_eq!(keys.default_market(9), "feed-a:default-market-id:9");
        assert_eq!(keys.market_count(9), "feed-a:market-count:9");
        assert_eq!(keys.sport(9), "feed-a:sport-id:9");
        assert_eq!(keys.producer_status(3), "producer:status:3");
        assert!(keys.producer(9).starts_with(&keys.all()));
    }
}
