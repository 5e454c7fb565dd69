use serde::{Deserialize, Serialize};

/// Market statuses that count as open for betting. 0 is active, 5 is the
/// feed's "active but handed over" variant.
pub const ACTIVE_MARKET_STATUSES: [i64; 2] = [0, 5];

// ---------------------------------------------------------------------------
// Market
// ---------------------------------------------------------------------------

/// One selectable option within a market.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Outcome {
    #[serde(rename = "outcome_id")]
    pub id: String,
    #[serde(rename = "outcome_name", default)]
    pub name: String,
    #[serde(default)]
    pub odds: f64,
    /// 1 = surface the price in a UI, 0 = hide it.
    #[serde(default)]
    pub active: i64,
    #[serde(default)]
    pub probability: f64,
}

/// A bettable proposition for a fixture. `(market_id, specifier)` identifies
/// it within a fixture and tier. An empty specifier is kept empty here; only
/// cache keys substitute a sentinel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Market {
    #[serde(rename = "market_url", default)]
    pub url: String,
    #[serde(rename = "market_name", default)]
    pub name: String,
    pub market_id: i64,
    #[serde(rename = "specifiers", default)]
    pub specifier: String,
    #[serde(default)]
    pub status_name: String,
    /// 0 = active, 5 = active variant, anything else suspended or closed.
    #[serde(default)]
    pub status: i64,
    #[serde(rename = "outcome", default)]
    pub outcomes: Vec<Outcome>,
}

impl Market {
    pub fn is_status_only(&self) -> bool {
        self.outcomes.is_empty()
    }

    /// Open for betting and carrying at least one priced outcome.
    pub fn is_active(&self) -> bool {
        ACTIVE_MARKET_STATUSES.contains(&self.status) && !self.outcomes.is_empty()
    }

    pub fn outcome(&self, outcome_id: &str) -> Option<&Outcome> {
        self.outcomes.iter().find(|o| o.id == outcome_id)
    }
}

// ---------------------------------------------------------------------------
// Tier
// ---------------------------------------------------------------------------

/// Storage bucket a fixture's markets are filed under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    Live,
    PreMatch,
}

impl Tier {
    pub const ALL: [Tier; 2] = [Tier::Live, Tier::PreMatch];

    pub fn as_str(&self) -> &'static str {
        match self {
            Tier::Live => "live",
            Tier::PreMatch => "prematch",
        }
    }
}

impl std::fmt::Display for Tier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Last producer seen for a fixture plus that producer's operational status
/// (0 when unknown).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ProducerAssignment {
    pub producer_id: i64,
    pub status: i64,
}

// ---------------------------------------------------------------------------
// Ingestion messages
// ---------------------------------------------------------------------------

/// An "odds changed" event for one fixture. Timestamps are epoch milliseconds.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OddsChange {
    #[serde(rename = "match_id")]
    pub fixture_id: i64,
    pub producer_id: i64,
    #[serde(default)]
    pub sport_id: i64,
    /// When the upstream feed generated the event.
    #[serde(rename = "betradar_timestamp", default)]
    pub event_timestamp: i64,
    /// When the publisher put the event on the queue.
    #[serde(default)]
    pub publish_timestamp: i64,
    /// When our consumer pulled it off the queue.
    #[serde(rename = "consumer_arrival_time", default)]
    pub received_at: i64,
    /// Publisher-side processing time in milliseconds.
    #[serde(rename = "processing_time", default)]
    pub publisher_processing_ms: i64,
    #[serde(default)]
    pub markets: Vec<Market>,
}

/// A "betting suspended" event: every market of the fixture's tier takes
/// `status`/`status_name`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BetStop {
    #[serde(rename = "match_id")]
    pub fixture_id: i64,
    pub producer_id: i64,
    pub status: i64,
    #[serde(default)]
    pub status_name: String,
    #[serde(rename = "betradar_timestamp", default)]
    pub event_timestamp: i64,
    #[serde(default)]
    pub publish_timestamp: i64,
    #[serde(rename = "processing_time", default)]
    pub publisher_processing_ms: i64,
    #[serde(default)]
    pub network_latency_ms: i64,
}

// ---------------------------------------------------------------------------
// Read projections
// ---------------------------------------------------------------------------

/// Caller-supplied ordering entry. A non-empty `name` replaces the stored
/// market name in `specified_markets`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MarketOrder {
    pub market_id: i64,
    #[serde(default)]
    pub name: String,
}

impl MarketOrder {
    pub fn new(market_id: i64) -> Self {
        Self { market_id, name: String::new() }
    }
}

/// A single outcome resolved together with its market context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OddsDetails {
    pub sport_id: i64,
    #[serde(rename = "match_id")]
    pub fixture_id: i64,
    pub market_id: i64,
    pub market_name: String,
    pub specifier: String,
    pub outcome_id: String,
    pub outcome_name: String,
    pub status: i64,
    pub status_name: String,
    pub active: i64,
    pub odds: f64,
    pub probability: f64,
    pub producer_id: i64,
}

impl OddsDetails {
    pub fn from_market(
        market: &Market,
        outcome: &Outcome,
        fixture_id: i64,
        sport_id: i64,
        producer_id: i64,
    ) -> Self {
        Self {
            sport_id,
            fixture_id,
            market_id: market.market_id,
            market_name: market.name.clone(),
            specifier: market.specifier.clone(),
            outcome_id: outcome.id.clone(),
            outcome_name: outcome.name.clone(),
            status: market.status,
            status_name: market.status_name.clone(),
            active: outcome.active,
            odds: outcome.odds,
            probability: outcome.probability,
            producer_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn market_decodes_feed_field_names() {
        let raw = r#"{"market_url":"","market_name":"1x2","market_id":1,"specifiers":"","status_name":"active","status":0,"outcome":[{"outcome_name":"Home","outcome_id":"1","odds":1.85,"active":1,"probability":0.52}]}"#;
        let m: Market = serde_json::from_str(raw).unwrap();
        assert_eq!(m.market_id, 1);
        assert_eq!(m.name, "1x2");
        assert_eq!(m.specifier, "");
        assert_eq!(m.outcomes.len(), 1);
        assert_eq!(m.outcomes[0].id, "1");
        assert!((m.outcomes[0].odds - 1.85).abs() < 1e-9);
        assert!(m.is_active());
    }

    #[test]
    fn cached_prices_survive_encoding_bit_for_bit() {
        let outcome = Outcome {
            id: "1".into(),
            name: "Home".into(),
            odds: 2.7,
            active: 1,
            probability: 1.0 / 2.7,
        };
        let decoded: Outcome = serde_json::from_str(&serde_json::to_string(&outcome).unwrap()).unwrap();
        assert_eq!(decoded.probability.to_bits(), outcome.probability.to_bits());
        assert_eq!(decoded, outcome);
    }

    #[test]
    fn tier_wire_name_matches_key_segment() {
        for tier in Tier::ALL {
            assert_eq!(serde_json::to_string(&tier).unwrap(), format!("\"{}\"", tier.as_str()));
        }
    }

    #[test]
    fn status_only_market_has_no_outcomes() {
        let raw = r#"{"market_id":18,"specifiers":"total=2.5","status":-1,"status_name":"suspended"}"#;
        let m: Market = serde_json::from_str(raw).unwrap();
        assert!(m.is_status_only());
        assert!(!m.is_active());
    }

    #[test]
    fn status_five_counts_as_active() {
        let m = Market {
            url: String::new(),
            name: "Total".into(),
            market_id: 18,
            specifier: "total=2.5".into(),
            status_name: "handed_over".into(),
            status: 5,
            outcomes: vec![Outcome {
                id: "12".into(),
                name: "Over".into(),
                odds: 1.9,
                active: 1,
                probability: 0.5,
            }],
        };
        assert!(m.is_active());
        assert!(m.outcome("12").is_some());
        assert!(m.outcome("13").is_none());
    }
}
