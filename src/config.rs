use std::time::Duration;

use crate::error::{CacheError, Result};

pub const NAMESPACE: &str = "odds";
pub const QUEUE_PREFIX: &str = "odds";
pub const REDIS_URL: &str = "redis://127.0.0.1:6379";
pub const NATS_URL: &str = "nats://127.0.0.1:4222";

/// Producers whose fixtures are filed under the live tier.
pub const LIVE_PRODUCERS: &[i64] = &[1, 4];

/// Market ids eligible to become a fixture's default market.
pub const DEFAULT_MARKET_PRIORITY: &[i64] = &[1, 186, 219, 340, 251];

/// Fallback default market when nothing was latched: 1x2 for soccer,
/// match winner for everything else.
pub const SOCCER_SPORT_ID: i64 = 1;
pub const SOCCER_DEFAULT_MARKET: i64 = 1;
pub const FALLBACK_DEFAULT_MARKET: i64 = 186;

/// Per-call timeout for key-value store and message bus round trips.
pub const STORE_OP_TIMEOUT_MS: u64 = 500;

/// End-to-end budget (event creation to cache write) before a warning is logged.
pub const LATENCY_BUDGET_MS: i64 = 2_000;

/// Topic suffix for backfill requests; the full subject is `<prefix>.odds_recovery`.
pub const RECOVERY_TOPIC: &str = "odds_recovery";

/// Channel capacity between read paths and the recovery worker.
pub const RECOVERY_CHANNEL_CAPACITY: usize = 1024;

/// Engine settings. Built from the environment in the binary, by hand in tests.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    pub namespace: String,
    pub live_producers: Vec<i64>,
    pub default_market_priority: Vec<i64>,
    pub op_timeout: Duration,
    pub latency_budget_ms: i64,
    /// Fixture whose payloads are logged verbatim (DEBUG_MATCH_ID).
    pub debug_fixture_id: Option<i64>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            namespace: NAMESPACE.to_string(),
            live_producers: LIVE_PRODUCERS.to_vec(),
            default_market_priority: DEFAULT_MARKET_PRIORITY.to_vec(),
            op_timeout: Duration::from_millis(STORE_OP_TIMEOUT_MS),
            latency_budget_ms: LATENCY_BUDGET_MS,
            debug_fixture_id: None,
        }
    }
}

impl CacheConfig {
    pub fn is_debug_fixture(&self, fixture_id: i64) -> bool {
        self.debug_fixture_id == Some(fixture_id)
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub cache: CacheConfig,
    pub redis_url: String,
    pub nats_url: String,
    /// Prefix for published subjects (ODDS_SERVICE_QUEUE_PREFIX)
    pub queue_prefix: String,
    pub log_level: String,
    pub api_port: u16,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let cache = CacheConfig {
            namespace: std::env::var("ODDS_FEED_NAMESPACE")
                .unwrap_or_else(|_| NAMESPACE.to_string()),
            live_producers: id_list_from_env("LIVE_PRODUCERS", LIVE_PRODUCERS)?,
            default_market_priority: id_list_from_env(
                "DEFAULT_MARKET_PRIORITY",
                DEFAULT_MARKET_PRIORITY,
            )?,
            op_timeout: Duration::from_millis(
                std::env::var("STORE_OP_TIMEOUT_MS")
                    .unwrap_or_else(|_| STORE_OP_TIMEOUT_MS.to_string())
                    .parse::<u64>()
                    .map_err(|_| {
                        CacheError::Config("STORE_OP_TIMEOUT_MS must be milliseconds".to_string())
                    })?,
            ),
            latency_budget_ms: std::env::var("LATENCY_BUDGET_MS")
                .unwrap_or_else(|_| LATENCY_BUDGET_MS.to_string())
                .parse::<i64>()
                .map_err(|_| {
                    CacheError::Config("LATENCY_BUDGET_MS must be milliseconds".to_string())
                })?,
            debug_fixture_id: std::env::var("DEBUG_MATCH_ID")
                .ok()
                .and_then(|v| v.trim().parse::<i64>().ok()),
        };

        Ok(Self {
            cache,
            redis_url: std::env::var("REDIS_URL").unwrap_or_else(|_| REDIS_URL.to_string()),
            nats_url: std::env::var("ODDS_SERVICE_NATS_URI")
                .unwrap_or_else(|_| NATS_URL.to_string()),
            queue_prefix: std::env::var("ODDS_SERVICE_QUEUE_PREFIX")
                .unwrap_or_else(|_| QUEUE_PREFIX.to_string()),
            log_level: std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            api_port: std::env::var("API_PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse::<u16>()
                .map_err(|_| CacheError::Config("API_PORT must be a valid port number".to_string()))?,
        })
    }

    pub fn recovery_topic(&self) -> String {
        format!("{}.{}", self.queue_prefix, RECOVERY_TOPIC)
    }
}

fn id_list_from_env(var: &str, default: &[i64]) -> Result<Vec<i64>> {
    match std::env::var(var) {
        Ok(raw) => parse_id_list(&raw)
            .map_err(|_| CacheError::Config(format!("{var} must be a comma-separated list of integers"))),
        Err(_) => Ok(default.to_vec()),
    }
}

/// Parses "1, 4,,7" into [1, 4, 7].
pub fn parse_id_list(raw: &str) -> std::result::Result<Vec<i64>, std::num::ParseIntError> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::parse::<i64>)
        .collect()
}
