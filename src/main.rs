use std::sync::Arc;

use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use odds_cache::api::health::HealthState;
use odds_cache::api::latency::IngestLatency;
use odds_cache::api::routes::{router, ApiState};
use odds_cache::cache::OddsCache;
use odds_cache::config::{Config, RECOVERY_CHANNEL_CAPACITY};
use odds_cache::error::Result;
use odds_cache::recovery::{NatsBus, RecoveryPublisher, RecoveryWorker};
use odds_cache::store::RedisStore;

#[tokio::main]
async fn main() {
    let cfg = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Config error: {e}");
            std::process::exit(1);
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&cfg.log_level))
        .init();

    if let Err(e) = run(cfg).await {
        error!("Fatal error: {e}");
        std::process::exit(1);
    }
}

async fn run(cfg: Config) -> Result<()> {
    info!(
        namespace = %cfg.cache.namespace,
        live_producers = ?cfg.cache.live_producers,
        op_timeout_ms = cfg.cache.op_timeout.as_millis() as u64,
        "starting odds cache"
    );

    // --- Collaborators ---
    let store = Arc::new(RedisStore::connect(&cfg.redis_url).await?);
    let bus = Arc::new(NatsBus::connect(&cfg.nats_url).await?);

    let health = Arc::new(HealthState::new());
    let latency = Arc::new(IngestLatency::default());

    // --- Recovery worker ---
    let (recovery, recovery_rx) =
        RecoveryPublisher::channel(RECOVERY_CHANNEL_CAPACITY, Arc::clone(&health));
    let topic = cfg.recovery_topic();
    info!("Recovery requests publish to {topic}");
    let worker = RecoveryWorker::new(
        bus,
        topic,
        cfg.cache.op_timeout,
        recovery_rx,
        Arc::clone(&health),
    );
    tokio::spawn(async move { worker.run().await });

    // --- Cache ---
    let cache = Arc::new(OddsCache::new(store, recovery, cfg.cache.clone(), health, latency));

    // HTTP API server
    let app = router(ApiState { cache });
    let bind_addr = format!("0.0.0.0:{}", cfg.api_port);
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    info!("HTTP API listening on {bind_addr}");

    axum::serve(listener, app).await?;

    Ok(())
}
