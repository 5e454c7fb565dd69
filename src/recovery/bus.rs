use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use tracing::info;

use crate::error::{CacheError, Result};

/// Topic-publish primitive the recovery worker writes to.
#[async_trait]
pub trait RecoveryBus: Send + Sync {
    async fn publish(&self, subject: &str, payload: Vec<u8>) -> Result<()>;
}

// ---------------------------------------------------------------------------
// NATS
// ---------------------------------------------------------------------------

pub struct NatsBus {
    client: async_nats::Client,
}

impl NatsBus {
    pub async fn connect(url: &str) -> Result<Self> {
        info!("Connecting to NATS at {url}");
        let client = async_nats::connect(url)
            .await
            .map_err(|e| CacheError::Bus(format!("connect {url}: {e}")))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl RecoveryBus for NatsBus {
    async fn publish(&self, subject: &str, payload: Vec<u8>) -> Result<()> {
        self.client
            .publish(subject.to_string(), payload.into())
            .await
            .map_err(|e| CacheError::Bus(format!("publish {subject}: {e}")))
    }
}

// ---------------------------------------------------------------------------
// MemoryBus
// ---------------------------------------------------------------------------

/// Keeps every publish in memory instead of sending it anywhere.
#[derive(Debug, Default)]
pub struct MemoryBus {
    published: Mutex<Vec<(String, Vec<u8>)>>,
    failing: AtomicBool,
}

impl MemoryBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make subsequent publishes fail.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::Relaxed);
    }

    pub fn published(&self) -> Vec<(String, Vec<u8>)> {
        self.published.lock().map(|p| p.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl RecoveryBus for MemoryBus {
    async fn publish(&self, subject: &str, payload: Vec<u8>) -> Result<()> {
        if self.failing.load(Ordering::Relaxed) {
            return Err(CacheError::Bus(format!("publish {subject}: bus unavailable")));
        }
        if let Ok(mut published) = self.published.lock() {
            published.push((subject.to_string(), payload));
        }
        Ok(())
    }
}
