use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{debug, error, warn};

use crate::api::health::HealthState;
use crate::error::{CacheError, Result};
use crate::recovery::bus::RecoveryBus;

/// Backfill request payload: `{"fixture_id": <int>}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecoveryRequest {
    pub fixture_id: i64,
}

/// Read-path handle for requesting a backfill. Never blocks: the request is
/// queued for [`RecoveryWorker`] and the caller moves on.
#[derive(Clone)]
pub struct RecoveryPublisher {
    tx: mpsc::Sender<RecoveryRequest>,
    health: Arc<HealthState>,
}

impl RecoveryPublisher {
    pub fn channel(
        capacity: usize,
        health: Arc<HealthState>,
    ) -> (Self, mpsc::Receiver<RecoveryRequest>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self { tx, health }, rx)
    }

    pub fn request(&self, fixture_id: i64) {
        match self.tx.try_send(RecoveryRequest { fixture_id }) {
            Ok(()) => {
                self.health.inc_recovery_requested();
                debug!(fixture_id, "recovery requested");
            }
            Err(e) => {
                self.health.inc_recovery_failures();
                warn!(fixture_id, "recovery channel full, dropping request: {e}");
            }
        }
    }
}

/// Drains queued recovery requests onto the bus. Runs as a dedicated
/// background task; failed publishes are logged and not retried.
pub struct RecoveryWorker {
    bus: Arc<dyn RecoveryBus>,
    topic: String,
    op_timeout: Duration,
    rx: mpsc::Receiver<RecoveryRequest>,
    health: Arc<HealthState>,
}

impl RecoveryWorker {
    pub fn new(
        bus: Arc<dyn RecoveryBus>,
        topic: String,
        op_timeout: Duration,
        rx: mpsc::Receiver<RecoveryRequest>,
        health: Arc<HealthState>,
    ) -> Self {
        Self { bus, topic, op_timeout, rx, health }
    }

    pub async fn run(mut self) {
        while let Some(request) = self.rx.recv().await {
            if let Err(e) = self.publish(request).await {
                self.health.inc_recovery_failures();
                error!(fixture_id = request.fixture_id, topic = %self.topic, "recovery publish failed: {e}");
            }
        }
    }

    async fn publish(&self, request: RecoveryRequest) -> Result<()> {
        let payload = serde_json::to_vec(&request)?;
        tokio::time::timeout(self.op_timeout, self.bus.publish(&self.topic, payload))
            .await
            .map_err(|_| CacheError::Timeout(format!("publish {}", self.topic)))?
    }
}
