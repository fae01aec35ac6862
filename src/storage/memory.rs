//! In-memory recorder (no persistence)
//!
//! Used when `storage.backend` is `none`, for console-only runs and in tests.
//! Readings are kept in a bounded buffer; the oldest are evicted first.

use std::collections::{HashMap, VecDeque};

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::trace;

use super::backend::{HealthStatus, Recorder};
use super::error::StorageResult;
use super::schema::Reading;

/// Maximum readings kept in memory
const MAX_READINGS: usize = 10_000;

#[derive(Debug, Default)]
pub struct MemoryRecorder {
    readings: RwLock<VecDeque<Reading>>,
}

impl MemoryRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the stored readings, oldest first
    pub async fn readings(&self) -> Vec<Reading> {
        self.readings.read().await.iter().cloned().collect()
    }
}

#[async_trait]
impl Recorder for MemoryRecorder {
    async fn record(&self, reading: &Reading) -> StorageResult<()> {
        let mut readings = self.readings.write().await;
        if readings.len() == MAX_READINGS {
            readings.pop_front();
        }
        readings.push_back(reading.clone());
        trace!(host = %reading.host, "stored reading in memory");
        Ok(())
    }

    async fn health_check(&self) -> StorageResult<HealthStatus> {
        let count = self.readings.read().await.len();
        Ok(HealthStatus {
            healthy: true,
            message: "In-memory storage operational".to_string(),
            metadata: HashMap::from([
                ("backend".to_string(), "memory".to_string()),
                ("total_readings".to_string(), count.to_string()),
            ]),
        })
    }
}
