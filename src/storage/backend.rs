//! Recorder trait definition
//!
//! This module defines the `Recorder` trait that every storage backend
//! implements, plus a wrapper adding bounded retries to any backend.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use super::error::StorageResult;
use super::schema::Reading;

/// Pause between two attempts of the same write
const RETRY_DELAY: Duration = Duration::from_millis(500);

/// Health status of the storage backend
#[derive(Debug, Clone)]
pub struct HealthStatus {
    /// Is the backend operational?
    pub healthy: bool,

    /// Human-readable status message
    pub message: String,

    /// Additional backend-specific metadata
    pub metadata: HashMap<String, String>,
}

/// Durable sink for readings
///
/// ## Contract
///
/// Every `record` call is an independent write: a failure affects that reading
/// only. Callers are expected to bound each call with their own timeout, but
/// backends should also configure connection and statement timeouts so that
/// resources are released.
///
/// Implementations must be `Send + Sync` as they are shared across tasks.
#[async_trait]
pub trait Recorder: Send + Sync {
    /// Persist a single reading
    async fn record(&self, reading: &Reading) -> StorageResult<()>;

    /// Prepare the backend (schema migrations etc.)
    ///
    /// Called once at startup. The default does nothing.
    async fn prepare(&self) -> StorageResult<()> {
        Ok(())
    }

    /// Check backend health
    async fn health_check(&self) -> StorageResult<HealthStatus>;

    /// Release connections and flush pending writes
    async fn close(&self) -> StorageResult<()> {
        Ok(())
    }
}

/// Retries failed writes a bounded number of times
pub struct RetryingRecorder {
    inner: Arc<dyn Recorder>,
    retries: u32,
    delay: Duration,
}

impl RetryingRecorder {
    pub fn new(inner: Arc<dyn Recorder>, retries: u32) -> Self {
        Self {
            inner,
            retries,
            delay: RETRY_DELAY,
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

#[async_trait]
impl Recorder for RetryingRecorder {
    async fn record(&self, reading: &Reading) -> StorageResult<()> {
        let mut attempt = 0;
        loop {
            match self.inner.record(reading).await {
                Ok(()) => return Ok(()),
                Err(e) if attempt < self.retries => {
                    attempt += 1;
                    debug!(host = %reading.host, "write failed, retrying ({attempt}/{}): {e}", self.retries);
                    tokio::time::sleep(self.delay).await;
                }
                Err(e) => {
                    debug!("giving up after {attempt} retries");
                    return Err(e);
                }
            }
        }
    }

    async fn prepare(&self) -> StorageResult<()> {
        self.inner.prepare().await
    }

    async fn health_check(&self) -> StorageResult<HealthStatus> {
        self.inner.health_check().await
    }

    async fn close(&self) -> StorageResult<()> {
        self.inner.close().await
    }
}
