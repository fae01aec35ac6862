//! SQLite recorder
//!
//! Stores readings in a local SQLite database file. The file is created on
//! first use and the schema is kept current with sqlx migrations.
//!
//! Timestamps are stored as Unix milliseconds.

use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{Pool, Sqlite};
use tracing::{debug, info, instrument};

use super::backend::{HealthStatus, Recorder};
use super::error::StorageResult;
use super::schema::Reading;

pub struct SqliteRecorder {
    pool: Pool<Sqlite>,
    db_path: String,
}

impl SqliteRecorder {
    /// Open (and create if missing) the database at `db_path`
    ///
    /// Connections are established lazily; call [`Recorder::prepare`] to run
    /// migrations before the first write.
    #[instrument(skip_all)]
    pub fn new(db_path: impl AsRef<Path>, timeout: Duration) -> StorageResult<Self> {
        let db_path_str = db_path.as_ref().to_string_lossy().to_string();

        info!("initializing SQLite backend at: {}", db_path_str);

        let options = SqliteConnectOptions::new()
            .filename(&db_path_str)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .busy_timeout(timeout);

        let pool = SqlitePoolOptions::new()
            .max_connections(2)
            .acquire_timeout(timeout)
            .connect_lazy_with(options);

        Ok(Self {
            pool,
            db_path: db_path_str,
        })
    }

    fn timestamp_to_millis(dt: &DateTime<Utc>) -> i64 {
        dt.timestamp_millis()
    }
}

#[async_trait]
impl Recorder for SqliteRecorder {
    #[instrument(skip(self, reading), fields(host = %reading.host))]
    async fn record(&self, reading: &Reading) -> StorageResult<()> {
        sqlx::query("INSERT INTO readings (host, latency, timestamp) VALUES (?, ?, ?)")
            .bind(reading.host.as_str())
            .bind(reading.latency_ms)
            .bind(Self::timestamp_to_millis(&reading.timestamp))
            .execute(&self.pool)
            .await?;

        debug!("reading stored");
        Ok(())
    }

    #[instrument(skip(self))]
    async fn prepare(&self) -> StorageResult<()> {
        debug!("running database migrations");
        sqlx::migrate!("./migrations/sqlite").run(&self.pool).await?;
        info!("database migrations complete");
        Ok(())
    }

    #[instrument(skip(self))]
    async fn health_check(&self) -> StorageResult<HealthStatus> {
        match sqlx::query("SELECT 1").fetch_one(&self.pool).await {
            Ok(_) => Ok(HealthStatus {
                healthy: true,
                message: "SQLite backend operational".to_string(),
                metadata: HashMap::from([
                    ("backend".to_string(), "sqlite".to_string()),
                    ("db_path".to_string(), self.db_path.clone()),
                ]),
            }),
            Err(e) => Ok(HealthStatus {
                healthy: false,
                message: format!("health check failed: {e}"),
                metadata: HashMap::new(),
            }),
        }
    }

    #[instrument(skip(self))]
    async fn close(&self) -> StorageResult<()> {
        info!("closing SQLite backend");
        self.pool.close().await;
        Ok(())
    }
}
