//! MySQL recorder
//!
//! Writes readings into the `readings` table of a MySQL (or MariaDB) server.
//! Connections are pooled and opened lazily, so an unreachable server at
//! startup only surfaces as failed writes, never as a startup failure.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use sqlx::mysql::{MySqlConnectOptions, MySqlPoolOptions};
use sqlx::{MySql, Pool};
use tracing::{debug, info, instrument};

use super::backend::{HealthStatus, Recorder};
use super::error::StorageResult;
use super::schema::Reading;

/// Connection parameters for the MySQL backend
#[derive(Debug, Clone)]
pub struct MysqlSettings {
    pub host: String,
    pub port: u16,
    pub database: String,
    pub username: String,
    pub password: String,
}

pub struct MysqlRecorder {
    pool: Pool<MySql>,
    target: String,
}

impl MysqlRecorder {
    #[instrument(skip_all, fields(host = %settings.host, database = %settings.database))]
    pub fn new(settings: &MysqlSettings, timeout: Duration) -> StorageResult<Self> {
        let options = MySqlConnectOptions::new()
            .host(&settings.host)
            .port(settings.port)
            .database(&settings.database)
            .username(&settings.username)
            .password(&settings.password);

        let pool = MySqlPoolOptions::new()
            .max_connections(2)
            .acquire_timeout(timeout)
            .connect_lazy_with(options);

        let target = format!("{}:{}/{}", settings.host, settings.port, settings.database);
        info!("MySQL backend configured for {target}");

        Ok(Self { pool, target })
    }
}

#[async_trait]
impl Recorder for MysqlRecorder {
    #[instrument(skip(self, reading), fields(host = %reading.host))]
    async fn record(&self, reading: &Reading) -> StorageResult<()> {
        sqlx::query("INSERT INTO readings (host, latency, timestamp) VALUES (?, ?, ?)")
            .bind(reading.host.as_str())
            .bind(reading.latency_ms)
            .bind(reading.timestamp.naive_utc())
            .execute(&self.pool)
            .await?;

        debug!("reading stored");
        Ok(())
    }

    #[instrument(skip(self))]
    async fn prepare(&self) -> StorageResult<()> {
        debug!("running database migrations");
        sqlx::migrate!("./migrations/mysql").run(&self.pool).await?;
        info!("database migrations complete");
        Ok(())
    }

    #[instrument(skip(self))]
    async fn health_check(&self) -> StorageResult<HealthStatus> {
        match sqlx::query("SELECT 1").fetch_one(&self.pool).await {
            Ok(_) => Ok(HealthStatus {
                healthy: true,
                message: "MySQL backend operational".to_string(),
                metadata: HashMap::from([
                    ("backend".to_string(), "mysql".to_string()),
                    ("target".to_string(), self.target.clone()),
                ]),
            }),
            Err(e) => Ok(HealthStatus {
                healthy: false,
                message: format!("health check failed: {e}"),
                metadata: HashMap::from([("target".to_string(), self.target.clone())]),
            }),
        }
    }

    #[instrument(skip(self))]
    async fn close(&self) -> StorageResult<()> {
        info!("closing MySQL backend");
        self.pool.close().await;
        Ok(())
    }
}
