//! Storage backends for reading persistence
//!
//! ## Design
//!
//! - **Trait-based**: the `Recorder` trait allows swapping implementations
//! - **Async**: all operations are async for use from the scheduler task
//! - **Per-call isolation**: each write is its own transaction
//!
//! ## Backends
//!
//! - **MySQL** (default): the relational store holding the `readings` table
//! - **SQLite**: embedded database file, no server required
//! - **In-Memory**: no persistence, for console runs and tests
//!
//! ## Usage
//!
//! ```no_run
//! use network_logger::config::StorageConfig;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let recorder = network_logger::storage::from_config(&StorageConfig::default())?;
//!     recorder.prepare().await?;
//!     Ok(())
//! }
//! ```

pub mod backend;
pub mod error;
pub mod memory;
#[cfg(feature = "storage-mysql")]
pub mod mysql;
pub mod schema;
#[cfg(feature = "storage-sqlite")]
pub mod sqlite;

use std::sync::Arc;
#[cfg(any(feature = "storage-sqlite", feature = "storage-mysql"))]
use std::time::Duration;

pub use backend::{HealthStatus, Recorder, RetryingRecorder};
pub use error::{StorageError, StorageResult};
pub use memory::MemoryRecorder;
pub use schema::Reading;

use crate::config::{StorageBackendConfig, StorageConfig};

/// Build the recorder selected in the configuration
pub fn from_config(config: &StorageConfig) -> StorageResult<Arc<dyn Recorder>> {
    let recorder: Arc<dyn Recorder> = match &config.backend {
        StorageBackendConfig::None => Arc::new(MemoryRecorder::new()),

        #[cfg(feature = "storage-sqlite")]
        StorageBackendConfig::Sqlite { path } => Arc::new(sqlite::SqliteRecorder::new(
            path,
            Duration::from_secs(config.timeout),
        )?),

        #[cfg(not(feature = "storage-sqlite"))]
        StorageBackendConfig::Sqlite { .. } => {
            return Err(StorageError::InvalidConfig(
                "built without SQLite support".to_string(),
            ));
        }

        #[cfg(feature = "storage-mysql")]
        StorageBackendConfig::Mysql {
            host,
            port,
            database,
            username,
            password,
        } => {
            let settings = mysql::MysqlSettings {
                host: host.clone(),
                port: *port,
                database: database.clone(),
                username: username.clone(),
                password: password.clone(),
            };
            Arc::new(mysql::MysqlRecorder::new(
                &settings,
                Duration::from_secs(config.timeout),
            )?)
        }

        #[cfg(not(feature = "storage-mysql"))]
        StorageBackendConfig::Mysql { .. } => {
            return Err(StorageError::InvalidConfig(
                "built without MySQL support".to_string(),
            ));
        }
    };

    if config.retries > 0 {
        return Ok(Arc::new(RetryingRecorder::new(recorder, config.retries)));
    }

    Ok(recorder)
}
