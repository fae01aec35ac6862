use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;
use tracing::{trace, warn};

use crate::util;

/// Lowest accepted sweep interval in seconds
pub const MIN_INTERVAL_SECS: u64 = 5;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read configuration file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid configuration file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Storage backend configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "backend", rename_all = "lowercase")]
pub enum StorageBackendConfig {
    /// Readings are kept in memory only
    #[serde(rename = "none")]
    None,

    /// SQLite database file
    Sqlite {
        #[serde(default = "default_sqlite_path")]
        path: PathBuf,
    },

    /// MySQL server holding the `readings` table
    Mysql {
        #[serde(default = "default_db_host")]
        host: String,
        #[serde(default = "default_db_port")]
        port: u16,
        #[serde(default = "default_db_name")]
        database: String,
        #[serde(default = "default_db_username")]
        username: String,
        #[serde(default)]
        password: String,
    },
}

impl Default for StorageBackendConfig {
    fn default() -> Self {
        StorageBackendConfig::Mysql {
            host: default_db_host(),
            port: default_db_port(),
            database: default_db_name(),
            username: default_db_username(),
            password: String::new(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    #[serde(flatten)]
    pub backend: StorageBackendConfig,

    /// Upper bound for a single `record` call, in seconds
    #[serde(default = "default_storage_timeout")]
    pub timeout: u64,

    /// Additional attempts after a failed write
    #[serde(default)]
    pub retries: u32,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackendConfig::default(),
            timeout: default_storage_timeout(),
            retries: 0,
        }
    }
}

/// Alert channel configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "channel", rename_all = "lowercase")]
pub enum AlertChannelConfig {
    /// Down-events are only logged
    #[serde(rename = "none")]
    None,

    /// Mail submission with STARTTLS
    Smtp {
        #[serde(default = "default_smtp_host")]
        host: String,
        #[serde(default = "default_smtp_port")]
        port: u16,
        #[serde(default = "default_smtp_username")]
        username: String,
        #[serde(default)]
        password: String,
        /// Sender address (defaults to the username)
        from: Option<String>,
    },

    /// JSON POST to an HTTP endpoint
    Webhook { url: String },
}

impl Default for AlertChannelConfig {
    fn default() -> Self {
        AlertChannelConfig::Smtp {
            host: default_smtp_host(),
            port: default_smtp_port(),
            username: default_smtp_username(),
            password: String::new(),
            from: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AlertConfig {
    #[serde(flatten)]
    pub channel: AlertChannelConfig,

    /// Upper bound for delivering a single alert, in seconds
    #[serde(default = "default_alert_timeout")]
    pub timeout: u64,
}

impl Default for AlertConfig {
    fn default() -> Self {
        Self {
            channel: AlertChannelConfig::default(),
            timeout: default_alert_timeout(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProbeMethod {
    /// ICMP echo through a datagram socket
    #[default]
    Icmp,

    /// The system `ping` binary
    Command,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProbeConfig {
    #[serde(default)]
    pub method: ProbeMethod,

    /// Probe timeout in seconds
    #[serde(default = "default_probe_timeout")]
    pub timeout: u64,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            method: ProbeMethod::default(),
            timeout: default_probe_timeout(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Seconds between the end of one sweep and the start of the next
    #[serde(default = "default_interval")]
    pub interval: u64,

    #[serde(default)]
    pub probe: ProbeConfig,

    /// Number of probes in flight during a sweep (1 = strictly sequential)
    #[serde(default = "default_max_concurrent_probes")]
    pub max_concurrent_probes: usize,

    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub alert: AlertConfig,

    /// Destination for hosts added without an explicit recipient
    #[serde(default = "default_recipient")]
    pub default_recipient: String,

    #[serde(default = "default_hosts_file")]
    pub hosts_file: PathBuf,

    #[serde(default = "default_error_log")]
    pub error_log: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            interval: default_interval(),
            probe: ProbeConfig::default(),
            max_concurrent_probes: default_max_concurrent_probes(),
            storage: StorageConfig::default(),
            alert: AlertConfig::default(),
            default_recipient: default_recipient(),
            hosts_file: default_hosts_file(),
            error_log: default_error_log(),
        }
    }
}

impl Config {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.probe.timeout == 0 {
            return Err(ConfigError::Invalid("probe timeout must be positive".into()));
        }
        if self.max_concurrent_probes == 0 {
            return Err(ConfigError::Invalid(
                "max_concurrent_probes must be at least 1".into(),
            ));
        }
        if self.storage.timeout == 0 || self.alert.timeout == 0 {
            return Err(ConfigError::Invalid(
                "storage and alert timeouts must be positive".into(),
            ));
        }
        if self.default_recipient.trim().is_empty() {
            return Err(ConfigError::Invalid("default_recipient must not be empty".into()));
        }
        if let AlertChannelConfig::Webhook { url } = &self.alert.channel
            && url.trim().is_empty()
        {
            return Err(ConfigError::Invalid("webhook url must not be empty".into()));
        }
        Ok(())
    }

    /// Replace stored secrets with values from the environment, if set
    pub fn apply_env_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let StorageBackendConfig::Mysql { password, .. } = &mut self.storage.backend
            && let Some(secret) = lookup(util::DB_PASSWORD)
        {
            *password = secret;
        }

        if let AlertChannelConfig::Smtp { password, .. } = &mut self.alert.channel
            && let Some(secret) = lookup(util::SMTP_PASSWORD)
        {
            *password = secret;
        }
    }
}

/// Flags chosen on the command line for one run
#[derive(Debug, Clone, Copy, Default)]
pub struct RunFlags {
    pub once: bool,
    pub console: bool,
    pub verbose: bool,
}

/// Settings for one monitoring run, fixed at startup
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub interval: Duration,
    pub console_only: bool,
    pub verbose: bool,
    pub run_once: bool,
    pub probe_timeout: Duration,
    pub storage_timeout: Duration,
    pub alert_timeout: Duration,
    pub max_concurrent_probes: usize,
}

impl RunConfig {
    pub fn new(config: &Config, flags: RunFlags) -> Self {
        let interval = clamp_interval(config.interval);
        if interval != config.interval {
            warn!(
                "Frequency too low ({}s). Setting to minimum value of {MIN_INTERVAL_SECS}s.",
                config.interval
            );
        }

        Self {
            interval: Duration::from_secs(interval),
            console_only: flags.console,
            verbose: flags.verbose,
            run_once: flags.once,
            probe_timeout: Duration::from_secs(config.probe.timeout),
            storage_timeout: Duration::from_secs(config.storage.timeout),
            alert_timeout: Duration::from_secs(config.alert.timeout),
            max_concurrent_probes: config.max_concurrent_probes.max(1),
        }
    }
}

/// Effective sweep interval for a configured value
pub fn clamp_interval(requested: u64) -> u64 {
    requested.max(MIN_INTERVAL_SECS)
}

fn default_interval() -> u64 {
    60
}

fn default_probe_timeout() -> u64 {
    3
}

fn default_max_concurrent_probes() -> usize {
    1
}

fn default_storage_timeout() -> u64 {
    10
}

fn default_alert_timeout() -> u64 {
    30
}

fn default_sqlite_path() -> PathBuf {
    PathBuf::from("./readings.db")
}

fn default_db_host() -> String {
    "localhost".into()
}

fn default_db_port() -> u16 {
    3306
}

fn default_db_name() -> String {
    "network_data".into()
}

fn default_db_username() -> String {
    "sensor_user".into()
}

fn default_smtp_host() -> String {
    "smtp.example.com".into()
}

fn default_smtp_port() -> u16 {
    587
}

fn default_smtp_username() -> String {
    "user@example.com".into()
}

fn default_recipient() -> String {
    "alert@example.com".into()
}

fn default_hosts_file() -> PathBuf {
    PathBuf::from("hosts.json")
}

fn default_error_log() -> PathBuf {
    PathBuf::from("error.log")
}

/// Read and validate a configuration file
pub fn read_config_file(path: impl AsRef<Path>) -> Result<Config, ConfigError> {
    let path = path.as_ref();
    let file_content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let config: Config = serde_json::from_str(&file_content).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    config.validate()?;
    trace!("loaded config: {config:?}");
    Ok(config)
}

/// Like [`read_config_file`], but a missing file is `Ok(None)`
pub fn load_config(path: impl AsRef<Path>) -> Result<Option<Config>, ConfigError> {
    let path = path.as_ref();
    if !path.exists() {
        return Ok(None);
    }
    read_config_file(path).map(Some)
}
