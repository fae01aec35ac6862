use std::path::PathBuf;

/// Path of the configuration file
pub const CONFIG_PATH: &str = "NETWORK_LOGGER_CONFIG";

/// Overrides the MySQL password from the configuration file
pub const DB_PASSWORD: &str = "NETWORK_LOGGER_DB_PASSWORD";

/// Overrides the SMTP password from the configuration file
pub const SMTP_PASSWORD: &str = "NETWORK_LOGGER_SMTP_PASSWORD";

const DEFAULT_CONFIG_PATH: &str = "config.json";

pub fn get_default_config_path() -> PathBuf {
    PathBuf::from(DEFAULT_CONFIG_PATH)
}

/// Non-empty value of an environment variable
pub fn get_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|value| !value.is_empty())
}
