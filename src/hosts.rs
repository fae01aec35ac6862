//! Host registry
//!
//! Holds the ordered set of monitored hosts together with the alert destination
//! of each host. The registry is backed by a JSON file that is read wholesale and
//! rewritten wholesale on every administrative change:
//!
//! ```json
//! {
//!     "example.com": { "recipient": "ops@example.com" },
//!     "10.0.0.1": { "recipient": "alert@example.com" }
//! }
//! ```
//!
//! Key order in the file is the sweep order.

use std::fmt;
use std::net::IpAddr;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::{debug, instrument, warn};

/// Maximum length of a DNS name
const MAX_HOST_LEN: usize = 253;

/// Maximum length of a single DNS label
const MAX_LABEL_LEN: usize = 63;

/// Errors returned by administrative registry operations
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("host {0} is already in the list")]
    AlreadyExists(HostId),

    #[error("host {0} not found")]
    NotFound(HostId),

    #[error("invalid host identifier {input:?}: {reason}")]
    InvalidHost { input: String, reason: &'static str },

    #[error("could not access the hosts file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed hosts file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Validated host identifier (DNS name or IP address literal)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct HostId(String);

impl HostId {
    /// Validate and normalize a host identifier
    ///
    /// IP literals are stored in canonical form, DNS names in lowercase without
    /// a trailing dot, so each host has exactly one spelling.
    pub fn parse(input: impl Into<String>) -> Result<Self, RegistryError> {
        let input = input.into();
        if let Ok(ip) = input.parse::<IpAddr>() {
            return Ok(Self(ip.to_string()));
        }

        match validate_host(&input) {
            Ok(()) => {
                let name = input.strip_suffix('.').unwrap_or(&input);
                Ok(Self(name.to_ascii_lowercase()))
            }
            Err(reason) => Err(RegistryError::InvalidHost { input, reason }),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

fn validate_host(input: &str) -> Result<(), &'static str> {
    if input.is_empty() {
        return Err("host must not be empty");
    }

    if input.len() > MAX_HOST_LEN {
        return Err("host name is longer than 253 characters");
    }

    // a single trailing dot marks a fully qualified name
    let name = input.strip_suffix('.').unwrap_or(input);

    for label in name.split('.') {
        if label.is_empty() {
            return Err("host name contains an empty label");
        }
        if label.len() > MAX_LABEL_LEN {
            return Err("host name label is longer than 63 characters");
        }
        if !label
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            return Err("host name contains invalid characters");
        }
        if label.starts_with('-') || label.ends_with('-') {
            return Err("host name label starts or ends with a hyphen");
        }
    }

    Ok(())
}

impl fmt::Display for HostId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for HostId {
    type Err = RegistryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for HostId {
    type Error = RegistryError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<HostId> for String {
    fn from(value: HostId) -> Self {
        value.0
    }
}

/// A monitored host and the address its down-alerts go to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Host {
    pub id: HostId,
    pub destination: String,
}

/// Per-host settings as stored in the hosts file
#[derive(Debug, Clone, Serialize, Deserialize)]
struct HostSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    recipient: Option<String>,
}

/// Ordered set of hosts under monitoring
#[derive(Debug, Clone)]
pub struct HostRegistry {
    /// Backing file (None = in-memory registry)
    path: Option<PathBuf>,

    /// Destination used when a host is added without one
    default_destination: String,

    hosts: Vec<Host>,
}

impl HostRegistry {
    /// Create an empty registry that is never persisted
    pub fn in_memory(default_destination: impl Into<String>) -> Self {
        Self {
            path: None,
            default_destination: default_destination.into(),
            hosts: Vec::new(),
        }
    }

    /// Open a file-backed registry
    ///
    /// A missing file yields an empty registry; the file is created on the first
    /// `add`.
    #[instrument(skip(default_destination))]
    pub fn open(
        path: impl AsRef<Path> + fmt::Debug,
        default_destination: impl Into<String>,
    ) -> Result<Self, RegistryError> {
        let path = path.as_ref().to_path_buf();
        let default_destination = default_destination.into();
        let hosts = load_hosts(&path, &default_destination)?;

        Ok(Self {
            path: Some(path),
            default_destination,
            hosts,
        })
    }

    /// Re-read the backing file
    ///
    /// In-memory registries are left untouched.
    pub fn reload(&mut self) -> Result<(), RegistryError> {
        if let Some(path) = &self.path {
            self.hosts = load_hosts(path, &self.default_destination)?;
        }
        Ok(())
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn default_destination(&self) -> &str {
        &self.default_destination
    }

    pub fn list(&self) -> Vec<Host> {
        self.hosts.clone()
    }

    pub fn len(&self) -> usize {
        self.hosts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hosts.is_empty()
    }

    pub fn get(&self, id: &HostId) -> Option<&Host> {
        self.hosts.iter().find(|host| &host.id == id)
    }

    /// Add a host, resolving its destination now
    #[instrument(skip(self), fields(host = %id))]
    pub fn add(&mut self, id: HostId, destination: Option<String>) -> Result<Host, RegistryError> {
        if self.get(&id).is_some() {
            return Err(RegistryError::AlreadyExists(id));
        }

        let host = Host {
            id,
            destination: destination.unwrap_or_else(|| self.default_destination.clone()),
        };
        self.hosts.push(host.clone());

        if let Err(e) = self.persist() {
            self.hosts.pop();
            return Err(e);
        }

        debug!("added host with destination {}", host.destination);
        Ok(host)
    }

    #[instrument(skip(self), fields(host = %id))]
    pub fn remove(&mut self, id: &HostId) -> Result<Host, RegistryError> {
        let Some(index) = self.hosts.iter().position(|host| &host.id == id) else {
            return Err(RegistryError::NotFound(id.clone()));
        };

        let host = self.hosts.remove(index);

        if let Err(e) = self.persist() {
            self.hosts.insert(index, host);
            return Err(e);
        }

        debug!("removed host");
        Ok(host)
    }

    /// Rewrite the backing file with the current host list
    fn persist(&self) -> Result<(), RegistryError> {
        let Some(path) = &self.path else {
            return Ok(());
        };

        let mut map = Map::new();
        for host in &self.hosts {
            let settings = HostSettings {
                recipient: Some(host.destination.clone()),
            };
            let value = serde_json::to_value(settings).map_err(|source| RegistryError::Parse {
                path: path.clone(),
                source,
            })?;
            map.insert(host.id.to_string(), value);
        }

        let content =
            serde_json::to_string_pretty(&Value::Object(map)).map_err(|source| {
                RegistryError::Parse {
                    path: path.clone(),
                    source,
                }
            })?;

        // write next to the target, then swap it in
        let tmp_path = path.with_extension("tmp");
        let io_err = |source| RegistryError::Io {
            path: path.clone(),
            source,
        };
        std::fs::write(&tmp_path, content + "\n").map_err(io_err)?;
        std::fs::rename(&tmp_path, path).map_err(io_err)?;

        Ok(())
    }
}

fn load_hosts(path: &Path, default_destination: &str) -> Result<Vec<Host>, RegistryError> {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            warn!("could not open the hosts file: {}", path.display());
            return Ok(Vec::new());
        }
        Err(source) => {
            return Err(RegistryError::Io {
                path: path.to_path_buf(),
                source,
            });
        }
    };

    if content.trim().is_empty() {
        return Ok(Vec::new());
    }

    let parse_err = |source| RegistryError::Parse {
        path: path.to_path_buf(),
        source,
    };

    let map: Map<String, Value> = serde_json::from_str(&content).map_err(parse_err)?;

    let mut hosts: Vec<Host> = Vec::with_capacity(map.len());
    for (key, value) in map {
        let id = HostId::parse(key)?;
        if hosts.iter().any(|host| host.id == id) {
            warn!("{} is listed more than once in {}, keeping the first entry", id, path.display());
            continue;
        }
        let settings: HostSettings = serde_json::from_value(value).map_err(parse_err)?;
        hosts.push(Host {
            id,
            destination: settings
                .recipient
                .unwrap_or_else(|| default_destination.to_string()),
        });
    }

    Ok(hosts)
}
