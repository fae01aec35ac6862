//! Host probers
//!
//! A prober performs exactly one reachability check against a host and reports
//! either a round-trip time or that the host did not answer. Every failure mode
//! (timeout, DNS failure, missing socket permissions, transport error) folds into
//! [`ProbeOutcome::Unreachable`]; probers never return errors. Only building a
//! prober can fail, when the ICMP socket cannot be opened at all.

pub mod command;
pub mod icmp;

use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::config::{ProbeConfig, ProbeMethod};
use crate::hosts::HostId;

pub use command::CommandProber;
pub use icmp::IcmpProber;

/// Result of probing a single host
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ProbeOutcome {
    Reachable {
        latency_ms: f64,
        measured_at: DateTime<Utc>,
    },
    Unreachable {
        measured_at: DateTime<Utc>,
    },
}

impl ProbeOutcome {
    pub fn reachable(latency_ms: f64) -> Self {
        ProbeOutcome::Reachable {
            latency_ms,
            measured_at: Utc::now(),
        }
    }

    pub fn unreachable() -> Self {
        ProbeOutcome::Unreachable {
            measured_at: Utc::now(),
        }
    }

    pub fn is_reachable(&self) -> bool {
        matches!(self, ProbeOutcome::Reachable { .. })
    }

    pub fn measured_at(&self) -> DateTime<Utc> {
        match self {
            ProbeOutcome::Reachable { measured_at, .. }
            | ProbeOutcome::Unreachable { measured_at } => *measured_at,
        }
    }
}

#[derive(Debug, Error)]
pub enum ProbeError {
    #[error(
        "could not open an ICMP socket ({0}); allow unprivileged ICMP \
         (net.ipv4.ping_group_range) or set probe method = \"command\""
    )]
    IcmpSocket(#[source] std::io::Error),
}

#[async_trait]
pub trait Prober: Send + Sync {
    /// Check `host` once, giving up after `timeout`
    async fn probe(&self, host: &HostId, timeout: Duration) -> ProbeOutcome;
}

/// Build the prober selected in the configuration
pub fn from_config(config: &ProbeConfig) -> Result<Arc<dyn Prober>, ProbeError> {
    Ok(match config.method {
        ProbeMethod::Icmp => Arc::new(IcmpProber::new()?),
        ProbeMethod::Command => Arc::new(CommandProber::new()),
    })
}

/// Resolve a host identifier to an IP address
pub(crate) async fn resolve_host(host: &str) -> Result<IpAddr, std::io::Error> {
    if let Ok(ip) = host.parse::<IpAddr>() {
        return Ok(ip);
    }

    let addrs = tokio::net::lookup_host(format!("{host}:0")).await?;
    addrs
        .into_iter()
        .next()
        .map(|addr| addr.ip())
        .ok_or_else(|| std::io::Error::new(std::io::ErrorKind::NotFound, "no addresses found"))
}
