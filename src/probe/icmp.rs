//! ICMP echo prober

use std::net::IpAddr;
use std::time::Duration;

use async_trait::async_trait;
use surge_ping::{Client, Config, ICMP, PingIdentifier, PingSequence};
use tokio::time::timeout;
use tracing::{debug, instrument, warn};

use super::{ProbeError, ProbeOutcome, Prober, resolve_host};
use crate::hosts::HostId;

/// Sends a single ICMP echo request per probe
///
/// The sockets are opened once, so a missing permission shows up when the
/// prober is built instead of as every host being down.
#[derive(Clone)]
pub struct IcmpProber {
    v4: Client,

    /// Absent on hosts without IPv6 support
    v6: Option<Client>,
}

impl IcmpProber {
    /// Open the ICMP sockets; must be called inside a tokio runtime
    pub fn new() -> Result<Self, ProbeError> {
        let v4 = Client::new(&Config::default()).map_err(ProbeError::IcmpSocket)?;

        let v6 = match Client::new(&Config::builder().kind(ICMP::V6).build()) {
            Ok(client) => Some(client),
            Err(e) => {
                warn!("IPv6 hosts will be reported down, no ICMPv6 socket: {e}");
                None
            }
        };

        Ok(Self { v4, v6 })
    }
}

#[async_trait]
impl Prober for IcmpProber {
    #[instrument(skip(self), fields(host = %host))]
    async fn probe(&self, host: &HostId, probe_timeout: Duration) -> ProbeOutcome {
        // resolution counts against the same budget as the echo
        let ip_addr = match timeout(probe_timeout, resolve_host(host.as_str())).await {
            Ok(Ok(ip)) => ip,
            Ok(Err(e)) => {
                debug!("failed to resolve host: {e}");
                return ProbeOutcome::unreachable();
            }
            Err(_) => {
                debug!("host resolution timed out");
                return ProbeOutcome::unreachable();
            }
        };

        let client = match (ip_addr, &self.v6) {
            (IpAddr::V4(_), _) => &self.v4,
            (IpAddr::V6(_), Some(client)) => client,
            (IpAddr::V6(_), None) => {
                debug!("no ICMPv6 socket");
                return ProbeOutcome::unreachable();
            }
        };

        let mut pinger = client.pinger(ip_addr, PingIdentifier(rand::random())).await;
        pinger.timeout(probe_timeout);

        match timeout(probe_timeout, pinger.ping(PingSequence(0), &[])).await {
            Ok(Ok((_, rtt))) => {
                let latency_ms = rtt.as_secs_f64() * 1000.0;
                debug!(latency_ms, "echo reply received");
                ProbeOutcome::reachable(latency_ms)
            }
            Ok(Err(e)) => {
                debug!("ping failed: {e}");
                ProbeOutcome::unreachable()
            }
            Err(_) => {
                debug!(timeout_ms = probe_timeout.as_millis() as u64, "ping timed out");
                ProbeOutcome::unreachable()
            }
        }
    }
}
