//! Prober backed by the system `ping` binary
//!
//! Useful where the process may not open ICMP sockets itself. The binary is run
//! with a single echo request and the round-trip time is read from the
//! `time=<ms> ms` fragment of its output.

use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;
use tokio::time::timeout;
use tracing::{debug, instrument, warn};

use super::{ProbeOutcome, Prober};
use crate::hosts::HostId;

const DEFAULT_PROGRAM: &str = "ping";

#[derive(Debug, Clone)]
pub struct CommandProber {
    program: String,
}

impl CommandProber {
    pub fn new() -> Self {
        Self::with_program(DEFAULT_PROGRAM)
    }

    pub fn with_program(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl Default for CommandProber {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Prober for CommandProber {
    #[instrument(skip(self), fields(host = %host))]
    async fn probe(&self, host: &HostId, probe_timeout: Duration) -> ProbeOutcome {
        let child = Command::new(&self.program)
            .args(["-c", "1", host.as_str()])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn();

        let child = match child {
            Ok(child) => child,
            Err(e) => {
                warn!("failed to run {}: {e}", self.program);
                return ProbeOutcome::unreachable();
            }
        };

        // dropping the future on timeout kills the child
        let output = match timeout(probe_timeout, child.wait_with_output()).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => {
                warn!("failed to wait for {}: {e}", self.program);
                return ProbeOutcome::unreachable();
            }
            Err(_) => {
                debug!("ping command timed out");
                return ProbeOutcome::unreachable();
            }
        };

        if !output.status.success() {
            debug!("ping exited with {}", output.status);
            return ProbeOutcome::unreachable();
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        match parse_latency(&stdout) {
            Some(latency_ms) => ProbeOutcome::reachable(latency_ms),
            None => {
                warn!("could not parse ping output");
                ProbeOutcome::unreachable()
            }
        }
    }
}

/// Extract the round-trip time from `ping` output
pub fn parse_latency(output: &str) -> Option<f64> {
    let (_, rest) = output.rsplit_once("time=")?;
    let value: String = rest
        .trim_start()
        .chars()
        .take_while(|c| c.is_ascii_digit() || *c == '.')
        .collect();
    value.parse().ok()
}
