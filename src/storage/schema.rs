//! Reading rows
//!
//! Both relational backends use the same table layout:
//!
//! | column      | meaning                                   |
//! |-------------|-------------------------------------------|
//! | `host`      | host identifier as configured             |
//! | `latency`   | round-trip time in milliseconds           |
//! | `timestamp` | when the probe completed (defaults to now) |

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::hosts::HostId;

/// A persisted latency measurement for a reachable host
///
/// Only ever built from a reachable probe outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    pub host: HostId,
    pub latency_ms: f64,
    pub timestamp: DateTime<Utc>,
}

impl Reading {
    pub fn new(host: HostId, latency_ms: f64, timestamp: DateTime<Utc>) -> Self {
        Self {
            host,
            latency_ms,
            timestamp,
        }
    }
}
