//! Periodic host reachability monitor
//!
//! Every sweep probes each registered host once, persists the round-trip time
//! of reachable hosts and sends a down-alert for unreachable ones.

pub mod alerts;
pub mod config;
pub mod hosts;
pub mod logging;
pub mod monitor;
pub mod probe;
pub mod storage;
pub mod util;

pub use hosts::{Host, HostId, HostRegistry};
pub use monitor::{MonitorCycleResult, ResultRouter, SchedulerHandle};
pub use probe::{ProbeOutcome, Prober};
