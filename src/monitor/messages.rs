//! Message types for the scheduler actor
//!
//! Commands travel over an mpsc channel to the actor; the actor publishes its
//! status on a watch channel so any number of observers can follow it.

use std::ops::AddAssign;

use tokio::sync::oneshot;

/// Summary of one sweep, or of routing a single host
///
/// The router returns a delta for a single host; the scheduler sums the deltas
/// of a sweep with `+=`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MonitorCycleResult {
    /// Hosts probed and routed
    pub checked: usize,

    /// Hosts that answered
    pub up: usize,

    /// Hosts that did not answer
    pub down: usize,

    /// Readings written successfully
    pub recorded: usize,

    /// Alerts delivered successfully
    pub alerted: usize,

    /// Alerts dropped because alerting is disabled
    pub alerts_discarded: usize,

    /// Readings that could not be written
    pub storage_failures: usize,

    /// Alerts that could not be delivered
    pub notify_failures: usize,

    /// Hosts were skipped because of a shutdown request
    pub interrupted: bool,
}

impl MonitorCycleResult {
    pub fn failures(&self) -> usize {
        self.storage_failures + self.notify_failures
    }
}

impl AddAssign for MonitorCycleResult {
    fn add_assign(&mut self, rhs: Self) {
        self.checked += rhs.checked;
        self.up += rhs.up;
        self.down += rhs.down;
        self.recorded += rhs.recorded;
        self.alerted += rhs.alerted;
        self.alerts_discarded += rhs.alerts_discarded;
        self.storage_failures += rhs.storage_failures;
        self.notify_failures += rhs.notify_failures;
        self.interrupted |= rhs.interrupted;
    }
}

/// Lifecycle of the scheduler
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    /// Configured, no sweep started yet
    Idle,

    /// Probing and routing hosts
    Sweeping,

    /// Sleeping until the next sweep
    Waiting,

    /// Terminal
    Stopped,
}

/// What the scheduler publishes after every transition
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchedulerStatus {
    pub state: SchedulerState,

    /// Number of finished sweeps (interrupted ones included)
    pub sweeps_completed: u64,

    /// Result of the most recent finished sweep
    pub last_sweep: Option<MonitorCycleResult>,
}

impl Default for SchedulerStatus {
    fn default() -> Self {
        Self {
            state: SchedulerState::Idle,
            sweeps_completed: 0,
            last_sweep: None,
        }
    }
}

/// Commands that can be sent to the scheduler actor
#[derive(Debug)]
pub enum SchedulerCommand {
    /// Run a sweep right away
    ///
    /// While waiting, the sweep runs immediately and the remaining sleep is kept.
    /// During a sweep, the reply carries the result of the sweep in progress.
    SweepNow {
        respond_to: oneshot::Sender<MonitorCycleResult>,
    },

    /// Stop after the host currently being routed
    Shutdown,
}
