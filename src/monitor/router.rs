//! ResultRouter - Turns a probe outcome into actions
//!
//! ## Decision Table
//!
//! | outcome     | console line                  | persist       | alert         |
//! |-------------|-------------------------------|---------------|---------------|
//! | reachable   | if verbose                    | unless console-only | never   |
//! | unreachable | if verbose or not console-only | never        | unless console-only |
//!
//! Down-events are never silent: outside console-only mode they are always
//! echoed.
//!
//! ## Failure Isolation
//!
//! Recorder and notifier calls are bounded by the router's own timeouts and
//! their errors are logged here, once, and counted in the returned delta. They
//! never propagate, so one host's storage or mail problem cannot stop the rest
//! of the sweep.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::timeout;
use tracing::{debug, error, instrument};

use super::console::Console;
use super::messages::MonitorCycleResult;
use crate::alerts::{AlertEvent, Notifier, NotifyError};
use crate::config::RunConfig;
use crate::hosts::Host;
use crate::probe::ProbeOutcome;
use crate::storage::{Reading, Recorder, StorageError};

pub struct ResultRouter {
    recorder: Arc<dyn Recorder>,
    notifier: Arc<dyn Notifier>,
    console: Arc<dyn Console>,
    console_only: bool,
    verbose: bool,
    storage_timeout: Duration,
    alert_timeout: Duration,
}

impl ResultRouter {
    pub fn new(
        config: &RunConfig,
        recorder: Arc<dyn Recorder>,
        notifier: Arc<dyn Notifier>,
        console: Arc<dyn Console>,
    ) -> Self {
        Self {
            recorder,
            notifier,
            console,
            console_only: config.console_only,
            verbose: config.verbose,
            storage_timeout: config.storage_timeout,
            alert_timeout: config.alert_timeout,
        }
    }

    pub fn console(&self) -> &Arc<dyn Console> {
        &self.console
    }

    /// Route the outcome of probing `host`
    ///
    /// Returns the contribution of this host to the sweep summary.
    #[instrument(skip(self, host, outcome), fields(host = %host.id))]
    pub async fn route(&self, host: &Host, outcome: ProbeOutcome) -> MonitorCycleResult {
        let mut delta = MonitorCycleResult {
            checked: 1,
            ..Default::default()
        };

        match outcome {
            ProbeOutcome::Reachable {
                latency_ms,
                measured_at,
            } => {
                delta.up = 1;

                if self.verbose {
                    self.console.line(&format!(
                        "Host {} is up with latency {latency_ms:.3} ms",
                        host.id
                    ));
                }

                if !self.console_only {
                    let reading = Reading::new(host.id.clone(), latency_ms, measured_at);
                    match self.record(&reading).await {
                        Ok(()) => delta.recorded = 1,
                        Err(e) => {
                            delta.storage_failures = 1;
                            self.report_storage_error(host, &e);
                        }
                    }
                }
            }

            ProbeOutcome::Unreachable { measured_at } => {
                delta.down = 1;

                if self.verbose || !self.console_only {
                    self.console.line(&format!("Host {} is down!", host.id));
                }

                if !self.console_only {
                    let event = AlertEvent::host_down(host, measured_at);
                    match self.notify(&event).await {
                        Ok(()) if self.notifier.delivers() => delta.alerted = 1,
                        Ok(()) => delta.alerts_discarded = 1,
                        Err(e) => {
                            delta.notify_failures = 1;
                            self.report_notify_error(host, &e);
                        }
                    }
                }
            }
        }

        delta
    }

    async fn record(&self, reading: &Reading) -> Result<(), StorageError> {
        match timeout(self.storage_timeout, self.recorder.record(reading)).await {
            Ok(result) => result,
            Err(_) => Err(StorageError::Timeout(self.storage_timeout)),
        }
    }

    async fn notify(&self, event: &AlertEvent) -> Result<(), NotifyError> {
        match timeout(self.alert_timeout, self.notifier.notify(event)).await {
            Ok(result) => result,
            Err(_) => Err(NotifyError::Timeout(self.alert_timeout)),
        }
    }

    fn report_storage_error(&self, host: &Host, err: &StorageError) {
        match err {
            StorageError::Timeout(limit) => {
                error!(host = %host.id, "Database error: no answer within {limit:?}, reading dropped");
            }
            StorageError::ConnectionFailed(_) | StorageError::Io(_) => {
                error!(host = %host.id, "Database error: backend unreachable: {err}");
            }
            StorageError::QueryFailed(_)
            | StorageError::MigrationFailed(_)
            | StorageError::InvalidConfig(_) => {
                error!(host = %host.id, "Database error: {err}");
            }
        }

        if self.verbose {
            self.console.line(&format!("Error: {err}"));
        }
    }

    fn report_notify_error(&self, host: &Host, err: &NotifyError) {
        match err {
            NotifyError::InvalidAddress { address, .. } => {
                error!(host = %host.id, "Failed to send alert: destination {address:?} is not usable: {err}");
            }
            NotifyError::Timeout(limit) => {
                error!(host = %host.id, "Failed to send alert: no answer within {limit:?}");
            }
            NotifyError::Message(_) | NotifyError::Transport(_) | NotifyError::Rejected { .. } => {
                error!(host = %host.id, "Failed to send alert: {err}");
            }
        }

        if self.verbose {
            self.console.line(&format!("Failed to send alert: {err}"));
        } else {
            debug!("alert for {} not delivered", host.id);
        }
    }
}
