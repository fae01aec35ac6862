//! SchedulerActor - Drives the sweep cadence
//!
//! ## Message Flow
//!
//! ```text
//! Sweep: for each host → Prober → ProbeOutcome → ResultRouter → [Recorder, Notifier, Console]
//!   ↓
//! Wait interval (interruptible) → Sweep → ...
//!   ↑
//!   └─── Commands (SweepNow, Shutdown)
//! ```
//!
//! The period is the sweep duration plus the interval: the sleep starts when a
//! sweep ends and is never shortened to compensate for slow sweeps.

use std::sync::Arc;

use anyhow::Result;
use futures::StreamExt;
use futures::stream;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::time::sleep;
use tracing::{debug, info, instrument, trace, warn};

use super::messages::{MonitorCycleResult, SchedulerCommand, SchedulerState, SchedulerStatus};
use super::router::ResultRouter;
use crate::config::RunConfig;
use crate::hosts::{Host, HostRegistry};
use crate::probe::Prober;

/// What to do after draining pending commands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Control {
    Continue,
    Stop,
}

pub struct SchedulerActor {
    config: RunConfig,

    /// Re-read before every sweep
    registry: HostRegistry,

    prober: Arc<dyn Prober>,

    router: ResultRouter,

    command_rx: mpsc::Receiver<SchedulerCommand>,

    status_tx: watch::Sender<SchedulerStatus>,

    /// Replies owed to `SweepNow` requests that arrived mid-sweep
    pending_replies: Vec<oneshot::Sender<MonitorCycleResult>>,

    /// A `Shutdown` arrived while sweeping
    shutdown_requested: bool,
}

impl SchedulerActor {
    pub fn new(
        config: RunConfig,
        registry: HostRegistry,
        prober: Arc<dyn Prober>,
        router: ResultRouter,
        command_rx: mpsc::Receiver<SchedulerCommand>,
        status_tx: watch::Sender<SchedulerStatus>,
    ) -> Self {
        Self {
            config,
            registry,
            prober,
            router,
            command_rx,
            status_tx,
            pending_replies: Vec::new(),
            shutdown_requested: false,
        }
    }

    /// Run until `run_once` completes, a shutdown is requested or every handle
    /// is dropped
    #[instrument(skip(self))]
    pub async fn run(mut self) {
        debug!(
            "starting scheduler (interval: {:?}, once: {}, console only: {})",
            self.config.interval, self.config.run_once, self.config.console_only
        );

        loop {
            self.sweep().await;
            if self.shutdown_requested {
                break;
            }

            if self.config.run_once {
                if self.config.verbose {
                    self.router
                        .console()
                        .line("Completed a single round of monitoring.");
                }
                break;
            }

            if self.wait().await == Control::Stop {
                break;
            }
        }

        self.set_state(SchedulerState::Stopped);
        debug!("scheduler stopped");
    }

    /// Sleep for the interval, serving commands meanwhile
    async fn wait(&mut self) -> Control {
        self.set_state(SchedulerState::Waiting);
        trace!("sleeping for {:?}", self.config.interval);

        let timer = sleep(self.config.interval);
        tokio::pin!(timer);

        loop {
            tokio::select! {
                _ = &mut timer => return Control::Continue,

                cmd = self.command_rx.recv() => match cmd {
                    Some(SchedulerCommand::SweepNow { respond_to }) => {
                        debug!("received SweepNow command");
                        let result = self.sweep().await;
                        if !self.shutdown_requested {
                            self.set_state(SchedulerState::Waiting);
                        }
                        let _ = respond_to.send(result);
                        if self.shutdown_requested {
                            return Control::Stop;
                        }
                    }

                    Some(SchedulerCommand::Shutdown) => {
                        debug!("received shutdown command");
                        return Control::Stop;
                    }

                    None => {
                        warn!("command channel closed, shutting down");
                        return Control::Stop;
                    }
                }
            }
        }
    }

    /// Probe and route every registered host once
    #[instrument(skip(self))]
    async fn sweep(&mut self) -> MonitorCycleResult {
        self.set_state(SchedulerState::Sweeping);

        if let Err(e) = self.registry.reload() {
            warn!("keeping previous host list: {e}");
        }
        let hosts = self.registry.list();

        let mut result = MonitorCycleResult::default();

        if hosts.is_empty() {
            let location = self
                .registry
                .path()
                .map(|path| path.display().to_string())
                .unwrap_or_else(|| "the host list".to_string());
            warn!("No hosts to monitor. Please check {location}.");
            if self.config.verbose {
                self.router
                    .console()
                    .line(&format!("No hosts to monitor. Please check {location}."));
            }
        } else {
            result = self.sweep_hosts(hosts).await;
        }

        self.finish_sweep(result);
        result
    }

    async fn sweep_hosts(&mut self, hosts: Vec<Host>) -> MonitorCycleResult {
        let prober = Arc::clone(&self.prober);
        let console = Arc::clone(self.router.console());
        let timeout = self.config.probe_timeout;
        let verbose = self.config.verbose;
        let total = hosts.len();

        // probes may overlap, routing always happens in registry order
        let mut outcomes = stream::iter(hosts)
            .map(|host| {
                let prober = Arc::clone(&prober);
                let console = Arc::clone(&console);
                async move {
                    if verbose {
                        console.line(&format!("Checking host: {}", host.id));
                    }
                    let outcome = prober.probe(&host.id, timeout).await;
                    (host, outcome)
                }
            })
            .buffered(self.config.max_concurrent_probes);

        let mut result = MonitorCycleResult::default();

        while let Some((host, outcome)) = outcomes.next().await {
            result += self.router.route(&host, outcome).await;

            if self.drain_commands() == Control::Stop {
                // a shutdown during the last host still completes the sweep
                if result.checked < total {
                    info!(
                        "shutdown requested, skipping {} remaining hosts",
                        total - result.checked
                    );
                    result.interrupted = true;
                }
                break;
            }
        }

        result
    }

    /// Handle commands that arrived while sweeping
    fn drain_commands(&mut self) -> Control {
        loop {
            match self.command_rx.try_recv() {
                Ok(SchedulerCommand::SweepNow { respond_to }) => {
                    self.pending_replies.push(respond_to);
                }
                Ok(SchedulerCommand::Shutdown) => {
                    debug!("received shutdown command during sweep");
                    self.shutdown_requested = true;
                    return Control::Stop;
                }
                Err(mpsc::error::TryRecvError::Empty) => return Control::Continue,
                Err(mpsc::error::TryRecvError::Disconnected) => {
                    // finish the sweep; the wait will notice the closed channel
                    return Control::Continue;
                }
            }
        }
    }

    fn finish_sweep(&mut self, result: MonitorCycleResult) {
        info!(
            checked = result.checked,
            up = result.up,
            down = result.down,
            failures = result.failures(),
            "sweep complete"
        );

        for reply in self.pending_replies.drain(..) {
            let _ = reply.send(result);
        }

        self.status_tx.send_modify(|status| {
            status.sweeps_completed += 1;
            status.last_sweep = Some(result);
        });
    }

    fn set_state(&self, state: SchedulerState) {
        trace!("scheduler state: {state:?}");
        self.status_tx.send_modify(|status| status.state = state);
    }
}

/// Handle for controlling a SchedulerActor
#[derive(Clone)]
pub struct SchedulerHandle {
    sender: mpsc::Sender<SchedulerCommand>,
    status_rx: watch::Receiver<SchedulerStatus>,
}

impl SchedulerHandle {
    /// Spawn a new scheduler actor
    pub fn spawn(
        config: RunConfig,
        registry: HostRegistry,
        prober: Arc<dyn Prober>,
        router: ResultRouter,
    ) -> Self {
        let (cmd_tx, cmd_rx) = mpsc::channel(32);
        let (status_tx, status_rx) = watch::channel(SchedulerStatus::default());

        let actor = SchedulerActor::new(config, registry, prober, router, cmd_rx, status_tx);

        tokio::spawn(actor.run());

        Self {
            sender: cmd_tx,
            status_rx,
        }
    }

    /// Trigger an immediate sweep and wait for its result
    pub async fn sweep_now(&self) -> Result<MonitorCycleResult> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(SchedulerCommand::SweepNow { respond_to: tx })
            .await?;

        Ok(rx.await?)
    }

    /// Ask the scheduler to stop
    ///
    /// An interrupted sweep finishes routing its current host first.
    pub async fn shutdown(&self) {
        let _ = self.sender.send(SchedulerCommand::Shutdown).await;
    }

    pub fn status(&self) -> SchedulerStatus {
        self.status_rx.borrow().clone()
    }

    pub fn state(&self) -> SchedulerState {
        self.status_rx.borrow().state
    }

    /// Watch status transitions
    pub fn subscribe(&self) -> watch::Receiver<SchedulerStatus> {
        self.status_rx.clone()
    }

    /// Wait until the scheduler reached `Stopped`
    pub async fn stopped(&self) -> SchedulerStatus {
        let mut rx = self.status_rx.clone();
        let stopped = rx
            .wait_for(|status| status.state == SchedulerState::Stopped)
            .await
            .map(|status| status.clone());

        match stopped {
            Ok(status) => status,
            // the actor is gone, which only happens after it stopped
            Err(_) => {
                let mut status = rx.borrow().clone();
                status.state = SchedulerState::Stopped;
                status
            }
        }
    }
}
