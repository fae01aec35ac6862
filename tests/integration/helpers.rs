//! Shared fakes for the integration tests

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use network_logger::{
    Host, HostId, HostRegistry, ProbeOutcome, Prober,
    alerts::{AlertEvent, Notifier, NotifyError},
    config::RunConfig,
    logging,
    monitor::{MemoryConsole, ResultRouter},
    storage::{HealthStatus, Reading, Recorder, StorageError, StorageResult},
};
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::layer::SubscriberExt;

/// Answers with a fixed latency per host; unknown hosts are down
#[derive(Default)]
pub struct ScriptedProber {
    latencies: HashMap<HostId, f64>,
    delay: Option<Duration>,
    probed: Mutex<Vec<HostId>>,
}

impl ScriptedProber {
    pub fn new(up: &[(&str, f64)]) -> Self {
        Self {
            latencies: up
                .iter()
                .map(|(id, latency)| (host_id(id), *latency))
                .collect(),
            ..Default::default()
        }
    }

    /// Every probe takes `delay` before answering
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn probed(&self) -> Vec<HostId> {
        self.probed.lock().unwrap().clone()
    }
}

#[async_trait]
impl Prober for ScriptedProber {
    async fn probe(&self, host: &HostId, _timeout: Duration) -> ProbeOutcome {
        self.probed.lock().unwrap().push(host.clone());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        match self.latencies.get(host) {
            Some(latency) => ProbeOutcome::reachable(*latency),
            None => ProbeOutcome::unreachable(),
        }
    }
}

/// Keeps every reading, optionally failing for some hosts
#[derive(Default)]
pub struct RecordingRecorder {
    readings: Mutex<Vec<Reading>>,
    failing: HashSet<HostId>,
}

impl RecordingRecorder {
    pub fn failing_for(hosts: &[&str]) -> Self {
        Self {
            failing: hosts.iter().map(|id| host_id(id)).collect(),
            ..Default::default()
        }
    }

    pub fn hosts(&self) -> Vec<String> {
        self.readings
            .lock()
            .unwrap()
            .iter()
            .map(|reading| reading.host.to_string())
            .collect()
    }
}

#[async_trait]
impl Recorder for RecordingRecorder {
    async fn record(&self, reading: &Reading) -> StorageResult<()> {
        if self.failing.contains(&reading.host) {
            return Err(StorageError::ConnectionFailed("connection refused".into()));
        }
        self.readings.lock().unwrap().push(reading.clone());
        Ok(())
    }

    async fn health_check(&self) -> StorageResult<HealthStatus> {
        Ok(HealthStatus {
            healthy: true,
            message: "recording".into(),
            metadata: HashMap::new(),
        })
    }
}

#[derive(Default)]
pub struct RecordingNotifier {
    events: Mutex<Vec<AlertEvent>>,
}

impl RecordingNotifier {
    pub fn events(&self) -> Vec<AlertEvent> {
        self.events.lock().unwrap().clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, event: &AlertEvent) -> Result<(), NotifyError> {
        self.events.lock().unwrap().push(event.clone());
        Ok(())
    }
}

/// The endpoint answers every alert with a server error
pub struct RejectingNotifier;

#[async_trait]
impl Notifier for RejectingNotifier {
    async fn notify(&self, _event: &AlertEvent) -> Result<(), NotifyError> {
        Err(NotifyError::Rejected { status: 500 })
    }
}

/// Never answers
pub struct HangingNotifier;

#[async_trait]
impl Notifier for HangingNotifier {
    async fn notify(&self, _event: &AlertEvent) -> Result<(), NotifyError> {
        std::future::pending().await
    }
}

/// In-memory sink for formatted log lines
#[derive(Clone, Default)]
pub struct LogBuffer(Arc<Mutex<Vec<u8>>>);

impl LogBuffer {
    pub fn lines(&self) -> Vec<String> {
        String::from_utf8(self.0.lock().unwrap().clone())
            .unwrap()
            .lines()
            .map(str::to_string)
            .collect()
    }
}

impl std::io::Write for LogBuffer {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for LogBuffer {
    type Writer = LogBuffer;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

/// Route this thread's events into an error log backed by `buffer`
pub fn capture_error_log(buffer: &LogBuffer) -> tracing::subscriber::DefaultGuard {
    let subscriber =
        tracing_subscriber::registry().with(logging::error_log_layer(buffer.clone()));
    tracing::subscriber::set_default(subscriber)
}

pub fn host_id(id: &str) -> HostId {
    HostId::parse(id).unwrap()
}

pub fn registry(ids: &[&str]) -> HostRegistry {
    let mut registry = HostRegistry::in_memory("alert@example.com");
    for id in ids {
        registry.add(host_id(id), None).unwrap();
    }
    registry
}

pub fn host(id: &str) -> Host {
    Host {
        id: host_id(id),
        destination: "alert@example.com".into(),
    }
}

pub fn run_config() -> RunConfig {
    RunConfig {
        interval: Duration::from_secs(60),
        console_only: false,
        verbose: false,
        run_once: false,
        probe_timeout: Duration::from_secs(3),
        storage_timeout: Duration::from_secs(10),
        alert_timeout: Duration::from_secs(30),
        max_concurrent_probes: 1,
    }
}

pub struct Pipeline {
    pub recorder: Arc<RecordingRecorder>,
    pub notifier: Arc<RecordingNotifier>,
    pub console: Arc<MemoryConsole>,
    pub router: ResultRouter,
}

pub fn pipeline(config: &RunConfig, recorder: RecordingRecorder) -> Pipeline {
    let recorder = Arc::new(recorder);
    let notifier = Arc::new(RecordingNotifier::default());
    let console = Arc::new(MemoryConsole::new());
    let router = ResultRouter::new(
        config,
        recorder.clone(),
        notifier.clone(),
        console.clone(),
    );

    Pipeline {
        recorder,
        notifier,
        console,
        router,
    }
}
