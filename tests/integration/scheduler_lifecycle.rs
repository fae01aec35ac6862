//! Integration tests for the scheduler state machine
//!
//! All tests run with paused time, so sleeping is instantaneous unless the
//! scheduler is actually waiting on something.

use std::sync::Arc;
use std::time::Duration;

use network_logger::monitor::{SchedulerHandle, SchedulerState};
use pretty_assertions::assert_eq;
use tokio::time::Instant;

use crate::helpers::*;

#[tokio::test(start_paused = true)]
async fn test_run_once_sweeps_exactly_once_without_sleeping() {
    let mut config = run_config();
    config.run_once = true;
    let Pipeline {
        recorder, router, ..
    } = pipeline(&config, RecordingRecorder::default());
    let prober = Arc::new(ScriptedProber::new(&[("a", 1.0)]));

    let started = Instant::now();
    let handle = SchedulerHandle::spawn(config, registry(&["a"]), prober.clone(), router);
    let status = handle.stopped().await;

    assert_eq!(status.state, SchedulerState::Stopped);
    assert_eq!(status.sweeps_completed, 1);
    assert_eq!(prober.probed().len(), 1);
    assert_eq!(recorder.hosts(), vec!["a"]);
    assert!(started.elapsed() < Duration::from_secs(1));
}

#[tokio::test(start_paused = true)]
async fn test_run_once_with_empty_registry_stops() {
    let mut config = run_config();
    config.run_once = true;
    let Pipeline { router, .. } = pipeline(&config, RecordingRecorder::default());

    let handle = SchedulerHandle::spawn(
        config,
        registry(&[]),
        Arc::new(ScriptedProber::default()),
        router,
    );
    let status = handle.stopped().await;

    assert_eq!(status.sweeps_completed, 1);
    assert_eq!(status.last_sweep.unwrap().checked, 0);
}

#[tokio::test(start_paused = true)]
async fn test_sweeps_are_separated_by_interval() {
    let config = run_config();
    let interval = config.interval;
    let Pipeline { router, .. } = pipeline(&config, RecordingRecorder::default());
    let prober = Arc::new(ScriptedProber::new(&[("a", 1.0)]));

    let handle = SchedulerHandle::spawn(config, registry(&["a"]), prober.clone(), router);
    let mut status = handle.subscribe();

    status
        .wait_for(|status| status.sweeps_completed == 1 && status.state == SchedulerState::Waiting)
        .await
        .unwrap();
    let first_wait = Instant::now();

    status
        .wait_for(|status| status.sweeps_completed == 2)
        .await
        .unwrap();

    assert!(first_wait.elapsed() >= interval);
    assert_eq!(prober.probed().len(), 2);

    handle.shutdown().await;
    handle.stopped().await;
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_interrupts_sleep() {
    let config = run_config();
    let Pipeline { router, .. } = pipeline(&config, RecordingRecorder::default());

    let handle = SchedulerHandle::spawn(
        config,
        registry(&["a"]),
        Arc::new(ScriptedProber::new(&[("a", 1.0)])),
        router,
    );
    let mut status = handle.subscribe();
    status
        .wait_for(|status| status.state == SchedulerState::Waiting)
        .await
        .unwrap();

    let started = Instant::now();
    handle.shutdown().await;
    let status = handle.stopped().await;

    assert_eq!(status.sweeps_completed, 1);
    assert!(started.elapsed() < Duration::from_secs(1));
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_during_sweep_skips_remaining_hosts() {
    let config = run_config();
    let Pipeline {
        recorder, router, ..
    } = pipeline(&config, RecordingRecorder::default());
    let prober = Arc::new(
        ScriptedProber::new(&[("a", 1.0), ("b", 2.0), ("c", 3.0)])
            .with_delay(Duration::from_secs(1)),
    );

    let handle = SchedulerHandle::spawn(config, registry(&["a", "b", "c"]), prober, router);
    let mut status = handle.subscribe();
    status
        .wait_for(|status| status.state == SchedulerState::Sweeping)
        .await
        .unwrap();

    // lands while the first probe is in flight
    handle.shutdown().await;
    let status = handle.stopped().await;

    let sweep = status.last_sweep.unwrap();
    assert!(sweep.interrupted);
    assert_eq!(sweep.checked, 1);
    assert_eq!(recorder.hosts(), vec!["a"]);
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_during_last_host_completes_sweep() {
    let config = run_config();
    let Pipeline {
        recorder, router, ..
    } = pipeline(&config, RecordingRecorder::default());
    let prober = Arc::new(ScriptedProber::new(&[("a", 1.0)]).with_delay(Duration::from_secs(1)));

    let handle = SchedulerHandle::spawn(config, registry(&["a"]), prober, router);
    let mut status = handle.subscribe();
    status
        .wait_for(|status| status.state == SchedulerState::Sweeping)
        .await
        .unwrap();

    // lands while the only probe is in flight
    handle.shutdown().await;
    let status = handle.stopped().await;

    let sweep = status.last_sweep.unwrap();
    assert!(!sweep.interrupted);
    assert_eq!(sweep.checked, 1);
    assert_eq!(status.sweeps_completed, 1);
    assert_eq!(recorder.hosts(), vec!["a"]);
}

#[tokio::test(start_paused = true)]
async fn test_sweep_now_runs_immediately() {
    let config = run_config();
    let interval = config.interval;
    let Pipeline { router, .. } = pipeline(&config, RecordingRecorder::default());
    let prober = Arc::new(ScriptedProber::new(&[("a", 1.0)]));

    let handle = SchedulerHandle::spawn(config, registry(&["a", "b"]), prober.clone(), router);
    let mut status = handle.subscribe();
    status
        .wait_for(|status| status.state == SchedulerState::Waiting)
        .await
        .unwrap();

    let started = Instant::now();
    let sweep = handle.sweep_now().await.unwrap();

    assert_eq!(sweep.checked, 2);
    assert_eq!(sweep.up, 1);
    assert!(started.elapsed() < interval);
    assert_eq!(handle.status().sweeps_completed, 2);
    assert_eq!(handle.state(), SchedulerState::Waiting);

    handle.shutdown().await;
    handle.stopped().await;
}

#[tokio::test(start_paused = true)]
async fn test_dropping_every_handle_stops_scheduler() {
    let config = run_config();
    let Pipeline { router, .. } = pipeline(&config, RecordingRecorder::default());

    let handle = SchedulerHandle::spawn(
        config,
        registry(&["a"]),
        Arc::new(ScriptedProber::default()),
        router,
    );
    let mut status = handle.subscribe();
    drop(handle);

    status
        .wait_for(|status| status.state == SchedulerState::Stopped)
        .await
        .unwrap();
}
