//! The monitoring loop
//!
//! A single [`SchedulerActor`](scheduler::SchedulerActor) owns the sweep
//! cadence. Each sweep probes the registered hosts and hands every outcome to
//! the [`ResultRouter`](router::ResultRouter), which decides between persisting
//! a reading, sending a down-alert and echoing a console line.
//!
//! ```text
//!   SchedulerHandle ── mpsc (SweepNow, Shutdown) ──► SchedulerActor
//!         ▲                                              │
//!         └──────── watch (SchedulerStatus) ◄────────────┤
//!                                                        │ per host
//!                                                        ▼
//!                                 Prober ──► ResultRouter ──► Recorder
//!                                                       ├──► Notifier
//!                                                       └──► Console
//! ```
//!
//! ## Communication Patterns
//!
//! 1. **Commands**: the handle sends control messages over an mpsc channel
//! 2. **Status**: the actor publishes every state change on a watch channel
//! 3. **Request/Response**: `SweepNow` carries a oneshot for the sweep result

pub mod console;
pub mod messages;
pub mod router;
pub mod scheduler;

pub use console::{Console, MemoryConsole, StdoutConsole};
pub use messages::{MonitorCycleResult, SchedulerCommand, SchedulerState, SchedulerStatus};
pub use router::ResultRouter;
pub use scheduler::{SchedulerActor, SchedulerHandle};
