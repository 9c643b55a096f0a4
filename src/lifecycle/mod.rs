//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Load config → Bootstrap telemetry → Build server → Run controller
//!
//! Run (controller.rs):
//!     Listener task ──┐
//!                     ├─ first to finish decides the RunOutcome
//!     Cancellation ───┘
//!
//! Signals (signals.rs):
//!     SIGINT/SIGTERM → cancel the root context (once)
//!
//! Shutdown (shutdown.rs):
//!     RunOutcome → drain log → metric → trace under one budget → Exit
//! ```
//!
//! # Design Decisions
//! - Ordered startup: config first, then telemetry, then the listener
//! - Ordered shutdown: log, metric, trace; every provider is attempted
//! - Shutdown has a timeout: providers still draining at the deadline are
//!   reported as timed out and abandoned
//! - Fatal startup errors go to the error reporter before exit

pub mod controller;
pub mod reporter;
pub mod shutdown;
pub mod signals;
pub mod startup;

pub use controller::{ListenerError, RunController, RunOutcome};
pub use reporter::{ErrorReporter, LogReporter};
pub use shutdown::{ShutdownReport, ShutdownSequencer};
pub use signals::{CancelReason, Cancellation};
