//! Notes service (v1)
//!
//! A small notes API built with Tokio and Axum, instrumented end to end
//! with OpenTelemetry.
//!
//! # Architecture Overview
//!
//! ```text
//!   config ──▶ observability::init ──▶ ProviderSet (trace, metric, log)
//!                                           │
//!   Client ──▶ http (request span) ──▶ handlers ──▶ notes store
//!                                           │
//!   SIGINT/SIGTERM ──▶ RunController ──▶ ShutdownSequencer ──▶ exit
//! ```

use std::process::ExitCode;

fn main() -> ExitCode {
    notes_service::lifecycle::startup::run()
}
