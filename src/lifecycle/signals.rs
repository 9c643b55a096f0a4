//! OS signal handling and the process's root cancellation.
//!
//! # Responsibilities
//! - Own the root cancellable context, cancelled at most once
//! - Translate SIGINT (and SIGTERM on unix) into that cancellation
//!
//! # Design Decisions
//! - Uses Tokio's signal handling (async-safe)
//! - Cancellation is sticky: waiters that subscribe after the fact still
//!   observe it, and the first reason wins
//! - Single-shot: the listener task exits after the first signal, so a
//!   second interrupt during shutdown is not acted upon

use std::fmt;
use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Why the root context was cancelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelReason {
    /// SIGINT / Ctrl+C.
    Interrupt,
    /// SIGTERM.
    Terminate,
    /// Cancelled programmatically.
    Requested,
}

impl fmt::Display for CancelReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CancelReason::Interrupt => "interrupt",
            CancelReason::Terminate => "terminate",
            CancelReason::Requested => "requested",
        };
        f.write_str(name)
    }
}

/// Root cancellation shared by everything started from `main`.
///
/// Clones observe the same state.
#[derive(Debug, Clone)]
pub struct Cancellation {
    tx: Arc<watch::Sender<Option<CancelReason>>>,
}

impl Cancellation {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(None);
        Self { tx: Arc::new(tx) }
    }

    /// Cancel with `reason`. Returns false if already cancelled.
    pub fn cancel(&self, reason: CancelReason) -> bool {
        self.tx.send_if_modified(|state| {
            if state.is_some() {
                false
            } else {
                *state = Some(reason);
                true
            }
        })
    }

    /// The reason, once cancelled.
    pub fn reason(&self) -> Option<CancelReason> {
        *self.tx.borrow()
    }

    pub fn is_cancelled(&self) -> bool {
        self.reason().is_some()
    }

    /// Wait until cancelled.
    pub async fn cancelled(&self) -> CancelReason {
        let mut rx = self.tx.subscribe();
        loop {
            if let Some(reason) = *rx.borrow_and_update() {
                return reason;
            }
            // The sender lives as long as `self`, so this only fails if it
            // was dropped concurrently; there is nothing left to wait for.
            if rx.changed().await.is_err() {
                return std::future::pending().await;
            }
        }
    }
}

impl Default for Cancellation {
    fn default() -> Self {
        Self::new()
    }
}

/// Wait for the first SIGINT (or SIGTERM on unix).
pub async fn wait_for_signal() -> CancelReason {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => CancelReason::Interrupt,
        () = terminate => CancelReason::Terminate,
    }
}

/// Spawn a task cancelling `cancellation` on the first OS signal.
pub fn spawn_signal_listener(cancellation: Cancellation) -> JoinHandle<()> {
    tokio::spawn(async move {
        let reason = wait_for_signal().await;
        tracing::info!(reason = %reason, "Shutdown signal received");
        cancellation.cancel(reason);
    })
}
