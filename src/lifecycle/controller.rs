//! Run controller: races the listener against root cancellation.
//!
//! # Responsibilities
//! - Run the network listener as an independent task
//! - Wait for whichever comes first: the listener ending, or cancellation
//! - Hand back a single `RunOutcome` deciding the shutdown path
//!
//! # Design Decisions
//! - Single-shot: the race is consumed once per controller run
//! - If the listener ended, it is not stopped again
//! - If cancelled, the listener task is detached and left running; no HTTP
//!   drain is attempted and process exit reclaims the socket
//! - When both are ready at once, the listener's result wins

use std::future::Future;

use crate::lifecycle::signals::{CancelReason, Cancellation};

/// Why the listener stopped serving.
#[derive(Debug, thiserror::Error)]
pub enum ListenerError {
    #[error("failed to bind {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: std::io::Error,
    },
    #[error("server error: {0}")]
    Serve(#[source] std::io::Error),
    #[error("listener exited without an error")]
    Exited,
    #[error("listener task panicked: {0}")]
    Panicked(String),
}

/// How the controller's race ended.
#[derive(Debug)]
pub enum RunOutcome {
    ListenerFailed(ListenerError),
    Cancelled(CancelReason),
}

impl RunOutcome {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, RunOutcome::Cancelled(_))
    }
}

/// Owns the root cancellation and runs the listener against it.
#[derive(Debug, Clone, Default)]
pub struct RunController {
    cancellation: Cancellation,
}

impl RunController {
    pub fn new(cancellation: Cancellation) -> Self {
        Self { cancellation }
    }

    pub fn cancellation(&self) -> &Cancellation {
        &self.cancellation
    }

    /// Spawn `listener` and wait for it to end or for cancellation.
    pub async fn run<F>(&self, listener: F) -> RunOutcome
    where
        F: Future<Output = Result<(), ListenerError>> + Send + 'static,
    {
        let mut task = tokio::spawn(listener);

        tokio::select! {
            biased;

            joined = &mut task => {
                let error = match joined {
                    Ok(Ok(())) => ListenerError::Exited,
                    Ok(Err(e)) => e,
                    Err(join) => ListenerError::Panicked(join.to_string()),
                };
                tracing::error!(error = %error, "Listener stopped");
                RunOutcome::ListenerFailed(error)
            }
            reason = self.cancellation.cancelled() => {
                tracing::info!(reason = %reason, "Shutting down");
                // Dropping the handle detaches the listener task.
                drop(task);
                RunOutcome::Cancelled(reason)
            }
        }
    }
}
