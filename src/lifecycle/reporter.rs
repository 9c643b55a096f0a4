//! Error-tracking collaborator.
//!
//! Fatal startup errors are captured here before the process exits, and the
//! reporter is flushed exactly once right before exit.

use std::error::Error;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// Sink for errors an operator must see even when telemetry is down.
pub trait ErrorReporter: Send + Sync {
    /// Record `error` and its source chain.
    fn capture(&self, error: &(dyn Error + 'static));

    /// Flush buffered reports, waiting at most `timeout`.
    ///
    /// Returns whether everything was delivered in time.
    fn flush(&self, timeout: Duration) -> bool;
}

/// Reports errors as error-level log records.
#[derive(Debug, Default)]
pub struct LogReporter {
    captured: AtomicUsize,
}

impl LogReporter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Errors captured so far.
    pub fn captured(&self) -> usize {
        self.captured.load(Ordering::Relaxed)
    }
}

impl ErrorReporter for LogReporter {
    fn capture(&self, error: &(dyn Error + 'static)) {
        self.captured.fetch_add(1, Ordering::Relaxed);
        let chain = error_chain(error);
        tracing::error!(error = %error, chain = %chain, "Captured error");
    }

    fn flush(&self, _timeout: Duration) -> bool {
        // Records go straight to the subscriber; nothing is buffered here.
        true
    }
}

/// Render `error` and every source, outermost first.
pub fn error_chain(error: &(dyn Error + 'static)) -> String {
    let mut rendered = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        rendered.push_str(": ");
        rendered.push_str(&cause.to_string());
        source = cause.source();
    }
    rendered
}
