//! Shutdown sequencing for the telemetry providers.
//!
//! # Responsibilities
//! - Drain every constructed provider exactly once, in the order
//!   log → metric → trace
//! - Bound the whole sequence by one time budget
//! - Report every individual result, not just the first failure
//!
//! # Design Decisions
//! - Log drains first so teardown records of the other two pipelines are
//!   still written locally rather than lost mid-flush
//! - A failure, panic or timeout of one provider never skips the next
//! - Drains run on the blocking pool; a provider that overruns the budget
//!   is abandoned, not cancelled

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;

use crate::observability::ProviderKind;

/// Something that can flush and close one telemetry pipeline.
pub trait Drain: Send + Sync + 'static {
    fn drain(&self) -> Result<(), DrainError>;
}

/// Failure reported by a provider's own shutdown.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{0}")]
pub struct DrainError(String);

impl DrainError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// One provider handed to the sequencer.
#[derive(Clone)]
pub struct DrainTarget {
    kind: ProviderKind,
    drain: Arc<dyn Drain>,
}

impl DrainTarget {
    pub fn new(kind: ProviderKind, drain: Arc<dyn Drain>) -> Self {
        Self { kind, drain }
    }

    pub fn kind(&self) -> ProviderKind {
        self.kind
    }
}

impl fmt::Debug for DrainTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DrainTarget")
            .field("kind", &self.kind)
            .finish_non_exhaustive()
    }
}

/// Why one provider failed to shut down.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ShutdownError {
    #[error("{kind} provider failed to drain: {source}")]
    Drain {
        kind: ProviderKind,
        #[source]
        source: DrainError,
    },
    #[error("{kind} provider did not drain within {budget:?}")]
    TimedOut { kind: ProviderKind, budget: Duration },
    #[error("{kind} provider panicked while draining: {message}")]
    Panicked { kind: ProviderKind, message: String },
}

/// Result of draining one provider.
#[derive(Debug, Clone)]
pub struct ShutdownOutcome {
    pub kind: ProviderKind,
    pub result: Result<(), ShutdownError>,
}

/// Ordered per-provider results of one shutdown sequence.
#[derive(Debug, Clone, Default)]
pub struct ShutdownReport {
    outcomes: Vec<ShutdownOutcome>,
}

impl ShutdownReport {
    pub fn outcomes(&self) -> &[ShutdownOutcome] {
        &self.outcomes
    }

    /// Number of providers a shutdown was attempted on.
    pub fn attempts(&self) -> usize {
        self.outcomes.len()
    }

    pub fn is_clean(&self) -> bool {
        self.outcomes.iter().all(|o| o.result.is_ok())
    }

    pub fn failures(&self) -> impl Iterator<Item = &ShutdownError> {
        self.outcomes.iter().filter_map(|o| o.result.as_ref().err())
    }

    /// Collapse into a multi-error carrying every failure.
    pub fn into_result(self) -> Result<(), ShutdownErrors> {
        let errors: Vec<ShutdownError> = self
            .outcomes
            .into_iter()
            .filter_map(|o| o.result.err())
            .collect();
        if errors.is_empty() {
            Ok(())
        } else {
            Err(ShutdownErrors(errors))
        }
    }
}

/// Every provider failure of one shutdown sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShutdownErrors(pub Vec<ShutdownError>);

impl fmt::Display for ShutdownErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} provider(s) failed to shut down: ", self.0.len())?;
        for (i, err) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, "; ")?;
            }
            write!(f, "{}", err)?;
        }
        Ok(())
    }
}

impl std::error::Error for ShutdownErrors {}

/// Drains providers sequentially under one overall budget.
#[derive(Debug, Clone)]
pub struct ShutdownSequencer {
    budget: Duration,
}

impl ShutdownSequencer {
    pub fn new(budget: Duration) -> Self {
        Self { budget }
    }

    pub fn budget(&self) -> Duration {
        self.budget
    }

    /// Drain every target once, log first and trace last.
    ///
    /// Once the budget is spent, remaining providers are still invoked;
    /// they simply get no time to finish before being reported as timed out.
    pub async fn run(&self, mut targets: Vec<DrainTarget>) -> ShutdownReport {
        targets.sort_by_key(|t| t.kind.shutdown_rank());
        let deadline = Instant::now() + self.budget;
        let mut report = ShutdownReport::default();

        for target in targets {
            let kind = target.kind;
            let remaining = deadline.saturating_duration_since(Instant::now());
            let drain = Arc::clone(&target.drain);
            let task = tokio::task::spawn_blocking(move || drain.drain());

            let result = match tokio::time::timeout(remaining, task).await {
                Ok(Ok(Ok(()))) => Ok(()),
                Ok(Ok(Err(source))) => Err(ShutdownError::Drain { kind, source }),
                Ok(Err(join)) => Err(ShutdownError::Panicked {
                    kind,
                    message: join.to_string(),
                }),
                Err(_) => Err(ShutdownError::TimedOut {
                    kind,
                    budget: self.budget,
                }),
            };

            match &result {
                Ok(()) => tracing::info!(provider = %kind, "Provider shut down"),
                Err(e) => tracing::error!(provider = %kind, error = %e, "Provider shutdown failed"),
            }
            report.outcomes.push(ShutdownOutcome { kind, result });
        }

        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    struct FakeProvider {
        kind: ProviderKind,
        fail: bool,
        delay: Duration,
        calls: AtomicUsize,
        order: Arc<Mutex<Vec<ProviderKind>>>,
    }

    impl FakeProvider {
        fn new(kind: ProviderKind, fail: bool, order: &Arc<Mutex<Vec<ProviderKind>>>) -> Arc<Self> {
            Arc::new(Self {
                kind,
                fail,
                delay: Duration::ZERO,
                calls: AtomicUsize::new(0),
                order: Arc::clone(order),
            })
        }

        fn slow(kind: ProviderKind, delay: Duration, order: &Arc<Mutex<Vec<ProviderKind>>>) -> Arc<Self> {
            Arc::new(Self {
                kind,
                fail: false,
                delay,
                calls: AtomicUsize::new(0),
                order: Arc::clone(order),
            })
        }
    }

    impl Drain for FakeProvider {
        fn drain(&self) -> Result<(), DrainError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.order.lock().unwrap().push(self.kind);
            std::thread::sleep(self.delay);
            if self.fail {
                Err(DrainError::new("export endpoint unreachable"))
            } else {
                Ok(())
            }
        }
    }

    fn targets(providers: &[Arc<FakeProvider>]) -> Vec<DrainTarget> {
        providers
            .iter()
            .map(|p| DrainTarget::new(p.kind, p.clone() as Arc<dyn Drain>))
            .collect()
    }

    #[tokio::test]
    async fn drains_log_then_metric_then_trace() {
        let order = Arc::new(Mutex::new(Vec::new()));
        let providers = [
            FakeProvider::new(ProviderKind::Trace, false, &order),
            FakeProvider::new(ProviderKind::Metric, false, &order),
            FakeProvider::new(ProviderKind::Log, false, &order),
        ];

        let report = ShutdownSequencer::new(Duration::from_secs(5))
            .run(targets(&providers))
            .await;

        assert!(report.is_clean());
        assert_eq!(
            *order.lock().unwrap(),
            vec![ProviderKind::Log, ProviderKind::Metric, ProviderKind::Trace]
        );
    }

    #[tokio::test]
    async fn every_subset_of_failures_still_attempts_all() {
        let kinds = [ProviderKind::Log, ProviderKind::Metric, ProviderKind::Trace];
        for mask in 0u8..8 {
            let order = Arc::new(Mutex::new(Vec::new()));
            let providers: Vec<_> = kinds
                .iter()
                .enumerate()
                .map(|(i, kind)| FakeProvider::new(*kind, mask & (1 << i) != 0, &order))
                .collect();

            let report = ShutdownSequencer::new(Duration::from_secs(5))
                .run(targets(&providers))
                .await;

            assert_eq!(report.attempts(), providers.len());
            for provider in &providers {
                assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
            }
            assert_eq!(report.failures().count(), mask.count_ones() as usize);
        }
    }

    #[tokio::test]
    async fn missing_providers_are_skipped() {
        let order = Arc::new(Mutex::new(Vec::new()));
        let providers = [FakeProvider::new(ProviderKind::Trace, false, &order)];

        let report = ShutdownSequencer::new(Duration::from_secs(5))
            .run(targets(&providers))
            .await;

        assert_eq!(report.attempts(), 1);
        assert_eq!(report.outcomes()[0].kind, ProviderKind::Trace);
    }

    #[tokio::test]
    async fn overrun_budget_does_not_skip_remaining() {
        let order = Arc::new(Mutex::new(Vec::new()));
        let providers = [
            FakeProvider::slow(ProviderKind::Log, Duration::from_millis(300), &order),
            FakeProvider::new(ProviderKind::Metric, false, &order),
            FakeProvider::new(ProviderKind::Trace, false, &order),
        ];

        let report = ShutdownSequencer::new(Duration::from_millis(50))
            .run(targets(&providers))
            .await;

        assert_eq!(report.attempts(), 3);
        assert!(matches!(
            report.outcomes()[0].result,
            Err(ShutdownError::TimedOut { kind: ProviderKind::Log, .. })
        ));
        // Drains started after the deadline still run on the blocking pool.
        tokio::time::sleep(Duration::from_millis(400)).await;
        for provider in &providers {
            assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
        }
    }

    #[tokio::test]
    async fn multi_error_lists_every_failure() {
        let order = Arc::new(Mutex::new(Vec::new()));
        let providers = [
            FakeProvider::new(ProviderKind::Log, true, &order),
            FakeProvider::new(ProviderKind::Metric, false, &order),
            FakeProvider::new(ProviderKind::Trace, true, &order),
        ];

        let report = ShutdownSequencer::new(Duration::from_secs(5))
            .run(targets(&providers))
            .await;
        let errors = report.into_result().unwrap_err();

        assert_eq!(errors.0.len(), 2);
        let message = errors.to_string();
        assert!(message.contains("log provider failed to drain"));
        assert!(message.contains("trace provider failed to drain"));
    }
}
