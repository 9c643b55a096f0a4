//! Owned handles for the three telemetry pipelines.

use std::fmt;
use std::sync::Arc;

use opentelemetry_sdk::logs::SdkLoggerProvider;
use opentelemetry_sdk::metrics::SdkMeterProvider;
use opentelemetry_sdk::trace::SdkTracerProvider;

use crate::lifecycle::shutdown::{Drain, DrainError, DrainTarget};

/// Telemetry signal a provider exports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderKind {
    Trace,
    Metric,
    Log,
}

impl ProviderKind {
    /// Construction order: trace, metric, log.
    pub const CONSTRUCTION_ORDER: [ProviderKind; 3] =
        [ProviderKind::Trace, ProviderKind::Metric, ProviderKind::Log];

    /// Position in the shutdown sequence: log, metric, trace.
    pub fn shutdown_rank(self) -> u8 {
        match self {
            ProviderKind::Log => 0,
            ProviderKind::Metric => 1,
            ProviderKind::Trace => 2,
        }
    }

    /// OTLP/HTTP path appended to a base collector endpoint.
    pub fn otlp_path(self) -> &'static str {
        match self {
            ProviderKind::Trace => "/v1/traces",
            ProviderKind::Metric => "/v1/metrics",
            ProviderKind::Log => "/v1/logs",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ProviderKind::Trace => "trace",
            ProviderKind::Metric => "metric",
            ProviderKind::Log => "log",
        };
        f.write_str(name)
    }
}

impl Drain for SdkTracerProvider {
    fn drain(&self) -> Result<(), DrainError> {
        self.shutdown().map_err(|e| DrainError::new(e.to_string()))
    }
}

impl Drain for SdkMeterProvider {
    fn drain(&self) -> Result<(), DrainError> {
        self.shutdown().map_err(|e| DrainError::new(e.to_string()))
    }
}

impl Drain for SdkLoggerProvider {
    fn drain(&self) -> Result<(), DrainError> {
        self.shutdown().map_err(|e| DrainError::new(e.to_string()))
    }
}

/// The three active providers of one successful bootstrap.
///
/// Dropping the set without draining it still shuts each provider down
/// through the SDK's own drop handling; draining through
/// [`ProviderSet::drain_targets`] is what gives ordering and a budget.
#[derive(Clone)]
pub struct ProviderSet {
    tracer: SdkTracerProvider,
    meter: SdkMeterProvider,
    logger: SdkLoggerProvider,
}

impl fmt::Debug for ProviderSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderSet").finish_non_exhaustive()
    }
}

impl ProviderSet {
    pub fn new(
        tracer: SdkTracerProvider,
        meter: SdkMeterProvider,
        logger: SdkLoggerProvider,
    ) -> Self {
        Self {
            tracer,
            meter,
            logger,
        }
    }

    pub fn tracer_provider(&self) -> &SdkTracerProvider {
        &self.tracer
    }

    pub fn meter_provider(&self) -> &SdkMeterProvider {
        &self.meter
    }

    pub fn logger_provider(&self) -> &SdkLoggerProvider {
        &self.logger
    }

    /// Every provider as a shutdown target, in shutdown order.
    pub fn drain_targets(&self) -> Vec<DrainTarget> {
        vec![
            DrainTarget::new(ProviderKind::Log, Arc::new(self.logger.clone())),
            DrainTarget::new(ProviderKind::Metric, Arc::new(self.meter.clone())),
            DrainTarget::new(ProviderKind::Trace, Arc::new(self.tracer.clone())),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shutdown_rank_puts_log_first() {
        let mut kinds = ProviderKind::CONSTRUCTION_ORDER;
        kinds.sort_by_key(|k| k.shutdown_rank());
        assert_eq!(
            kinds,
            [ProviderKind::Log, ProviderKind::Metric, ProviderKind::Trace]
        );
    }

    #[test]
    fn drain_targets_cover_every_provider_once() {
        let set = ProviderSet::new(
            SdkTracerProvider::builder().build(),
            SdkMeterProvider::builder().build(),
            SdkLoggerProvider::builder().build(),
        );
        let kinds: Vec<_> = set.drain_targets().iter().map(|t| t.kind()).collect();
        assert_eq!(
            kinds,
            vec![ProviderKind::Log, ProviderKind::Metric, ProviderKind::Trace]
        );
    }

    #[test]
    fn second_drain_reports_error() {
        let provider = SdkTracerProvider::builder().build();
        assert!(provider.drain().is_ok());
        assert!(provider.drain().is_err());
    }
}
