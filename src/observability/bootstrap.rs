//! Telemetry bootstrap.
//!
//! # Responsibilities
//! - Build the trace, metric and log providers, in that order
//! - Install the propagator, the providers and the fanout logger as
//!   process-wide defaults
//!
//! # Design Decisions
//! - Fail fast: the first exporter that cannot be built aborts bootstrap
//!   and later providers are never attempted
//! - Providers built before a failure are dropped, which shuts them down;
//!   nothing partially bootstrapped keeps running
//! - `init` is single-shot per process. `build_providers` is pure and can
//!   be called any number of times, each call yielding an independent set
//! - Sampling is always on

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use opentelemetry::global;
use opentelemetry_otlp::{LogExporter, MetricExporter, SpanExporter, WithExportConfig};
use opentelemetry_sdk::logs::SdkLoggerProvider;
use opentelemetry_sdk::metrics::SdkMeterProvider;
use opentelemetry_sdk::trace::{Sampler, SdkTracerProvider};
use opentelemetry_sdk::Resource;

use crate::config::TelemetryConfig;
use crate::observability::logging::{self, LoggingError};
use crate::observability::propagation::install_propagator;
use crate::observability::providers::{ProviderKind, ProviderSet};
use crate::observability::resource::ResourceDescriptor;

static INITIALIZED: AtomicBool = AtomicBool::new(false);

/// Error type for telemetry bootstrap.
#[derive(Debug, thiserror::Error)]
pub enum BootstrapError {
    #[error("telemetry is already initialized in this process")]
    AlreadyInitialized,

    #[error("failed to build {signal} exporter: {source}")]
    Exporter {
        signal: ProviderKind,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error(transparent)]
    Logging(#[from] LoggingError),
}

impl BootstrapError {
    pub fn exporter(
        signal: ProviderKind,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        Self::Exporter {
            signal,
            source: source.into(),
        }
    }

    /// The signal whose exporter failed, if that is what happened.
    pub fn signal(&self) -> Option<ProviderKind> {
        match self {
            Self::Exporter { signal, .. } => Some(*signal),
            _ => None,
        }
    }
}

/// Builds one provider per signal.
///
/// The seam between bootstrap policy (order, fail-fast, installation) and
/// how exporters are actually constructed.
pub trait PipelineFactory {
    fn tracer_provider(&self, resource: &Resource) -> Result<SdkTracerProvider, BootstrapError>;
    fn meter_provider(&self, resource: &Resource) -> Result<SdkMeterProvider, BootstrapError>;
    fn logger_provider(&self, resource: &Resource) -> Result<SdkLoggerProvider, BootstrapError>;
}

/// Batching OTLP/HTTP exporters pointed at a collector.
#[derive(Debug, Clone)]
pub struct OtlpHttpPipelines {
    base_endpoint: Option<String>,
    traces_endpoint: Option<String>,
    metrics_endpoint: Option<String>,
    logs_endpoint: Option<String>,
    timeout: Duration,
}

impl OtlpHttpPipelines {
    pub fn from_config(config: &TelemetryConfig) -> Self {
        Self {
            base_endpoint: config.otlp_endpoint.clone(),
            traces_endpoint: config.traces_endpoint.clone(),
            metrics_endpoint: config.metrics_endpoint.clone(),
            logs_endpoint: config.logs_endpoint.clone(),
            timeout: config.export_timeout(),
        }
    }

    /// Endpoint for `kind`, or `None` to let the exporter read the
    /// standard OTLP environment variables itself.
    ///
    /// Signal-specific endpoints are used verbatim; a base endpoint gets
    /// the signal path appended.
    pub fn endpoint(&self, kind: ProviderKind) -> Option<String> {
        let specific = match kind {
            ProviderKind::Trace => &self.traces_endpoint,
            ProviderKind::Metric => &self.metrics_endpoint,
            ProviderKind::Log => &self.logs_endpoint,
        };
        if let Some(endpoint) = specific {
            return Some(endpoint.clone());
        }
        self.base_endpoint
            .as_deref()
            .map(|base| format!("{}{}", base.trim_end_matches('/'), kind.otlp_path()))
    }
}

impl PipelineFactory for OtlpHttpPipelines {
    fn tracer_provider(&self, resource: &Resource) -> Result<SdkTracerProvider, BootstrapError> {
        let mut builder = SpanExporter::builder()
            .with_http()
            .with_timeout(self.timeout);
        if let Some(endpoint) = self.endpoint(ProviderKind::Trace) {
            builder = builder.with_endpoint(endpoint);
        }
        let exporter = builder
            .build()
            .map_err(|e| BootstrapError::exporter(ProviderKind::Trace, e))?;

        Ok(SdkTracerProvider::builder()
            .with_batch_exporter(exporter)
            .with_sampler(Sampler::AlwaysOn)
            .with_resource(resource.clone())
            .build())
    }

    fn meter_provider(&self, resource: &Resource) -> Result<SdkMeterProvider, BootstrapError> {
        let mut builder = MetricExporter::builder()
            .with_http()
            .with_timeout(self.timeout);
        if let Some(endpoint) = self.endpoint(ProviderKind::Metric) {
            builder = builder.with_endpoint(endpoint);
        }
        let exporter = builder
            .build()
            .map_err(|e| BootstrapError::exporter(ProviderKind::Metric, e))?;

        Ok(SdkMeterProvider::builder()
            .with_periodic_exporter(exporter)
            .with_resource(resource.clone())
            .build())
    }

    fn logger_provider(&self, resource: &Resource) -> Result<SdkLoggerProvider, BootstrapError> {
        let mut builder = LogExporter::builder()
            .with_http()
            .with_timeout(self.timeout);
        if let Some(endpoint) = self.endpoint(ProviderKind::Log) {
            builder = builder.with_endpoint(endpoint);
        }
        let exporter = builder
            .build()
            .map_err(|e| BootstrapError::exporter(ProviderKind::Log, e))?;

        Ok(SdkLoggerProvider::builder()
            .with_batch_exporter(exporter)
            .with_resource(resource.clone())
            .build())
    }
}

/// Build the three providers in order trace → metric → log.
pub fn build_providers(
    descriptor: &ResourceDescriptor,
    factory: &dyn PipelineFactory,
) -> Result<ProviderSet, BootstrapError> {
    let resource = descriptor.to_resource();

    let tracer = factory.tracer_provider(&resource)?;
    let meter = factory.meter_provider(&resource)?;
    let logger = factory.logger_provider(&resource)?;

    Ok(ProviderSet::new(tracer, meter, logger))
}

/// Bootstrap telemetry for this process.
///
/// Installs the propagator, builds the providers, registers the trace and
/// metric providers globally and installs the fanout logger on top of the
/// log provider. Only the first call in a process does anything; later
/// calls return [`BootstrapError::AlreadyInitialized`].
pub fn init(
    descriptor: &ResourceDescriptor,
    factory: &dyn PipelineFactory,
    log_level: &str,
) -> Result<ProviderSet, BootstrapError> {
    if INITIALIZED.swap(true, Ordering::SeqCst) {
        return Err(BootstrapError::AlreadyInitialized);
    }

    install_propagator();
    let providers = build_providers(descriptor, factory)?;

    global::set_tracer_provider(providers.tracer_provider().clone());
    global::set_meter_provider(providers.meter_provider().clone());
    logging::install(providers.logger_provider(), log_level)?;

    tracing::info!(
        service = %descriptor.service_name(),
        environment = %descriptor.environment(),
        version = %descriptor.version(),
        "Telemetry initialized"
    );

    Ok(providers)
}
