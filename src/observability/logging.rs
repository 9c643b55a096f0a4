//! Structured logging.
//!
//! # Responsibilities
//! - Duplicate every log record to two independent sinks:
//!   a local JSON stream and the OpenTelemetry log pipeline
//! - Attach timestamps and span fields (including trace correlation)
//! - Configure log level from `RUST_LOG` or config
//!
//! # Design Decisions
//! - Fanout is plain layer composition: both layers observe every event
//!   the filter lets through, exactly once each
//! - Sinks never report errors back to the caller; a failing export is
//!   the exporter's problem, never the request's
//! - Telemetry-exporter internals are filtered off the pipeline sink so
//!   exporting a record can never produce another record to export
//! - After the log provider shuts down, only the local sink still records

use opentelemetry_appender_tracing::layer::OpenTelemetryTracingBridge;
use opentelemetry_sdk::logs::SdkLoggerProvider;
use tracing::Subscriber;
use tracing_subscriber::filter::{LevelFilter, Targets};
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::layer::{Layered, SubscriberExt};
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::util::{SubscriberInitExt, TryInitError};
use tracing_subscriber::{EnvFilter, Layer};

/// Targets whose events never reach the telemetry pipeline.
pub const EXPORTER_TARGETS: &[&str] = &[
    "hyper",
    "hyper_util",
    "h2",
    "reqwest",
    "tower",
    "opentelemetry",
    "opentelemetry_sdk",
    "opentelemetry_otlp",
    "opentelemetry_http",
];

/// Error type for subscriber installation.
#[derive(Debug, thiserror::Error)]
pub enum LoggingError {
    #[error("failed to install log subscriber: {0}")]
    Install(#[from] TryInitError),
}

/// Level filter: `RUST_LOG` when set, otherwise `default_level` with
/// transport crates capped at `warn`.
pub fn env_filter(default_level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "{default_level},hyper=warn,h2=warn,reqwest=warn,tower=warn"
        ))
    })
}

/// Local machine-parseable sink: one JSON object per event.
pub fn local_sink<S, W>(writer: W) -> impl Layer<S>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    tracing_subscriber::fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(false)
        .with_target(true)
        .with_writer(writer)
}

/// Sink feeding the OpenTelemetry log provider.
pub fn telemetry_sink<S>(provider: &SdkLoggerProvider) -> impl Layer<S>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    OpenTelemetryTracingBridge::new(provider).with_filter(exporter_filter())
}

/// Everything except exporter internals.
pub fn exporter_filter() -> Targets {
    EXPORTER_TARGETS.iter().fold(
        Targets::new().with_default(LevelFilter::TRACE),
        |targets, target| targets.with_target(*target, LevelFilter::OFF),
    )
}

/// Combine two sinks so each observes every record.
pub fn fanout<S, L, T>(local: L, telemetry: T) -> Layered<T, L, S>
where
    S: Subscriber,
    L: Layer<S>,
    T: Layer<S>,
{
    local.and_then(telemetry)
}

/// Install the fanout logger as the process-wide subscriber.
pub fn install(provider: &SdkLoggerProvider, default_level: &str) -> Result<(), LoggingError> {
    tracing_subscriber::registry()
        .with(env_filter(default_level))
        .with(fanout(local_sink(std::io::stdout), telemetry_sink(provider)))
        .try_init()?;
    Ok(())
}

/// Install a local-only subscriber.
///
/// Used when the telemetry pipeline could not be built, so the fatal
/// startup error still reaches the operator.
pub fn install_local_only(default_level: &str) -> Result<(), LoggingError> {
    tracing_subscriber::registry()
        .with(env_filter(default_level))
        .with(local_sink(std::io::stdout))
        .try_init()?;
    Ok(())
}
