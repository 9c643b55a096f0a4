//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::io;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use opentelemetry::metrics::MeterProvider;
use opentelemetry_sdk::logs::{InMemoryLogExporter, SdkLoggerProvider};
use opentelemetry_sdk::metrics::{InMemoryMetricExporter, PeriodicReader, SdkMeterProvider};
use opentelemetry_sdk::trace::{InMemorySpanExporter, SdkTracerProvider, SpanData};
use opentelemetry_sdk::Resource;
use tokio::net::TcpListener;

use notes_service::config::{load_config_from, AppConfig};
use notes_service::http::{build_router, AppState};
use notes_service::notes::InMemoryNoteStore;
use notes_service::observability::metrics::{RequestMetrics, METER_NAME};
use notes_service::observability::{
    BootstrapError, PipelineFactory, ProviderKind, ProviderSet, SpanTracer,
};

/// Parse a config from flags, as the binary would.
pub fn test_config(flags: &[&str]) -> AppConfig {
    let args = std::iter::once("notes-service").chain(flags.iter().copied());
    load_config_from(args).expect("test config must be valid")
}

/// Providers wired to in-memory exporters.
pub struct TestTelemetry {
    pub providers: ProviderSet,
    pub spans: InMemorySpanExporter,
    pub metrics: InMemoryMetricExporter,
    pub logs: InMemoryLogExporter,
}

impl TestTelemetry {
    pub fn new() -> Self {
        let spans = InMemorySpanExporter::default();
        let metrics = InMemoryMetricExporter::default();
        let logs = InMemoryLogExporter::default();

        let providers = ProviderSet::new(
            SdkTracerProvider::builder()
                .with_simple_exporter(spans.clone())
                .build(),
            SdkMeterProvider::builder()
                .with_reader(PeriodicReader::builder(metrics.clone()).build())
                .build(),
            SdkLoggerProvider::builder()
                .with_simple_exporter(logs.clone())
                .build(),
        );

        Self {
            providers,
            spans,
            metrics,
            logs,
        }
    }

    /// Handler state whose spans and metrics land in this telemetry.
    pub fn state(&self, ping_delay: Duration) -> AppState {
        let tracer = SpanTracer::from_provider(self.providers.tracer_provider());
        AppState {
            store: Arc::new(InMemoryNoteStore::new(tracer.clone())),
            tracer,
            metrics: RequestMetrics::new(&self.providers.meter_provider().meter(METER_NAME)),
            version: "test".to_string(),
            ping_delay,
        }
    }

    pub fn finished_spans(&self) -> Vec<SpanData> {
        self.spans.get_finished_spans().unwrap()
    }

    pub fn span(&self, name: &str) -> SpanData {
        self.finished_spans()
            .into_iter()
            .find(|s| s.name == name)
            .unwrap_or_else(|| panic!("span {name} was not exported"))
    }
}

/// Writer collecting the local JSON log stream.
#[derive(Clone, Default)]
pub struct LogBuffer(Arc<Mutex<Vec<u8>>>);

impl LogBuffer {
    /// Every JSON line written so far.
    pub fn records(&self) -> Vec<serde_json::Value> {
        let bytes = self.0.lock().unwrap().clone();
        String::from_utf8(bytes)
            .unwrap()
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect()
    }
}

impl io::Write for LogBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> tracing_subscriber::fmt::MakeWriter<'a> for LogBuffer {
    type Writer = LogBuffer;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

/// Serve the router for `state` on an ephemeral local port.
pub async fn spawn_server(state: AppState) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let router = build_router(state, Duration::from_secs(5));
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    addr
}

/// Factory building exporter-less providers, recording each attempt.
#[derive(Default)]
pub struct RecordingFactory {
    fail_on: Option<ProviderKind>,
    calls: Mutex<Vec<ProviderKind>>,
}

impl RecordingFactory {
    pub fn failing_on(kind: ProviderKind) -> Self {
        Self {
            fail_on: Some(kind),
            ..Default::default()
        }
    }

    pub fn calls(&self) -> Vec<ProviderKind> {
        self.calls.lock().unwrap().clone()
    }

    fn enter(&self, kind: ProviderKind) -> Result<(), BootstrapError> {
        self.calls.lock().unwrap().push(kind);
        match self.fail_on {
            Some(failing) if failing == kind => {
                Err(BootstrapError::exporter(kind, "exporter rejected"))
            }
            _ => Ok(()),
        }
    }
}

impl PipelineFactory for RecordingFactory {
    fn tracer_provider(&self, resource: &Resource) -> Result<SdkTracerProvider, BootstrapError> {
        self.enter(ProviderKind::Trace)?;
        Ok(SdkTracerProvider::builder()
            .with_simple_exporter(InMemorySpanExporter::default())
            .with_resource(resource.clone())
            .build())
    }

    fn meter_provider(&self, resource: &Resource) -> Result<SdkMeterProvider, BootstrapError> {
        self.enter(ProviderKind::Metric)?;
        Ok(SdkMeterProvider::builder()
            .with_reader(PeriodicReader::builder(InMemoryMetricExporter::default()).build())
            .with_resource(resource.clone())
            .build())
    }

    fn logger_provider(&self, resource: &Resource) -> Result<SdkLoggerProvider, BootstrapError> {
        self.enter(ProviderKind::Log)?;
        Ok(SdkLoggerProvider::builder()
            .with_simple_exporter(InMemoryLogExporter::default())
            .with_resource(resource.clone())
            .build())
    }
}

/// Forwards to another factory, recording which providers were attempted.
pub struct Recording<F> {
    inner: F,
    calls: Mutex<Vec<ProviderKind>>,
}

impl<F: PipelineFactory> Recording<F> {
    pub fn new(inner: F) -> Self {
        Self {
            inner,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<ProviderKind> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, kind: ProviderKind) {
        self.calls.lock().unwrap().push(kind);
    }
}

impl<F: PipelineFactory> PipelineFactory for Recording<F> {
    fn tracer_provider(&self, resource: &Resource) -> Result<SdkTracerProvider, BootstrapError> {
        self.record(ProviderKind::Trace);
        self.inner.tracer_provider(resource)
    }

    fn meter_provider(&self, resource: &Resource) -> Result<SdkMeterProvider, BootstrapError> {
        self.record(ProviderKind::Metric);
        self.inner.meter_provider(resource)
    }

    fn logger_provider(&self, resource: &Resource) -> Result<SdkLoggerProvider, BootstrapError> {
        self.record(ProviderKind::Log);
        self.inner.logger_provider(resource)
    }
}
