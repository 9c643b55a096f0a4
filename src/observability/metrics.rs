//! Metrics collection.
//!
//! # Responsibilities
//! - Define request metrics (count, latency) recorded per request
//! - Register runtime gauges read from the tokio runtime
//!
//! # Metrics
//! - `http.server.requests` (counter): total requests by method, route, status
//! - `http.server.request.duration` (histogram, seconds): latency distribution
//! - `runtime.tokio.workers` (gauge): runtime worker threads
//! - `runtime.tokio.alive_tasks` (gauge): tasks currently alive
//!
//! # Design Decisions
//! - Instruments come from an explicit `Meter`, normally the global one
//! - Labels for method, route template and status code only

use std::time::Instant;

use opentelemetry::metrics::{Counter, Histogram, Meter, ObservableGauge};
use opentelemetry::{global, KeyValue};
use tokio::runtime::Handle;

/// Meter name shared by all instruments of this service.
pub const METER_NAME: &str = "notes";

/// Per-request instruments.
#[derive(Clone)]
pub struct RequestMetrics {
    requests: Counter<u64>,
    duration: Histogram<f64>,
}

impl std::fmt::Debug for RequestMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestMetrics").finish_non_exhaustive()
    }
}

impl RequestMetrics {
    /// Instruments on the globally installed meter provider.
    pub fn global() -> Self {
        Self::new(&global::meter(METER_NAME))
    }

    pub fn new(meter: &Meter) -> Self {
        let requests = meter
            .u64_counter("http.server.requests")
            .with_description("Total HTTP requests handled")
            .build();
        let duration = meter
            .f64_histogram("http.server.request.duration")
            .with_description("HTTP request latency")
            .with_unit("s")
            .build();
        Self { requests, duration }
    }

    /// Record one finished request.
    pub fn record(&self, method: &str, route: &str, status: u16, start: Instant) {
        let attributes = [
            KeyValue::new("http.request.method", method.to_string()),
            KeyValue::new("http.route", route.to_string()),
            KeyValue::new("http.response.status_code", i64::from(status)),
        ];
        self.requests.add(1, &attributes);
        self.duration
            .record(start.elapsed().as_secs_f64(), &attributes);
    }
}

/// Runtime gauges. Keep alive for as long as the gauges should report.
pub struct RuntimeMetrics {
    _workers: ObservableGauge<u64>,
    _alive_tasks: ObservableGauge<u64>,
}

impl std::fmt::Debug for RuntimeMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RuntimeMetrics").finish_non_exhaustive()
    }
}

impl RuntimeMetrics {
    /// Register gauges reading from `handle` on `meter`.
    pub fn register(meter: &Meter, handle: Handle) -> Self {
        let workers_handle = handle.clone();
        let workers = meter
            .u64_observable_gauge("runtime.tokio.workers")
            .with_description("Number of runtime worker threads")
            .with_callback(move |observer| {
                observer.observe(workers_handle.metrics().num_workers() as u64, &[]);
            })
            .build();

        let alive_tasks = meter
            .u64_observable_gauge("runtime.tokio.alive_tasks")
            .with_description("Number of alive tasks in the runtime")
            .with_callback(move |observer| {
                observer.observe(handle.metrics().num_alive_tasks() as u64, &[]);
            })
            .build();

        Self {
            _workers: workers,
            _alive_tasks: alive_tasks,
        }
    }
}
