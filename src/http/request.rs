//! Per-request instrumentation.
//!
//! # Responsibilities
//! - Continue the caller's trace from inbound `traceparent`/`baggage`
//! - Open the server span for the request and hand its context to the
//!   handler explicitly
//! - Log request start/completion and record request metrics
//! - Return the span's trace context in the response headers
//!
//! # Design Decisions
//! - The route template (not the raw path) names the span and labels
//!   metrics, keeping cardinality bounded
//! - The span context is also attached around the handler future so log
//!   records emitted inside it carry trace correlation to both sinks
//! - Request errors only change span status; they never touch providers

use std::future::Future;
use std::time::Instant;

use axum::{
    body::Body,
    extract::{MatchedPath, State},
    http::Request,
    middleware::Next,
    response::Response,
};
use opentelemetry::trace::{SpanKind, Status};
use opentelemetry::{Context, KeyValue};
use tracing::Instrument;

use crate::http::server::AppState;
use crate::observability::propagation::{extract_context, inject_context};

/// Header carrying the request id set by the request-id layer.
pub const X_REQUEST_ID: &str = "x-request-id";

/// Route label used when no route matched.
pub const UNMATCHED_ROUTE: &str = "unmatched";

/// The request's trace context, as seen by handlers.
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    cx: Context,
}

impl RequestContext {
    pub fn new(cx: Context) -> Self {
        Self { cx }
    }

    /// Parent context for any span the handler opens.
    pub fn context(&self) -> &Context {
        &self.cx
    }
}

/// Middleware wrapping every route in a server span.
pub async fn trace_requests(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    let start = Instant::now();
    let method = req.method().to_string();
    let path = req.uri().path().to_string();
    let route = req
        .extensions()
        .get::<MatchedPath>()
        .map(|m| m.as_str().to_string())
        .unwrap_or_else(|| UNMATCHED_ROUTE.to_string());
    let request_id = req
        .headers()
        .get(X_REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown")
        .to_string();

    let parent = extract_context(req.headers());
    let (cx, span) =
        state
            .tracer
            .start_with_kind(format!("{method} {route}"), SpanKind::Server, &parent);
    span.set_attribute(KeyValue::new("http.request.method", method.clone()));
    span.set_attribute(KeyValue::new("url.path", path.clone()));
    span.set_attribute(KeyValue::new("http.route", route.clone()));
    span.set_attribute(KeyValue::new("http.request.id", request_id.clone()));

    let log_span = tracing::info_span!(
        "request",
        trace_id = %span.trace_id(),
        span_id = %span.span_id(),
        request_id = %request_id,
        method = %method,
        route = %route,
    );

    req.extensions_mut().insert(RequestContext::new(cx.clone()));

    let handler = async {
        tracing::info!(path = %path, "request started");
        let response = next.run(req).await;
        tracing::info!(
            status = response.status().as_u16(),
            latency_ms = start.elapsed().as_millis() as u64,
            "request completed"
        );
        response
    };
    let mut response = with_attached(&cx, handler.instrument(log_span)).await;

    let status = response.status();
    span.set_attribute(KeyValue::new(
        "http.response.status_code",
        i64::from(status.as_u16()),
    ));
    if status.is_server_error() {
        span.set_status(Status::error(status.to_string()));
    }

    inject_context(&cx, response.headers_mut());
    state.metrics.record(&method, &route, status.as_u16(), start);

    response
}

/// Drive `fut` with `cx` attached as the current context on every poll.
async fn with_attached<F: Future>(cx: &Context, fut: F) -> F::Output {
    let mut fut = std::pin::pin!(fut);
    std::future::poll_fn(|task| {
        let _attached = cx.clone().attach();
        fut.as_mut().poll(task)
    })
    .await
}
