//! Span creation with explicit context passing.
//!
//! # Responsibilities
//! - Open child spans under a caller-supplied parent context
//! - Guarantee every span is closed when its owning scope exits
//!
//! # Design Decisions
//! - No ambient "current span": callers pass the parent `Context` explicitly
//! - `SpanGuard` ends the span on drop, so error returns and unwinding
//!   close it exactly like a normal return
//! - `SpanGuard::end` consumes the guard; attributes cannot be set through
//!   it afterwards. Writes through a cloned `Context` after end are ignored
//!   by the SDK.

use std::borrow::Cow;
use std::sync::Arc;

use opentelemetry::global::{self, BoxedTracer};
use opentelemetry::trace::{
    SpanId, SpanKind, Status, TraceContextExt, TraceId, Tracer, TracerProvider,
};
use opentelemetry::{Context, InstrumentationScope, KeyValue};
use opentelemetry_sdk::trace::SdkTracerProvider;

/// Instrumentation scope name used for every span this service opens.
pub const TRACER_NAME: &str = "notes";

/// Opens spans as children of an explicit parent context.
#[derive(Clone)]
pub struct SpanTracer {
    tracer: Arc<BoxedTracer>,
}

impl std::fmt::Debug for SpanTracer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpanTracer").finish_non_exhaustive()
    }
}

impl SpanTracer {
    /// Tracer backed by whatever provider is installed globally.
    pub fn global() -> Self {
        let scope = InstrumentationScope::builder(TRACER_NAME)
            .with_version(env!("CARGO_PKG_VERSION"))
            .build();
        Self {
            tracer: Arc::new(global::tracer_with_scope(scope)),
        }
    }

    /// Tracer bound to a specific provider, bypassing the global one.
    pub fn from_provider(provider: &SdkTracerProvider) -> Self {
        let tracer = provider.tracer(TRACER_NAME);
        Self {
            tracer: Arc::new(BoxedTracer::new(Box::new(tracer))),
        }
    }

    /// Start an internal span under `parent`.
    ///
    /// Returns the child context (which carries the new span as current)
    /// and the guard owning the span.
    pub fn start(
        &self,
        name: impl Into<Cow<'static, str>>,
        parent: &Context,
    ) -> (Context, SpanGuard) {
        self.start_with_kind(name, SpanKind::Internal, parent)
    }

    /// Start a span of the given kind under `parent`.
    pub fn start_with_kind(
        &self,
        name: impl Into<Cow<'static, str>>,
        kind: SpanKind,
        parent: &Context,
    ) -> (Context, SpanGuard) {
        let span = self
            .tracer
            .span_builder(name)
            .with_kind(kind)
            .start_with_context(self.tracer.as_ref(), parent);
        let cx = parent.with_span(span);
        (cx.clone(), SpanGuard { cx, ended: false })
    }
}

/// Exclusive owner of an open span. Ends the span when dropped.
#[must_use = "dropping the guard ends the span immediately"]
pub struct SpanGuard {
    cx: Context,
    ended: bool,
}

impl std::fmt::Debug for SpanGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpanGuard")
            .field("trace_id", &self.trace_id())
            .field("span_id", &self.span_id())
            .field("ended", &self.ended)
            .finish()
    }
}

impl SpanGuard {
    /// Context carrying this span as current.
    pub fn context(&self) -> &Context {
        &self.cx
    }

    pub fn trace_id(&self) -> TraceId {
        self.cx.span().span_context().trace_id()
    }

    pub fn span_id(&self) -> SpanId {
        self.cx.span().span_context().span_id()
    }

    pub fn set_attribute(&self, attribute: KeyValue) {
        self.cx.span().set_attribute(attribute);
    }

    /// Record `err` as an exception event and mark the span failed.
    pub fn record_error(&self, err: &dyn std::error::Error) {
        let span = self.cx.span();
        span.record_error(err);
        span.set_status(Status::error(err.to_string()));
    }

    pub fn set_status(&self, status: Status) {
        self.cx.span().set_status(status);
    }

    /// Close the span now instead of at scope exit.
    pub fn end(mut self) {
        self.finish();
    }

    fn finish(&mut self) {
        if !self.ended {
            self.ended = true;
            self.cx.span().end();
        }
    }
}

impl Drop for SpanGuard {
    fn drop(&mut self) {
        self.finish();
    }
}
