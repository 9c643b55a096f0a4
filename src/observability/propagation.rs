//! Cross-process context propagation.
//!
//! # Responsibilities
//! - Build the composite propagator (W3C trace-context + baggage)
//! - Extract a parent context from inbound HTTP headers
//! - Inject the current context into outbound HTTP headers
//!
//! # Design Decisions
//! - The propagator is stateless; installing it globally is the only side effect
//! - Extraction never fails: missing or malformed headers yield an empty context

use axum::http::{HeaderMap, HeaderName, HeaderValue};
use opentelemetry::propagation::{
    Extractor, Injector, TextMapCompositePropagator, TextMapPropagator,
};
use opentelemetry::{global, Context};
use opentelemetry_sdk::propagation::{BaggagePropagator, TraceContextPropagator};

/// Trace-context followed by baggage.
pub fn composite_propagator() -> TextMapCompositePropagator {
    TextMapCompositePropagator::new(vec![
        Box::new(TraceContextPropagator::new()),
        Box::new(BaggagePropagator::new()),
    ])
}

/// Install the composite propagator as the process-wide default.
pub fn install_propagator() {
    global::set_text_map_propagator(composite_propagator());
}

/// Read-only view over request headers.
pub struct HeaderExtractor<'a>(pub &'a HeaderMap);

impl<'a> Extractor for HeaderExtractor<'a> {
    fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(|v| v.to_str().ok())
    }

    fn keys(&self) -> Vec<&str> {
        self.0.keys().map(|k| k.as_str()).collect()
    }
}

/// Mutable view over response or outbound request headers.
pub struct HeaderInjector<'a>(pub &'a mut HeaderMap);

impl<'a> Injector for HeaderInjector<'a> {
    fn set(&mut self, key: &str, value: String) {
        let Ok(name) = HeaderName::from_bytes(key.as_bytes()) else {
            return;
        };
        if let Ok(value) = HeaderValue::from_str(&value) {
            self.0.insert(name, value);
        }
    }
}

/// Extract the remote parent context using the global propagator.
pub fn extract_context(headers: &HeaderMap) -> Context {
    global::get_text_map_propagator(|prop| prop.extract(&HeaderExtractor(headers)))
}

/// Inject `cx` into `headers` using the global propagator.
pub fn inject_context(cx: &Context, headers: &mut HeaderMap) {
    global::get_text_map_propagator(|prop| {
        prop.inject_context(cx, &mut HeaderInjector(headers))
    });
}
