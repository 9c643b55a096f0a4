//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum router with all handlers
//! - Wire up middleware (request spans, request ids, timeout)
//! - Bind the listener and serve until it fails
//!
//! # Design Decisions
//! - No graceful drain: the run controller abandons the server on
//!   cancellation and process exit closes the socket
//! - Serving ending for any reason is reported to the caller as a
//!   listener failure

use std::sync::Arc;
use std::time::Duration;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
};

use crate::config::AppConfig;
use crate::http::handlers;
use crate::http::request::trace_requests;
use crate::lifecycle::ListenerError;
use crate::notes::NoteStore;
use crate::observability::metrics::RequestMetrics;
use crate::observability::SpanTracer;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn NoteStore>,
    pub tracer: SpanTracer,
    pub metrics: RequestMetrics,
    pub version: String,
    pub ping_delay: Duration,
}

impl AppState {
    /// State using the globally installed tracer and meter providers.
    pub fn new(store: Arc<dyn NoteStore>, config: &AppConfig) -> Self {
        Self {
            store,
            tracer: SpanTracer::global(),
            metrics: RequestMetrics::global(),
            version: config.version.clone(),
            ping_delay: config.ping_delay(),
        }
    }
}

/// HTTP server for the notes API.
pub struct HttpServer {
    router: Router,
    bind_address: String,
}

impl HttpServer {
    pub fn new(config: &AppConfig, state: AppState) -> Self {
        Self {
            router: build_router(state, config.request_timeout()),
            bind_address: config.bind_address(),
        }
    }

    pub fn bind_address(&self) -> &str {
        &self.bind_address
    }

    /// Bind the configured address and serve.
    pub async fn run(self) -> Result<(), ListenerError> {
        let listener = TcpListener::bind(&self.bind_address)
            .await
            .map_err(|source| ListenerError::Bind {
                address: self.bind_address.clone(),
                source,
            })?;
        self.serve(listener).await
    }

    /// Serve on an already bound listener.
    pub async fn serve(self, listener: TcpListener) -> Result<(), ListenerError> {
        let addr = listener.local_addr().map_err(ListenerError::Serve)?;
        tracing::info!(address = %addr, "HTTP server starting");

        axum::serve(listener, self.router)
            .await
            .map_err(ListenerError::Serve)?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Build the router with all middleware layers.
#[allow(deprecated)]
pub fn build_router(state: AppState, request_timeout: Duration) -> Router {
    Router::new()
        .route("/ping", get(handlers::ping))
        .route("/", post(handlers::create_note).get(handlers::list_notes))
        .route("/{id}", get(handlers::get_note))
        // Inside the request span so timed-out requests are still logged
        // and measured.
        .layer(TimeoutLayer::new(request_timeout))
        .layer(middleware::from_fn_with_state(state.clone(), trace_requests))
        .with_state(state)
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                .layer(PropagateRequestIdLayer::x_request_id()),
        )
}
