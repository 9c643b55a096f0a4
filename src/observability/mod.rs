//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! ResourceDescriptor (resource.rs)
//!     → bootstrap.rs (trace → metric → log providers, propagator)
//!     → ProviderSet (providers.rs), owned by the caller
//!
//! Every request path uses:
//!     → tracer.rs (child spans under an explicit parent context)
//!     → logging.rs (fanout: local JSON stream + OTel log pipeline)
//!     → metrics.rs (request counters/histograms, runtime gauges)
//!     → propagation.rs (W3C trace-context + baggage headers)
//!
//! Consumers:
//!     → stdout (JSON lines)
//!     → OTLP/HTTP collector (traces, metrics, logs)
//! ```
//!
//! # Design Decisions
//! - Providers are an explicit value returned from bootstrap, not hidden
//!   globals; the globals are installed as a convenience for libraries
//! - Span parents are always passed explicitly

pub mod bootstrap;
pub mod logging;
pub mod metrics;
pub mod propagation;
pub mod providers;
pub mod resource;
pub mod tracer;

pub use bootstrap::{build_providers, init, BootstrapError, OtlpHttpPipelines, PipelineFactory};
pub use providers::{ProviderKind, ProviderSet};
pub use resource::ResourceDescriptor;
pub use tracer::{SpanGuard, SpanTracer};
