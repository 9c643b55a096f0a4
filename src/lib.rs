//! Notes HTTP service with OpenTelemetry tracing, metrics and logging.

pub mod config;
pub mod http;
pub mod lifecycle;
pub mod notes;
pub mod observability;

pub use config::AppConfig;
pub use http::HttpServer;
pub use lifecycle::{RunController, RunOutcome, ShutdownSequencer};
pub use observability::{ProviderSet, ResourceDescriptor};
