//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, request id, timeout)
//!     → request.rs (extract remote parent, open server span)
//!     → handlers.rs (child spans under the request context)
//!     → notes store (child spans under the handler's context)
//!     → response.rs (errors rendered as JSON)
//!     → Send to client, trace context in response headers
//! ```

pub mod handlers;
pub mod request;
pub mod response;
pub mod server;

pub use request::{RequestContext, X_REQUEST_ID};
pub use response::ApiError;
pub use server::{build_router, AppState, HttpServer};
