//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! .env file (only when ENVIRONMENT is empty or "dev")
//!     → loader.rs (dotenv into process env)
//!     → schema.rs (clap: flags, falling back to env vars)
//!     → validation.rs (semantic checks)
//!     → AppConfig (validated, immutable)
//!     → handed to startup, never mutated afterwards
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; there is no reload
//! - All fields have defaults to allow an empty environment
//! - Collector endpoints left unset are read by the exporter itself

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, load_config_from, load_dotenv, ConfigError};
pub use schema::{AppConfig, DatabaseConfig, TelemetryConfig};
pub use validation::{validate_config, ValidationError};
