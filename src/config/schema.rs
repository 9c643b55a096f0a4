//! Configuration schema definitions.
//!
//! Every option is both a command-line flag and an environment variable,
//! so a container can be configured purely through its environment.

use std::time::Duration;

use clap::{Args, Parser};

/// Root configuration for the notes service.
#[derive(Debug, Clone, Parser)]
#[command(name = "notes-service", version, about = "Note-taking HTTP service")]
pub struct AppConfig {
    /// Listener port.
    #[arg(long, env = "APP_PORT", default_value_t = 80)]
    pub port: u16,

    /// Deployment environment. Empty or `dev` enables `.env` loading.
    #[arg(long, env = "ENVIRONMENT", default_value = "")]
    pub environment: String,

    /// Service name reported on every telemetry signal.
    #[arg(long, env = "SERVICE_NAME", default_value = "notes")]
    pub service_name: String,

    /// Service version reported on every telemetry signal.
    #[arg(id = "app_version", long = "app-version", env = "APP_VERSION", default_value = "1.0.0")]
    pub version: String,

    /// Per-request timeout in seconds.
    #[arg(long, env = "REQUEST_TIMEOUT_SECS", default_value_t = 30)]
    pub request_timeout_secs: u64,

    /// Artificial delay of the `/ping` wait step, in milliseconds.
    #[arg(long, env = "PING_DELAY_MS", default_value_t = 0)]
    pub ping_delay_ms: u64,

    /// Telemetry settings.
    #[command(flatten)]
    pub telemetry: TelemetryConfig,

    /// Database settings for the SQL persistence collaborator.
    #[command(flatten)]
    pub database: DatabaseConfig,
}

impl AppConfig {
    /// Address the HTTP listener binds to.
    pub fn bind_address(&self) -> String {
        format!("0.0.0.0:{}", self.port)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn ping_delay(&self) -> Duration {
        Duration::from_millis(self.ping_delay_ms)
    }

    /// Whether a local `.env` file should be loaded for this environment.
    pub fn loads_dotenv(environment: &str) -> bool {
        environment.is_empty() || environment == "dev"
    }
}

/// Collector endpoints, export budgets and log level.
#[derive(Debug, Clone, Args)]
pub struct TelemetryConfig {
    /// Log level used when `RUST_LOG` is not set.
    #[arg(long, env = "LOG_LEVEL", default_value = "debug")]
    pub log_level: String,

    /// Base OTLP/HTTP collector endpoint (e.g. "http://localhost:4318").
    #[arg(long, env = "OTEL_EXPORTER_OTLP_ENDPOINT")]
    pub otlp_endpoint: Option<String>,

    /// Trace endpoint, used verbatim.
    #[arg(long, env = "OTEL_EXPORTER_OTLP_TRACES_ENDPOINT")]
    pub traces_endpoint: Option<String>,

    /// Metric endpoint, used verbatim.
    #[arg(long, env = "OTEL_EXPORTER_OTLP_METRICS_ENDPOINT")]
    pub metrics_endpoint: Option<String>,

    /// Log endpoint, used verbatim.
    #[arg(long, env = "OTEL_EXPORTER_OTLP_LOGS_ENDPOINT")]
    pub logs_endpoint: Option<String>,

    /// Timeout of a single export request, in seconds.
    #[arg(long, env = "OTEL_EXPORT_TIMEOUT_SECS", default_value_t = 10)]
    pub export_timeout_secs: u64,

    /// Overall budget for draining all providers at exit, in seconds.
    #[arg(long, env = "SHUTDOWN_TIMEOUT_SECS", default_value_t = 10)]
    pub shutdown_timeout_secs: u64,
}

impl TelemetryConfig {
    pub fn export_timeout(&self) -> Duration {
        Duration::from_secs(self.export_timeout_secs)
    }

    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.shutdown_timeout_secs)
    }

    /// Every endpoint that was explicitly configured, with its option name.
    pub fn configured_endpoints(&self) -> Vec<(&'static str, &str)> {
        [
            ("OTEL_EXPORTER_OTLP_ENDPOINT", &self.otlp_endpoint),
            ("OTEL_EXPORTER_OTLP_TRACES_ENDPOINT", &self.traces_endpoint),
            ("OTEL_EXPORTER_OTLP_METRICS_ENDPOINT", &self.metrics_endpoint),
            ("OTEL_EXPORTER_OTLP_LOGS_ENDPOINT", &self.logs_endpoint),
        ]
        .into_iter()
        .filter_map(|(name, value)| value.as_deref().map(|v| (name, v)))
        .collect()
    }
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: "debug".to_string(),
            otlp_endpoint: None,
            traces_endpoint: None,
            metrics_endpoint: None,
            logs_endpoint: None,
            export_timeout_secs: 10,
            shutdown_timeout_secs: 10,
        }
    }
}

/// DSN components for the SQL persistence collaborator.
#[derive(Debug, Clone, Default, Args)]
pub struct DatabaseConfig {
    #[arg(long = "db-user", env = "DB_USER")]
    pub user: Option<String>,

    #[arg(long = "db-password", env = "DB_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    #[arg(long = "db-host", env = "DB_HOST")]
    pub host: Option<String>,

    #[arg(id = "db_port", long = "db-port", env = "DB_PORT")]
    pub port: Option<String>,

    #[arg(long = "db-name", env = "DB_NAME")]
    pub name: Option<String>,
}

impl DatabaseConfig {
    /// True when at least the host is set.
    pub fn is_configured(&self) -> bool {
        self.host.as_deref().is_some_and(|h| !h.is_empty())
    }

    /// MySQL-style DSN understood by the SQL collaborator.
    pub fn dsn(&self) -> String {
        format!(
            "{}:{}@tcp({}:{})/{}?parseTime=true&timeout=5s",
            self.user.as_deref().unwrap_or_default(),
            self.password.as_deref().unwrap_or_default(),
            self.host.as_deref().unwrap_or_default(),
            self.port.as_deref().unwrap_or_default(),
            self.name.as_deref().unwrap_or_default(),
        )
    }

    /// DSN with the password masked, safe for logs.
    pub fn redacted_dsn(&self) -> String {
        let masked = Self {
            password: self.password.as_ref().map(|_| "****".to_string()),
            ..self.clone()
        };
        masked.dsn()
    }
}
