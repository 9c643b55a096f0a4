//! Startup orchestration.
//!
//! # Responsibilities
//! - Load and validate configuration
//! - Bootstrap telemetry before anything else runs
//! - Start the listener under the run controller
//! - Drain the providers and map the run outcome to an exit code
//!
//! # Design Decisions
//! - Fail fast: a configuration or bootstrap error is fatal and no
//!   traffic is served
//! - Telemetry is bootstrapped before the async runtime starts, and the
//!   providers are dropped after it stops; the exporters' blocking HTTP
//!   clients never live inside an async context
//! - Shutdown failures are logged and never change the exit code
//! - The runtime is stopped with a short grace period, so a drain the
//!   sequencer abandoned on the blocking pool cannot hold up exit

use std::error::Error;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use clap::error::ErrorKind;
use opentelemetry::global;
use tokio::runtime::{Handle, Runtime};

use crate::config::{load_config, AppConfig, ConfigError};
use crate::http::{AppState, HttpServer};
use crate::lifecycle::controller::{RunController, RunOutcome};
use crate::lifecycle::reporter::{ErrorReporter, LogReporter};
use crate::lifecycle::shutdown::ShutdownSequencer;
use crate::lifecycle::signals::spawn_signal_listener;
use crate::notes::InMemoryNoteStore;
use crate::observability::metrics::{RuntimeMetrics, METER_NAME};
use crate::observability::{
    self, logging, BootstrapError, OtlpHttpPipelines, ProviderSet, ResourceDescriptor, SpanTracer,
};

/// Budget for flushing the error reporter before exit.
const REPORTER_FLUSH_TIMEOUT: Duration = Duration::from_secs(2);

/// Grace period for runtime tasks still alive once the providers drained.
const RUNTIME_STOP_GRACE: Duration = Duration::from_millis(500);

/// Level used for fatal logging when configuration could not be read.
const FALLBACK_LOG_LEVEL: &str = "info";

/// Run the service to completion.
pub fn run() -> ExitCode {
    let reporter = LogReporter::new();

    let config = match load_config() {
        Ok(config) => config,
        Err(ConfigError::Parse(e))
            if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) =>
        {
            let _ = e.print();
            return ExitCode::SUCCESS;
        }
        Err(e) => return fatal(&reporter, FALLBACK_LOG_LEVEL, "Configuration error", &e),
    };

    let log_level = config.telemetry.log_level.clone();
    let providers = match bootstrap(&config) {
        Ok(providers) => providers,
        Err(e) => return fatal(&reporter, &log_level, "Telemetry bootstrap failed", &e),
    };

    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => return fatal(&reporter, &log_level, "Failed to start runtime", &e),
    };

    let code = runtime.block_on(serve(&config, &providers));
    reporter.flush(REPORTER_FLUSH_TIMEOUT);

    stop_runtime(runtime, RUNTIME_STOP_GRACE);
    drop(providers);
    code
}

/// Stop `runtime`, waiting at most `grace` for its remaining tasks.
///
/// Dropping a runtime blocks until every blocking task returns, which
/// includes drains the shutdown sequencer gave up on.
pub fn stop_runtime(runtime: Runtime, grace: Duration) {
    runtime.shutdown_timeout(grace);
}

/// Exit code for how the run ended.
pub fn exit_code(outcome: &RunOutcome) -> ExitCode {
    ExitCode::from(exit_status(outcome))
}

fn exit_status(outcome: &RunOutcome) -> u8 {
    match outcome {
        RunOutcome::Cancelled(_) => 0,
        RunOutcome::ListenerFailed(_) => 1,
    }
}

/// Bootstrap telemetry from `config`.
pub fn bootstrap(config: &AppConfig) -> Result<ProviderSet, BootstrapError> {
    let descriptor = ResourceDescriptor::from_config(config);
    let factory = OtlpHttpPipelines::from_config(&config.telemetry);
    let providers = observability::init(&descriptor, &factory, &config.telemetry.log_level)?;

    for (signal, endpoint) in config.telemetry.configured_endpoints() {
        tracing::debug!(signal, endpoint, "Collector endpoint configured");
    }
    Ok(providers)
}

/// Serve until the listener fails or the process is cancelled, then drain
/// the providers.
pub async fn serve(config: &AppConfig, providers: &ProviderSet) -> ExitCode {
    let _runtime_metrics = RuntimeMetrics::register(&global::meter(METER_NAME), Handle::current());

    if config.database.is_configured() {
        tracing::info!(
            dsn = %config.database.redacted_dsn(),
            "Database settings present; serving from the in-memory store"
        );
    }

    let store = Arc::new(InMemoryNoteStore::new(SpanTracer::global()));
    let server = HttpServer::new(config, AppState::new(store, config));
    tracing::info!(
        address = %server.bind_address(),
        service = %config.service_name,
        environment = %config.environment,
        "Starting notes service"
    );

    let controller = RunController::default();
    let _signals = spawn_signal_listener(controller.cancellation().clone());

    let outcome = controller.run(server.run()).await;
    let code = exit_code(&outcome);

    let sequencer = ShutdownSequencer::new(config.telemetry.shutdown_timeout());
    let report = sequencer.run(providers.drain_targets()).await;
    match report.into_result() {
        Ok(()) => tracing::info!("Shutdown complete"),
        Err(errors) => tracing::warn!(error = %errors, "Shutdown completed with errors"),
    }

    code
}

/// Report a fatal startup error and pick the failing exit code.
fn fatal(
    reporter: &dyn ErrorReporter,
    log_level: &str,
    message: &str,
    error: &(dyn Error + 'static),
) -> ExitCode {
    // Fails only when a subscriber is already installed, which is fine.
    let _ = logging::install_local_only(log_level);

    reporter.capture(error);
    tracing::error!(error = %error, "{}", message);
    reporter.flush(REPORTER_FLUSH_TIMEOUT);
    ExitCode::FAILURE
}
