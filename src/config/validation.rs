//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (clap handles syntactic)
//! - Validate value ranges (timeouts > 0, ports valid)
//! - Check that explicitly configured collector endpoints are URLs
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: AppConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use url::Url;

use crate::config::schema::AppConfig;

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("APP_PORT must not be 0")]
    ZeroPort,
    #[error("SERVICE_NAME must not be empty")]
    EmptyServiceName,
    #[error("{name} must be greater than 0")]
    ZeroTimeout { name: &'static str },
    #[error("{name} is not a valid URL ({value}): {reason}")]
    InvalidEndpoint {
        name: &'static str,
        value: String,
        reason: String,
    },
}

/// Validate a parsed configuration.
pub fn validate_config(config: &AppConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.port == 0 {
        errors.push(ValidationError::ZeroPort);
    }
    if config.service_name.trim().is_empty() {
        errors.push(ValidationError::EmptyServiceName);
    }

    for (name, value) in [
        ("REQUEST_TIMEOUT_SECS", config.request_timeout_secs),
        ("OTEL_EXPORT_TIMEOUT_SECS", config.telemetry.export_timeout_secs),
        ("SHUTDOWN_TIMEOUT_SECS", config.telemetry.shutdown_timeout_secs),
    ] {
        if value == 0 {
            errors.push(ValidationError::ZeroTimeout { name });
        }
    }

    for (name, value) in config.telemetry.configured_endpoints() {
        if let Err(e) = Url::parse(value) {
            errors.push(ValidationError::InvalidEndpoint {
                name,
                value: value.to_string(),
                reason: e.to_string(),
            });
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    fn parse(args: &[&str]) -> AppConfig {
        let mut argv = vec!["notes-service"];
        argv.extend_from_slice(args);
        AppConfig::try_parse_from(argv).unwrap()
    }

    #[test]
    fn default_config_is_valid() {
        assert_eq!(validate_config(&parse(&[])), Ok(()));
    }

    #[test]
    fn collects_every_error() {
        let config = parse(&[
            "--port",
            "0",
            "--service-name",
            " ",
            "--shutdown-timeout-secs",
            "0",
            "--otlp-endpoint",
            "not a url",
        ]);
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 4);
        assert!(errors.contains(&ValidationError::ZeroPort));
        assert!(errors.contains(&ValidationError::EmptyServiceName));
        assert!(errors.contains(&ValidationError::ZeroTimeout {
            name: "SHUTDOWN_TIMEOUT_SECS"
        }));
        assert!(matches!(
            errors.last(),
            Some(ValidationError::InvalidEndpoint { name: "OTEL_EXPORTER_OTLP_ENDPOINT", .. })
        ));
    }
}
