//! Configuration loading from the process environment.

use std::ffi::OsString;
use std::path::Path;

use clap::Parser;

use crate::config::schema::AppConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug)]
pub enum ConfigError {
    Dotenv(dotenvy::Error),
    Parse(clap::Error),
    Validation(Vec<ValidationError>),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Dotenv(e) => write!(f, "Failed to load .env: {}", e),
            ConfigError::Parse(e) => write!(f, "Parse error: {}", e),
            ConfigError::Validation(errors) => {
                write!(f, "Validation failed: ")?;
                for (i, err) in errors.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", err)?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Dotenv(e) => Some(e),
            ConfigError::Parse(e) => Some(e),
            ConfigError::Validation(_) => None,
        }
    }
}

/// Load `.env` (when the environment asks for it), then parse and validate
/// configuration from the process arguments and environment.
pub fn load_config() -> Result<AppConfig, ConfigError> {
    let environment = std::env::var("ENVIRONMENT").unwrap_or_default();
    if AppConfig::loads_dotenv(&environment) {
        load_dotenv(None)?;
    }
    load_config_from(std::env::args_os())
}

/// Parse and validate configuration from explicit arguments.
///
/// Environment variables still act as fallbacks for missing flags.
pub fn load_config_from<I, T>(args: I) -> Result<AppConfig, ConfigError>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let config = AppConfig::try_parse_from(args).map_err(ConfigError::Parse)?;
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

/// Load a `.env` file into the process environment.
///
/// Returns whether a file was found. A missing file is not an error;
/// a malformed one is.
pub fn load_dotenv(path: Option<&Path>) -> Result<bool, ConfigError> {
    let result = match path {
        Some(path) => dotenvy::from_path(path),
        None => dotenvy::dotenv().map(|_| ()),
    };

    match result {
        Ok(()) => Ok(true),
        Err(e) if e.not_found() => Ok(false),
        Err(e) => Err(ConfigError::Dotenv(e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn missing_dotenv_is_tolerated() {
        let dir = tempfile::tempdir().unwrap();
        let found = load_dotenv(Some(&dir.path().join(".env"))).unwrap();
        assert!(!found);
    }

    #[test]
    fn dotenv_values_reach_environment() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "NOTES_LOADER_TEST_KEY=from-dotenv").unwrap();

        assert!(load_dotenv(Some(file.path())).unwrap());
        assert_eq!(
            std::env::var("NOTES_LOADER_TEST_KEY").as_deref(),
            Ok("from-dotenv")
        );
    }

    #[test]
    fn malformed_dotenv_is_fatal() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "NOTES_LOADER_BROKEN=\"unterminated").unwrap();

        let err = load_dotenv(Some(file.path())).unwrap_err();
        assert!(matches!(err, ConfigError::Dotenv(_)));
    }

    #[test]
    fn validation_errors_surface() {
        let err = load_config_from(["notes-service", "--port", "0"]).unwrap_err();
        match err {
            ConfigError::Validation(errors) => {
                assert_eq!(errors, vec![ValidationError::ZeroPort]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn unknown_flag_is_parse_error() {
        let err = load_config_from(["notes-service", "--bogus"]).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }
}
