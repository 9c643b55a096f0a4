//! Static service identity attached to every signal stream.

use opentelemetry::KeyValue;
use opentelemetry_sdk::Resource;

use crate::config::AppConfig;

/// Immutable identity of this process: service name, environment, version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceDescriptor {
    service_name: String,
    environment: String,
    version: String,
}

impl ResourceDescriptor {
    pub fn new(
        service_name: impl Into<String>,
        environment: impl Into<String>,
        version: impl Into<String>,
    ) -> Self {
        Self {
            service_name: service_name.into(),
            environment: environment.into(),
            version: version.into(),
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(&config.service_name, &config.environment, &config.version)
    }

    pub fn service_name(&self) -> &str {
        &self.service_name
    }

    pub fn environment(&self) -> &str {
        &self.environment
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    /// Build the OpenTelemetry resource shared by all three providers.
    pub fn to_resource(&self) -> Resource {
        Resource::builder()
            .with_service_name(self.service_name.clone())
            .with_attributes([
                KeyValue::new("service.version", self.version.clone()),
                KeyValue::new("deployment.environment", self.environment.clone()),
                KeyValue::new("environment", self.environment.clone()),
                KeyValue::new("app.version", self.version.clone()),
            ])
            .build()
    }
}
