//! Client configuration.
//!
//! Values come from built-in defaults, an optional TOML file and environment
//! variables prefixed `QUEUE_STEWARD__` (double-underscore separator), applied
//! in that order. For example `QUEUE_STEWARD__ENDPOINT=http://queues:8888`
//! overrides the service endpoint.

use crate::error::ConfigurationError;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Prefix for environment variable overrides
pub const ENV_PREFIX: &str = "QUEUE_STEWARD";

/// Configuration for the queue client and its HTTP transport.
///
/// # Examples
///
/// ```
/// use queue_steward_client::ClientConfig;
/// use std::time::Duration;
///
/// let config = ClientConfig::default()
///     .with_endpoint("http://queues.internal:8888")
///     .with_timeout(Duration::from_secs(10));
/// assert_eq!(config.timeout(), Duration::from_secs(10));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Service base URL, without the API version segment
    pub endpoint: String,
    /// API version segment prefixed to every resource path
    pub api_version: String,
    /// Identity sent with every request; governs message echo filtering
    pub client_id: String,
    /// User agent string for HTTP requests
    pub user_agent: String,
    /// Request timeout handed to the transport
    pub timeout_seconds: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:8888".to_string(),
            api_version: "v1".to_string(),
            client_id: uuid::Uuid::new_v4().to_string(),
            user_agent: concat!("queue-steward/", env!("CARGO_PKG_VERSION")).to_string(),
            timeout_seconds: 30,
        }
    }
}

impl ClientConfig {
    /// Load configuration from an optional file plus environment overrides.
    ///
    /// # Errors
    ///
    /// Returns `ConfigurationError` if the file is given but unreadable, or
    /// a value cannot be coerced to its field type.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigurationError> {
        let mut builder = config::Config::builder();

        if let Some(path) = path {
            builder = builder.add_source(
                config::File::from(path)
                    .required(true)
                    .format(config::FileFormat::Toml),
            );
        }

        builder = builder.add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        );

        let config: Self = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Check the values that would otherwise fail deep inside the transport.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if self.endpoint.trim().is_empty() {
            return Err(ConfigurationError::Missing {
                key: "endpoint".to_string(),
            });
        }
        if self.client_id.trim().is_empty() {
            return Err(ConfigurationError::Missing {
                key: "client_id".to_string(),
            });
        }
        if self.timeout_seconds == 0 {
            return Err(ConfigurationError::Invalid {
                message: "timeout_seconds must be greater than zero".to_string(),
            });
        }
        Ok(())
    }

    /// Request timeout as a `Duration`
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }

    /// Set the service endpoint.
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    /// Set the client identity.
    pub fn with_client_id(mut self, client_id: impl Into<String>) -> Self {
        self.client_id = client_id.into();
        self
    }

    /// Set the user agent string.
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Set the request timeout, rounded up to whole seconds.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout_seconds = timeout.as_secs() + u64::from(timeout.subsec_nanos() > 0);
        self
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
