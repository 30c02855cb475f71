//! HTTP transport adapter built on `reqwest`.
//!
//! The adapter joins request paths onto `{endpoint}/{api_version}/`, sends
//! JSON bodies, and maps response status codes onto [`TransportError`].
//! It performs no authentication and no retries.

use super::{Method, Transport, TransportRequest, TransportResponse};
use crate::config::ClientConfig;
use crate::error::{ConfigurationError, TransportError};
use async_trait::async_trait;
use std::collections::HashMap;
use tracing::debug;
use url::Url;

#[cfg(test)]
#[path = "http_tests.rs"]
mod tests;

/// Transport that talks to a live queue service over HTTP
#[derive(Debug, Clone)]
pub struct HttpTransport {
    http_client: reqwest::Client,
    base_url: Url,
}

impl HttpTransport {
    /// Build an HTTP transport from client configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigurationError::Invalid` if the endpoint is not a valid
    /// base URL or the HTTP client cannot be created.
    pub fn new(config: &ClientConfig) -> Result<Self, ConfigurationError> {
        let root = format!(
            "{}/{}/",
            config.endpoint.trim_end_matches('/'),
            config.api_version.trim_matches('/')
        );
        let base_url = Url::parse(&root).map_err(|e| ConfigurationError::Invalid {
            message: format!("Invalid endpoint '{}': {}", config.endpoint, e),
        })?;

        if base_url.cannot_be_a_base() {
            return Err(ConfigurationError::Invalid {
                message: format!("Endpoint '{}' cannot be used as a base URL", config.endpoint),
            });
        }

        let http_client = reqwest::Client::builder()
            .timeout(config.timeout())
            .user_agent(&config.user_agent)
            .build()
            .map_err(|e| ConfigurationError::Invalid {
                message: format!("Failed to create HTTP client: {}", e),
            })?;

        Ok(Self {
            http_client,
            base_url,
        })
    }

    /// Versioned API root every request path is joined onto
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn url_for(&self, path: &str) -> Result<Url, TransportError> {
        self.base_url
            .join(path.trim_start_matches('/'))
            .map_err(|e| TransportError::Connection {
                message: format!("Invalid request path '{}': {}", path, e),
            })
    }
}

impl From<Method> for reqwest::Method {
    fn from(method: Method) -> Self {
        match method {
            Method::Get => reqwest::Method::GET,
            Method::Put => reqwest::Method::PUT,
            Method::Post => reqwest::Method::POST,
            Method::Patch => reqwest::Method::PATCH,
            Method::Delete => reqwest::Method::DELETE,
        }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: TransportRequest) -> Result<TransportResponse, TransportError> {
        let url = self.url_for(&request.path)?;

        let mut builder = self
            .http_client
            .request(request.method.into(), url)
            .header("Accept", "application/json");

        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await?;
        let status = response.status().as_u16();

        let headers: HashMap<String, String> = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_ascii_lowercase(), v.to_string()))
            })
            .collect();

        let text = response.text().await?;

        debug!(
            method = %request.method,
            path = %request.path,
            status = status,
            "HTTP transport response"
        );

        if !(200..300).contains(&status) {
            return Err(TransportError::from_status(status, &request.path, text));
        }

        let body = if text.trim().is_empty() {
            None
        } else {
            Some(serde_json::from_str(&text)?)
        };

        Ok(TransportResponse {
            status,
            headers,
            body,
        })
    }
}
