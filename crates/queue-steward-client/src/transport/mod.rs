//! Transport seam between the resource layer and the queueing service.
//!
//! A [`Transport`] sends a method, a path relative to the API root, optional
//! query parameters and an optional JSON body, and returns a status, headers
//! and a parsed body. Adapters signal a missing target with
//! [`TransportError::NotFound`]; every other non-success status becomes
//! another [`TransportError`] variant.
//!
//! Two adapters ship with the crate:
//! - [`HttpTransport`] for a live service
//! - [`InMemoryTransport`] emulating the service for tests and development

pub mod http;
pub mod memory;

use crate::error::TransportError;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;

pub use http::HttpTransport;
pub use memory::InMemoryTransport;

/// Header carrying the identity used for message echo filtering
pub const CLIENT_ID_HEADER: &str = "Client-ID";

/// HTTP verbs used by the queue API
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Put,
    Post,
    Patch,
    Delete,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Put => "PUT",
            Self::Post => "POST",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single request handed to a transport adapter
#[derive(Debug, Clone, PartialEq)]
pub struct TransportRequest {
    pub method: Method,
    /// Path relative to the versioned API root, without a leading slash
    pub path: String,
    pub query: Vec<(String, String)>,
    pub headers: Vec<(String, String)>,
    pub body: Option<Value>,
}

impl TransportRequest {
    /// Create a request with no query, headers or body
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        let path = path.into();
        Self {
            method,
            path: path.trim_start_matches('/').to_string(),
            query: Vec::new(),
            headers: Vec::new(),
            body: None,
        }
    }

    /// Add a query parameter
    pub fn with_query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    /// Add a header
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Attach a JSON body
    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Look up a query parameter by name
    pub fn query_param(&self, key: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Look up a header by case-insensitive name
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Successful response from a transport adapter
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TransportResponse {
    pub status: u16,
    /// Header names are stored lower-cased
    pub headers: HashMap<String, String>,
    pub body: Option<Value>,
}

impl TransportResponse {
    pub fn new(status: u16) -> Self {
        Self {
            status,
            headers: HashMap::new(),
            body: None,
        }
    }

    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.insert(name.to_ascii_lowercase(), value.into());
        self
    }

    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Look up a header by case-insensitive name
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    /// Whether the response carries a non-null body
    pub fn has_body(&self) -> bool {
        !matches!(self.body, None | Some(Value::Null))
    }

    /// Deserialize the body into a typed document.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Decode`] when the body is absent or does not
    /// match the expected shape.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, TransportError> {
        match &self.body {
            Some(body) => Ok(serde_json::from_value(body.clone())?),
            None => Err(TransportError::Decode {
                message: format!("expected a response body (status {})", self.status),
            }),
        }
    }
}

/// Interface implemented by concrete transports (HTTP, in-memory, mocks)
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send one request and wait for its response.
    ///
    /// Implementations must not retry: a single failure is reported as a
    /// single error.
    async fn send(&self, request: TransportRequest) -> Result<TransportResponse, TransportError>;
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
