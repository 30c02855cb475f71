//! Error types for queue resource operations.
//!
//! Three layers of failure are distinguished:
//! - [`TransportError`] is raised by a [`Transport`](crate::transport::Transport)
//!   adapter and is opaque to the resource layer, except for its not-found signal.
//! - [`ClientError`] is the caller-facing fault returned by every resource
//!   operation. Only the transport not-found signal is translated into
//!   [`ClientError::NotFound`]; everything else passes through unchanged.
//! - [`ValidationError`] rejects malformed input before any network call.

use std::fmt;
use thiserror::Error;

/// Kind of resource named by a [`ClientError::NotFound`] fault.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    Queue,
    Message,
    MessageBatch,
    Claim,
    Pool,
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Queue => "Queue",
            Self::Message => "Message",
            Self::MessageBatch => "Messages",
            Self::Claim => "Claim",
            Self::Pool => "Pool",
        };
        f.write_str(name)
    }
}

/// Caller-facing error for all resource operations
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("{resource}({key}) does not exist")]
    NotFound { resource: ResourceKind, key: String },

    #[error("Invalid argument: {0}")]
    InvalidArgument(#[from] ValidationError),

    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),
}

impl ClientError {
    /// Build a not-found fault for a single resource key.
    pub fn not_found(resource: ResourceKind, key: impl Into<String>) -> Self {
        Self::NotFound {
            resource,
            key: key.into(),
        }
    }

    /// Build a not-found fault naming a whole batch of keys.
    pub fn batch_not_found<S: AsRef<str>>(keys: &[S]) -> Self {
        let key = keys
            .iter()
            .map(|k| k.as_ref())
            .collect::<Vec<_>>()
            .join(", ");
        Self::NotFound {
            resource: ResourceKind::MessageBatch,
            key,
        }
    }

    /// Check whether this error reports a missing resource.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Check if error is transient and the caller may choose to retry.
    ///
    /// The client itself never retries.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::NotFound { .. } => false,
            Self::InvalidArgument(_) => false,
            Self::Transport(e) => e.is_transient(),
        }
    }
}

/// Failure reported by a transport adapter
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("Resource not found: {path}")]
    NotFound { path: String },

    #[error("HTTP error: {status} - {message}")]
    Http { status: u16, message: String },

    #[error("Request timeout")]
    Timeout,

    #[error("Connection failed: {message}")]
    Connection { message: String },

    #[error("Response could not be decoded: {message}")]
    Decode { message: String },
}

impl TransportError {
    /// Map a non-success status code to the matching transport error.
    pub fn from_status(status: u16, path: &str, message: impl Into<String>) -> Self {
        match status {
            404 => Self::NotFound {
                path: path.to_string(),
            },
            408 | 504 => Self::Timeout,
            _ => Self::Http {
                status,
                message: message.into(),
            },
        }
    }

    /// Check whether the transport signalled that the target does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Check if error is transient
    pub fn is_transient(&self) -> bool {
        match self {
            Self::NotFound { .. } => false,
            Self::Http { status, .. } => *status >= 500 || *status == 429,
            Self::Timeout => true,
            Self::Connection { .. } => true,
            Self::Decode { .. } => false,
        }
    }
}

impl From<serde_json::Error> for TransportError {
    fn from(e: serde_json::Error) -> Self {
        Self::Decode {
            message: e.to_string(),
        }
    }
}

impl From<reqwest::Error> for TransportError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Self::Timeout
        } else if e.is_decode() {
            Self::Decode {
                message: e.to_string(),
            }
        } else {
            Self::Connection {
                message: e.to_string(),
            }
        }
    }
}

/// Translate the transport not-found signal into a domain fault.
///
/// All other transport errors are passed through without reinterpretation.
pub(crate) trait NotFoundExt<T> {
    fn or_not_found(self, resource: ResourceKind, key: &str) -> Result<T, ClientError>;
}

impl<T> NotFoundExt<T> for Result<T, TransportError> {
    fn or_not_found(self, resource: ResourceKind, key: &str) -> Result<T, ClientError> {
        self.map_err(|e| {
            if e.is_not_found() {
                ClientError::not_found(resource, key)
            } else {
                ClientError::Transport(e)
            }
        })
    }
}

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigurationError {
    #[error("Invalid configuration: {message}")]
    Invalid { message: String },

    #[error("Missing required configuration: {key}")]
    Missing { key: String },

    #[error("Configuration parsing failed: {message}")]
    Parsing { message: String },
}

impl From<config::ConfigError> for ConfigurationError {
    fn from(e: config::ConfigError) -> Self {
        match e {
            config::ConfigError::NotFound(key) => Self::Missing { key },
            other => Self::Parsing {
                message: other.to_string(),
            },
        }
    }
}

/// Validation errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Required field missing: {field}")]
    Required { field: String },

    #[error("Invalid format for {field}: {message}")]
    InvalidFormat { field: String, message: String },

    #[error("Value out of range for {field}: {message}")]
    OutOfRange { field: String, message: String },
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
