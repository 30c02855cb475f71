//! Behavior shared by every resource handle.
//!
//! A handle is a lightweight reference: a [`QueueClient`] plus the
//! resource's key. It holds no server data until [`Resource::load`] is
//! called, which fetches and caches an immutable snapshot. Reading a handle
//! never performs I/O.
//!
//! Existence checks are memoized per handle. Two handles for the same key
//! are independent caches and may disagree about staleness.

use crate::client::QueueClient;
use crate::error::{ClientError, ResourceKind, ValidationError};
use crate::transport::{Method, TransportRequest};
use async_trait::async_trait;

#[cfg(test)]
#[path = "resource_tests.rs"]
mod tests;

/// Longest queue or pool name accepted by the service
pub const MAX_NAME_LENGTH: usize = 64;

/// Check a queue or pool name: 1-64 ASCII alphanumerics, hyphens or underscores.
pub(crate) fn validate_name(field: &str, name: &str) -> Result<(), ValidationError> {
    if name.is_empty() || name.len() > MAX_NAME_LENGTH {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            message: format!("must be 1-{} characters", MAX_NAME_LENGTH),
        });
    }

    if !name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(ValidationError::InvalidFormat {
            field: field.to_string(),
            message: "only ASCII alphanumeric, hyphens, and underscores allowed".to_string(),
        });
    }

    Ok(())
}

/// Latest known existence of a resource, as seen by one handle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Existence {
    #[default]
    Unknown,
    Present,
    Absent,
}

impl Existence {
    /// The memoized answer, if one has been observed
    pub fn known(&self) -> Option<bool> {
        match self {
            Self::Unknown => None,
            Self::Present => Some(true),
            Self::Absent => Some(false),
        }
    }

    pub(crate) fn from_bool(present: bool) -> Self {
        if present {
            Self::Present
        } else {
            Self::Absent
        }
    }
}

/// Outcome of looking up a resource under an auto-create policy
#[derive(Debug)]
pub enum Ensured<H> {
    /// The resource already existed
    Found(H),
    /// The resource was created by this call
    Created(H),
    /// The resource does not exist and auto-create was disabled
    Absent,
}

impl<H> Ensured<H> {
    pub fn was_created(&self) -> bool {
        matches!(self, Self::Created(_))
    }

    pub fn is_absent(&self) -> bool {
        matches!(self, Self::Absent)
    }

    /// The live handle, unless the resource is absent
    pub fn into_handle(self) -> Option<H> {
        match self {
            Self::Found(handle) | Self::Created(handle) => Some(handle),
            Self::Absent => None,
        }
    }

    /// Turn an absent outcome into a not-found fault naming `key`.
    pub fn or_not_found(self, resource: ResourceKind, key: &str) -> Result<H, ClientError> {
        self.into_handle()
            .ok_or_else(|| ClientError::not_found(resource, key))
    }
}

/// Common interface for queue, claim and pool handles
#[async_trait]
pub trait Resource: Send + Sync {
    /// Fully populated, immutable view returned by [`Resource::load`]
    type Snapshot: Clone + Send + Sync;

    fn kind(&self) -> ResourceKind;

    /// Identifying key (queue name, claim id, pool name)
    fn key(&self) -> &str;

    fn client(&self) -> &QueueClient;

    /// Resource path relative to the API root
    fn path(&self) -> String;

    fn existence(&self) -> Existence;

    /// Update the memoized existence after an observation.
    fn record_existence(&mut self, existence: Existence);

    /// Last snapshot fetched by this handle, if any
    fn snapshot(&self) -> Option<&Self::Snapshot>;

    /// Fetch the current representation and cache it on the handle.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::NotFound` if the resource does not exist.
    async fn load(&mut self) -> Result<Self::Snapshot, ClientError>;

    /// Alias for [`Resource::load`], for call sites re-reading a handle
    async fn refresh(&mut self) -> Result<Self::Snapshot, ClientError> {
        self.load().await
    }

    /// Whether the resource exists, using the memoized answer when known.
    ///
    /// A missing resource is `Ok(false)`, never an error; other transport
    /// failures still propagate.
    async fn exists(&mut self) -> Result<bool, ClientError> {
        match self.existence().known() {
            Some(known) => Ok(known),
            None => self.refresh_existence().await,
        }
    }

    /// Drop the memoized answer and ask the service again.
    async fn refresh_existence(&mut self) -> Result<bool, ClientError> {
        let request = TransportRequest::new(Method::Get, self.path());
        let present = match self.client().send(request).await {
            Ok(_) => true,
            Err(e) if e.is_not_found() => false,
            Err(e) => return Err(e.into()),
        };
        self.record_existence(Existence::from_bool(present));
        Ok(present)
    }
}
