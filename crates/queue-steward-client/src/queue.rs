//! Queue resource: existence, auto-create policy, metadata and stats.
//!
//! Message and claim operations are also reached through [`Queue`]; they live
//! in the `message` and `claim` modules.

use crate::client::QueueClient;
use crate::error::{ClientError, ResourceKind, TransportError, ValidationError};
use crate::pagination::{Marked, PageRequest};
use crate::resource::{validate_name, Ensured, Existence, Resource};
use crate::transport::{Method, TransportRequest};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::str::FromStr;
use tracing::info;

#[cfg(test)]
#[path = "queue_tests.rs"]
mod tests;

/// Free-form JSON object attached to a queue or pool
pub type Metadata = serde_json::Map<String, Value>;

/// Validated queue name
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct QueueName(String);

impl QueueName {
    /// Create new queue name with validation
    pub fn new(name: String) -> Result<Self, ValidationError> {
        validate_name("queue_name", &name)?;
        Ok(Self(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for QueueName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for QueueName {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s.to_string())
    }
}

/// Queue data cached on a handle by [`Resource::load`]
#[derive(Debug, Clone, PartialEq)]
pub struct QueueSnapshot {
    pub name: String,
    pub metadata: Metadata,
}

/// Message counters reported by the stats endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueueStats {
    pub messages: MessageCounts,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageCounts {
    pub free: u64,
    pub claimed: u64,
    pub total: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub oldest: Option<MessageStat>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub newest: Option<MessageStat>,
}

/// Reference to the oldest or newest message in a queue
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageStat {
    pub href: String,
    pub age: u64,
    pub created: DateTime<Utc>,
}

/// Parameters for [`QueueClient::queues`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueueListing {
    pub page: PageRequest,
    /// Include each queue's metadata in the listing
    pub detailed: bool,
}

impl QueueListing {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_page(mut self, page: PageRequest) -> Self {
        self.page = page;
        self
    }

    pub fn detailed(mut self, detailed: bool) -> Self {
        self.detailed = detailed;
        self
    }
}

/// One entry of a queue listing, as sent by the service
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct QueueSummary {
    pub name: String,
    #[serde(default)]
    pub metadata: Option<Metadata>,
}

/// Handle to a queue
#[derive(Debug, Clone)]
pub struct Queue {
    pub(crate) client: QueueClient,
    pub(crate) name: QueueName,
    existence: Existence,
    snapshot: Option<QueueSnapshot>,
}

impl Queue {
    pub(crate) fn new(client: QueueClient, name: QueueName) -> Self {
        Self {
            client,
            name,
            existence: Existence::Unknown,
            snapshot: None,
        }
    }

    /// Handle for a queue the service just listed.
    ///
    /// The name is taken as the service reports it, without local validation.
    pub(crate) fn listed(client: QueueClient, summary: QueueSummary) -> Self {
        let snapshot = summary.metadata.map(|metadata| QueueSnapshot {
            name: summary.name.clone(),
            metadata,
        });
        Self {
            client,
            name: QueueName(summary.name),
            existence: Existence::Present,
            snapshot,
        }
    }

    pub fn name(&self) -> &str {
        self.name.as_str()
    }

    pub fn queue_name(&self) -> &QueueName {
        &self.name
    }

    /// Path of a sub-resource of this queue
    pub(crate) fn child_path(&self, child: &str) -> String {
        format!("queues/{}/{}", self.name, child)
    }

    /// Translate a transport result, recording a missing queue on the handle.
    pub(crate) fn observe<T>(&mut self, result: Result<T, TransportError>) -> Result<T, ClientError> {
        match result {
            Ok(value) => {
                self.existence = Existence::Present;
                Ok(value)
            }
            Err(e) if e.is_not_found() => {
                self.existence = Existence::Absent;
                self.snapshot = None;
                Err(ClientError::not_found(ResourceKind::Queue, self.name()))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Fail with `NotFound` naming this queue unless it exists.
    pub(crate) async fn require_exists(&mut self) -> Result<(), ClientError> {
        if self.exists().await? {
            Ok(())
        } else {
            Err(ClientError::not_found(ResourceKind::Queue, self.name()))
        }
    }

    /// Look the queue up under the given auto-create policy.
    ///
    /// With `auto_create` a single create-or-no-op request is issued and the
    /// outcome reports whether this call created the queue. Without it only
    /// an existence check is made and a missing queue yields
    /// [`Ensured::Absent`]; the queue is never created.
    pub async fn lookup(mut self, auto_create: bool) -> Result<Ensured<Queue>, ClientError> {
        if !auto_create {
            return Ok(if self.refresh_existence().await? {
                Ensured::Found(self)
            } else {
                Ensured::Absent
            });
        }

        let request = TransportRequest::new(Method::Put, self.path());
        let response = self.client.send(request).await?;
        self.existence = Existence::Present;

        if response.status == 201 {
            info!(queue = %self.name, "Queue created");
            Ok(Ensured::Created(self))
        } else {
            Ok(Ensured::Found(self))
        }
    }

    /// Look the queue up, failing with `NotFound` if it is absent.
    pub async fn ensure(self, auto_create: bool) -> Result<Queue, ClientError> {
        let name = self.name.clone();
        self.lookup(auto_create)
            .await?
            .or_not_found(ResourceKind::Queue, name.as_str())
    }

    /// Delete the queue. Deleting a missing queue succeeds.
    pub async fn delete(&mut self) -> Result<(), ClientError> {
        let request = TransportRequest::new(Method::Delete, self.path());
        match self.client.send(request).await {
            Ok(_) => info!(queue = %self.name, "Queue deleted"),
            Err(e) if e.is_not_found() => {}
            Err(e) => return Err(e.into()),
        }
        self.existence = Existence::Absent;
        self.snapshot = None;
        Ok(())
    }

    /// Fetch the queue's metadata document.
    pub async fn metadata(&mut self) -> Result<Metadata, ClientError> {
        let request = TransportRequest::new(Method::Get, self.child_path("metadata"));
        let response = self.client.send(request).await;
        let response = self.observe(response)?;

        let metadata: Metadata = if response.has_body() {
            response.json()?
        } else {
            Metadata::new()
        };
        self.snapshot = Some(QueueSnapshot {
            name: self.name.to_string(),
            metadata: metadata.clone(),
        });
        Ok(metadata)
    }

    /// Replace the queue's metadata document wholesale.
    pub async fn set_metadata(&mut self, metadata: Metadata) -> Result<(), ClientError> {
        let request = TransportRequest::new(Method::Put, self.child_path("metadata"))
            .with_body(Value::Object(metadata.clone()));
        let response = self.client.send(request).await;
        self.observe(response)?;

        self.snapshot = Some(QueueSnapshot {
            name: self.name.to_string(),
            metadata,
        });
        Ok(())
    }

    /// Fetch message counters for the queue.
    pub async fn stats(&mut self) -> Result<QueueStats, ClientError> {
        let request = TransportRequest::new(Method::Get, self.child_path("stats"));
        let response = self.client.send(request).await;
        let response = self.observe(response)?;
        Ok(response.json()?)
    }
}

#[async_trait]
impl Resource for Queue {
    type Snapshot = QueueSnapshot;

    fn kind(&self) -> ResourceKind {
        ResourceKind::Queue
    }

    fn key(&self) -> &str {
        self.name.as_str()
    }

    fn client(&self) -> &QueueClient {
        &self.client
    }

    fn path(&self) -> String {
        format!("queues/{}", self.name)
    }

    fn existence(&self) -> Existence {
        self.existence
    }

    fn record_existence(&mut self, existence: Existence) {
        if existence == Existence::Absent {
            self.snapshot = None;
        }
        self.existence = existence;
    }

    fn snapshot(&self) -> Option<&QueueSnapshot> {
        self.snapshot.as_ref()
    }

    async fn load(&mut self) -> Result<QueueSnapshot, ClientError> {
        self.metadata().await?;
        self.snapshot
            .clone()
            .ok_or_else(|| ClientError::not_found(ResourceKind::Queue, self.name()))
    }
}

impl Marked for Queue {
    fn marker(&self) -> &str {
        self.name.as_str()
    }
}
