//! Claims: temporary exclusive ownership of a batch of messages.
//!
//! # Lifecycle
//!
//! ```text
//!   Queue::claim ──► Empty                      (nothing claimable)
//!        │
//!        └───────► Active ──update──► Active
//!                    │  ▲
//!   Queue::claim_by_id   │  └──load── Unloaded
//!        │           │
//!        ▼           └──release / 404──► Released
//!     Unloaded
//! ```
//!
//! A claim handle caches what it last saw. The messages it holds are only
//! populated on acquisition or an explicit [`Resource::load`]; an update
//! changes the cached ttl and nothing else.

use crate::client::QueueClient;
use crate::error::{ClientError, ResourceKind, TransportError, ValidationError};
use crate::message::{from_documents, id_from_href, Message, MessageDocument};
use crate::pagination::MAX_PAGE_LIMIT;
use crate::queue::{Queue, QueueName};
use crate::resource::{Existence, Resource};
use crate::transport::{Method, TransportRequest};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::str::FromStr;
use tracing::{info, warn};

#[cfg(test)]
#[path = "claim_tests.rs"]
mod tests;

/// Claim identifier, scoped to its queue
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ClaimId(String);

impl ClaimId {
    pub fn new(id: impl Into<String>) -> Result<Self, ValidationError> {
        let id = id.into();
        if id.is_empty() {
            return Err(ValidationError::Required {
                field: "claim_id".to_string(),
            });
        }
        Ok(Self(id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ClaimId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ClaimId {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

fn require_positive(field: &str, value: u64) -> Result<(), ValidationError> {
    if value == 0 {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            message: "must be greater than zero".to_string(),
        });
    }
    Ok(())
}

/// Parameters for acquiring a claim
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClaimRequest {
    ttl: u64,
    grace: u64,
    limit: Option<u32>,
}

impl ClaimRequest {
    /// Claim messages for `ttl` seconds, extending their lifetime by `grace`
    /// seconds beyond the claim if needed.
    pub fn new(ttl: u64, grace: u64) -> Result<Self, ValidationError> {
        require_positive("ttl", ttl)?;
        require_positive("grace", grace)?;
        Ok(Self {
            ttl,
            grace,
            limit: None,
        })
    }

    /// Claim at most `limit` messages.
    pub fn with_limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn ttl(&self) -> u64 {
        self.ttl
    }

    pub fn grace(&self) -> u64 {
        self.grace
    }

    pub fn limit(&self) -> Option<u32> {
        self.limit
    }

    fn validate(&self) -> Result<(), ValidationError> {
        require_positive("ttl", self.ttl)?;
        require_positive("grace", self.grace)?;
        if let Some(limit) = self.limit {
            if limit == 0 || limit > MAX_PAGE_LIMIT {
                return Err(ValidationError::OutOfRange {
                    field: "limit".to_string(),
                    message: format!("must be between 1 and {}", MAX_PAGE_LIMIT),
                });
            }
        }
        Ok(())
    }
}

/// Claim data cached by an active handle
#[derive(Debug, Clone, PartialEq)]
pub struct ClaimSnapshot {
    pub id: ClaimId,
    pub ttl: u64,
    pub age: u64,
    /// Known only on the handle that acquired the claim
    pub grace: Option<u64>,
    pub messages: Vec<Message>,
    pub href: Option<String>,
}

/// Where a claim handle is in its lifecycle
#[derive(Debug, Clone, PartialEq)]
pub enum ClaimState {
    /// Built from an id; nothing has been fetched yet
    Unloaded,
    Active(ClaimSnapshot),
    /// Released by this handle, or reported missing by the service
    Released,
}

/// Outcome of acquiring a claim
#[derive(Debug)]
pub enum ClaimResult {
    Acquired(Claim),
    /// The queue had no claimable messages
    Empty,
}

impl ClaimResult {
    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }

    pub fn into_claim(self) -> Option<Claim> {
        match self {
            Self::Acquired(claim) => Some(claim),
            Self::Empty => None,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ClaimDocument {
    #[serde(default)]
    age: u64,
    ttl: u64,
    #[serde(default)]
    href: Option<String>,
    #[serde(default)]
    messages: Vec<MessageDocument>,
}

/// Handle to a claim on a queue
#[derive(Debug, Clone)]
pub struct Claim {
    client: QueueClient,
    queue: QueueName,
    id: ClaimId,
    state: ClaimState,
}

impl Claim {
    pub fn id(&self) -> &ClaimId {
        &self.id
    }

    pub fn queue_name(&self) -> &QueueName {
        &self.queue
    }

    pub fn state(&self) -> &ClaimState {
        &self.state
    }

    pub fn is_active(&self) -> bool {
        matches!(self.state, ClaimState::Active(_))
    }

    pub fn is_released(&self) -> bool {
        matches!(self.state, ClaimState::Released)
    }

    fn active(&self) -> Option<&ClaimSnapshot> {
        match &self.state {
            ClaimState::Active(snapshot) => Some(snapshot),
            _ => None,
        }
    }

    pub fn ttl(&self) -> Option<u64> {
        self.active().map(|s| s.ttl)
    }

    pub fn age(&self) -> Option<u64> {
        self.active().map(|s| s.age)
    }

    pub fn grace(&self) -> Option<u64> {
        self.active().and_then(|s| s.grace)
    }

    pub fn messages(&self) -> Option<&[Message]> {
        self.active().map(|s| s.messages.as_slice())
    }

    fn not_found(&self) -> ClientError {
        ClientError::not_found(ResourceKind::Claim, self.id.as_str())
    }

    fn invalidate(&mut self) {
        if !self.is_released() {
            warn!(queue = %self.queue, claim = %self.id, "Claim no longer exists on the service");
        }
        self.state = ClaimState::Released;
    }

    /// Renew the claim for `ttl` seconds from now.
    ///
    /// Grace stays as set at acquisition. The cached age is not reset; load
    /// the claim again for a fresh age.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::NotFound` if the claim was released or has
    /// expired. A released handle fails without contacting the service.
    pub async fn update(&mut self, ttl: u64) -> Result<(), ClientError> {
        require_positive("ttl", ttl)?;
        if self.is_released() {
            return Err(self.not_found());
        }

        let request = TransportRequest::new(Method::Patch, self.path()).with_body(json!({ "ttl": ttl }));
        match self.client.send(request).await {
            Ok(_) => {}
            Err(e) if e.is_not_found() => {
                self.invalidate();
                return Err(self.not_found());
            }
            Err(e) => return Err(e.into()),
        }

        if let ClaimState::Active(snapshot) = &mut self.state {
            snapshot.ttl = ttl;
        }
        info!(queue = %self.queue, claim = %self.id, ttl, "Claim renewed");
        Ok(())
    }

    /// Release the claim, making its messages claimable again.
    ///
    /// Releasing a claim that no longer exists succeeds.
    pub async fn release(&mut self) -> Result<(), ClientError> {
        let request = TransportRequest::new(Method::Delete, self.path());
        match self.client.send(request).await {
            Ok(_) => info!(queue = %self.queue, claim = %self.id, "Claim released"),
            Err(e) if e.is_not_found() => {}
            Err(e) => return Err(e.into()),
        }
        self.state = ClaimState::Released;
        Ok(())
    }
}

#[async_trait]
impl Resource for Claim {
    type Snapshot = ClaimSnapshot;

    fn kind(&self) -> ResourceKind {
        ResourceKind::Claim
    }

    fn key(&self) -> &str {
        self.id.as_str()
    }

    fn client(&self) -> &QueueClient {
        &self.client
    }

    fn path(&self) -> String {
        format!("queues/{}/claims/{}", self.queue, self.id)
    }

    fn existence(&self) -> Existence {
        match self.state {
            ClaimState::Unloaded => Existence::Unknown,
            ClaimState::Active(_) => Existence::Present,
            ClaimState::Released => Existence::Absent,
        }
    }

    fn record_existence(&mut self, existence: Existence) {
        if existence == Existence::Absent {
            self.invalidate();
        }
    }

    fn snapshot(&self) -> Option<&ClaimSnapshot> {
        self.active()
    }

    async fn load(&mut self) -> Result<ClaimSnapshot, ClientError> {
        let request = TransportRequest::new(Method::Get, self.path());
        let response = match self.client.send(request).await {
            Ok(response) => response,
            Err(e) if e.is_not_found() => {
                self.invalidate();
                return Err(self.not_found());
            }
            Err(e) => return Err(e.into()),
        };

        let doc: ClaimDocument = response.json()?;
        let snapshot = ClaimSnapshot {
            id: self.id.clone(),
            ttl: doc.ttl,
            age: doc.age,
            grace: self.grace(),
            messages: from_documents(doc.messages)?,
            href: doc.href,
        };
        self.state = ClaimState::Active(snapshot.clone());
        Ok(snapshot)
    }
}

impl Queue {
    /// Claim up to `request.limit` messages from the queue.
    ///
    /// A queue with nothing claimable yields [`ClaimResult::Empty`].
    pub async fn claim(&mut self, request: ClaimRequest) -> Result<ClaimResult, ClientError> {
        request.validate()?;

        let mut transport_request = TransportRequest::new(Method::Post, self.child_path("claims"))
            .with_body(json!({ "ttl": request.ttl, "grace": request.grace }));
        if let Some(limit) = request.limit {
            transport_request = transport_request.with_query("limit", limit.to_string());
        }

        let response = self.client.send(transport_request).await;
        let response = self.observe(response)?;

        if response.status == 204 || !response.has_body() {
            info!(queue = %self.name, "No messages available to claim");
            return Ok(ClaimResult::Empty);
        }

        let docs: Vec<MessageDocument> = response.json()?;
        if docs.is_empty() {
            return Ok(ClaimResult::Empty);
        }
        let messages = from_documents(docs)?;

        let location = response
            .header("location")
            .ok_or_else(|| TransportError::Decode {
                message: "claim response carries no Location header".to_string(),
            })?
            .to_string();
        let id = id_from_href(&location)
            .and_then(|id| ClaimId::new(id).ok())
            .ok_or_else(|| TransportError::Decode {
                message: format!("claim location '{}' carries no id", location),
            })?;

        info!(
            queue = %self.name,
            claim = %id,
            messages = messages.len(),
            "Claim acquired"
        );

        let snapshot = ClaimSnapshot {
            id: id.clone(),
            ttl: request.ttl,
            age: 0,
            grace: Some(request.grace),
            messages,
            href: Some(location),
        };
        Ok(ClaimResult::Acquired(Claim {
            client: self.client.clone(),
            queue: self.name.clone(),
            id,
            state: ClaimState::Active(snapshot),
        }))
    }

    /// Reference an existing claim by id.
    ///
    /// Only the queue's existence is checked, so a missing queue fails with
    /// `NotFound` naming the queue. The claim itself is not fetched: load the
    /// handle before trusting its fields.
    pub async fn claim_by_id(&mut self, id: ClaimId) -> Result<Claim, ClientError> {
        self.require_exists().await?;
        Ok(Claim {
            client: self.client.clone(),
            queue: self.name.clone(),
            id,
            state: ClaimState::Unloaded,
        })
    }
}
