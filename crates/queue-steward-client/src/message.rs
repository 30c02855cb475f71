//! Message resource: posting, fetching, listing and deleting messages.

use crate::claim::ClaimId;
use crate::error::{ClientError, ResourceKind, TransportError, ValidationError};
use crate::pagination::{parse_page, Marked, Page, PageRequest, MAX_PAGE_LIMIT};
use crate::queue::Queue;
use crate::transport::{Method, TransportRequest};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::str::FromStr;
use tracing::info;

#[cfg(test)]
#[path = "message_tests.rs"]
mod tests;

/// Message identifier, scoped to its queue
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageId(String);

impl MessageId {
    pub fn new(id: impl Into<String>) -> Result<Self, ValidationError> {
        let id = id.into();
        if id.is_empty() {
            return Err(ValidationError::Required {
                field: "message_id".to_string(),
            });
        }
        Ok(Self(id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for MessageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for MessageId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl FromStr for MessageId {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

/// Extract the trailing id segment from a resource href.
///
/// `/v1/queues/q/messages/50b68a50d6f5b8c8a7c62b01?claim_id=a` yields
/// `50b68a50d6f5b8c8a7c62b01`.
pub(crate) fn id_from_href(href: &str) -> Option<&str> {
    let path = href.split(['?', '#']).next().unwrap_or(href);
    path.trim_end_matches('/')
        .rsplit('/')
        .next()
        .filter(|id| !id.is_empty())
}

/// A message as returned by the service
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Message {
    pub id: MessageId,
    pub ttl: u64,
    pub age: u64,
    pub body: Value,
    pub href: String,
}

/// Wire form of a message; the service sends no separate id field
#[derive(Debug, Deserialize)]
pub(crate) struct MessageDocument {
    href: String,
    ttl: u64,
    #[serde(default)]
    age: u64,
    #[serde(default)]
    body: Value,
}

impl TryFrom<MessageDocument> for Message {
    type Error = TransportError;

    fn try_from(doc: MessageDocument) -> Result<Self, Self::Error> {
        let id = id_from_href(&doc.href).ok_or_else(|| TransportError::Decode {
            message: format!("message href '{}' carries no id", doc.href),
        })?;
        Ok(Self {
            id: MessageId(id.to_string()),
            ttl: doc.ttl,
            age: doc.age,
            body: doc.body,
            href: doc.href,
        })
    }
}

/// Convert a batch of wire documents, failing on the first malformed one.
pub(crate) fn from_documents(docs: Vec<MessageDocument>) -> Result<Vec<Message>, TransportError> {
    docs.into_iter().map(Message::try_from).collect()
}

impl Marked for Message {
    fn marker(&self) -> &str {
        self.id.as_str()
    }
}

/// A message to be posted
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewMessage {
    ttl: u64,
    body: Value,
}

impl NewMessage {
    /// Create a message living `ttl` seconds.
    pub fn new(ttl: u64, body: Value) -> Result<Self, ValidationError> {
        if ttl == 0 {
            return Err(ValidationError::OutOfRange {
                field: "ttl".to_string(),
                message: "must be greater than zero".to_string(),
            });
        }
        Ok(Self { ttl, body })
    }

    pub fn ttl(&self) -> u64 {
        self.ttl
    }

    pub fn body(&self) -> &Value {
        &self.body
    }
}

/// Reference to a posted message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageRef(String);

impl MessageRef {
    pub fn href(&self) -> &str {
        &self.0
    }

    pub fn id(&self) -> Option<MessageId> {
        id_from_href(&self.0).map(|id| MessageId(id.to_string()))
    }
}

/// Reference document returned by a post; messages are not hydrated
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostedMessages {
    #[serde(default)]
    pub partial: bool,
    pub resources: Vec<MessageRef>,
}

impl PostedMessages {
    pub fn ids(&self) -> Vec<MessageId> {
        self.resources.iter().filter_map(MessageRef::id).collect()
    }
}

/// Parameters for [`Queue::messages`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListMessages {
    pub page: PageRequest,
    /// Include messages posted by this client
    pub echo: bool,
    /// Include messages currently held by a claim
    pub include_claimed: bool,
}

impl ListMessages {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_page(mut self, page: PageRequest) -> Self {
        self.page = page;
        self
    }

    pub fn echo(mut self, echo: bool) -> Self {
        self.echo = echo;
        self
    }

    pub fn include_claimed(mut self, include_claimed: bool) -> Self {
        self.include_claimed = include_claimed;
        self
    }
}

fn join_ids(ids: &[MessageId]) -> String {
    ids.iter().map(MessageId::as_str).collect::<Vec<_>>().join(",")
}

fn require_ids(ids: &[MessageId]) -> Result<(), ValidationError> {
    if ids.is_empty() {
        return Err(ValidationError::Required {
            field: "ids".to_string(),
        });
    }
    Ok(())
}

impl Queue {
    /// Post a batch of messages to the queue.
    ///
    /// Returns the service's reference document; `partial` is set when only
    /// some of the messages were enqueued.
    pub async fn post(&mut self, messages: Vec<NewMessage>) -> Result<PostedMessages, ClientError> {
        if messages.is_empty() {
            return Err(ValidationError::Required {
                field: "messages".to_string(),
            }
            .into());
        }

        let count = messages.len();
        let body = serde_json::to_value(&messages).map_err(TransportError::from)?;
        let request = TransportRequest::new(Method::Post, self.child_path("messages")).with_body(body);
        let response = self.client.send(request).await;
        let response = self.observe(response)?;

        let posted: PostedMessages = response.json()?;
        info!(
            queue = %self.name,
            requested = count,
            posted = posted.resources.len(),
            partial = posted.partial,
            "Messages posted"
        );
        Ok(posted)
    }

    /// Post a single message.
    pub async fn post_one(&mut self, message: NewMessage) -> Result<MessageRef, ClientError> {
        let posted = self.post(vec![message]).await?;
        posted.resources.into_iter().next().ok_or_else(|| {
            TransportError::Decode {
                message: "service accepted the post but returned no resource".to_string(),
            }
            .into()
        })
    }

    /// Fetch one message by id.
    ///
    /// The queue's existence is checked first, so a missing queue is
    /// reported as such rather than as a missing message.
    pub async fn message(&mut self, id: &MessageId) -> Result<Message, ClientError> {
        self.require_exists().await?;

        let request =
            TransportRequest::new(Method::Get, self.child_path(&format!("messages/{}", id)));
        let response = self.client.send(request).await.map_err(|e| {
            if e.is_not_found() {
                ClientError::not_found(ResourceKind::Message, id.as_str())
            } else {
                e.into()
            }
        })?;

        let doc: MessageDocument = response.json()?;
        Ok(Message::try_from(doc)?)
    }

    /// Fetch a batch of messages by id.
    ///
    /// Ids that do not resolve are silently skipped; if none resolve the
    /// whole batch is reported missing. A missing queue is reported as such.
    pub async fn messages_by_id(&mut self, ids: &[MessageId]) -> Result<Vec<Message>, ClientError> {
        require_ids(ids)?;
        self.require_exists().await?;

        let request = TransportRequest::new(Method::Get, self.child_path("messages"))
            .with_query("ids", join_ids(ids));
        let response = self.client.send(request).await.map_err(|e| {
            if e.is_not_found() {
                ClientError::batch_not_found(ids)
            } else {
                e.into()
            }
        })?;

        if !response.has_body() {
            return Ok(Vec::new());
        }
        let docs: Vec<MessageDocument> = response.json()?;
        Ok(from_documents(docs)?)
    }

    /// List one page of messages.
    pub async fn messages(&mut self, listing: ListMessages) -> Result<Page<Message>, ClientError> {
        listing.page.validate(MAX_PAGE_LIMIT)?;

        let mut request = listing
            .page
            .apply(TransportRequest::new(Method::Get, self.child_path("messages")));
        if listing.echo {
            request = request.with_query("echo", "true");
        }
        if listing.include_claimed {
            request = request.with_query("include_claimed", "true");
        }

        let response = self.client.send(request).await;
        let response = self.observe(response)?;
        let page: Page<MessageDocument> = parse_page(&response, "messages", listing.page.limit)?;

        let next_marker = page.next_marker().map(str::to_string);
        let messages = from_documents(page.into_iter().collect())?;
        Ok(Page::new(messages, next_marker, listing.page.limit))
    }

    /// Delete a batch of messages by id.
    ///
    /// Succeeds when at least one id resolved; fails naming the batch when
    /// the service reports that none did. A missing queue is reported as such.
    pub async fn delete_messages(&mut self, ids: &[MessageId]) -> Result<(), ClientError> {
        require_ids(ids)?;
        self.require_exists().await?;

        let request = TransportRequest::new(Method::Delete, self.child_path("messages"))
            .with_query("ids", join_ids(ids));
        self.client.send(request).await.map_err(|e| {
            if e.is_not_found() {
                ClientError::batch_not_found(ids)
            } else {
                ClientError::from(e)
            }
        })?;

        info!(queue = %self.name, count = ids.len(), "Messages deleted");
        Ok(())
    }

    /// Delete one message. A claimed message needs the id of the claim
    /// holding it. Deleting a missing message succeeds.
    pub async fn delete_message(
        &self,
        id: &MessageId,
        claim_id: Option<&ClaimId>,
    ) -> Result<(), ClientError> {
        let mut request =
            TransportRequest::new(Method::Delete, self.child_path(&format!("messages/{}", id)));
        if let Some(claim_id) = claim_id {
            request = request.with_query("claim_id", claim_id.as_str());
        }

        match self.client.send(request).await {
            Ok(_) => {
                info!(queue = %self.name, message = %id, "Message deleted");
                Ok(())
            }
            Err(e) if e.is_not_found() => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
