//! # Queue Steward Client
//!
//! Client-side resource model for a hosted message-queueing service speaking
//! the v1 queue API.
//!
//! This library provides:
//! - Queue handles with an explicit auto-create policy
//! - Posting, fetching, listing and deleting messages
//! - Claims with an explicit lifecycle (acquire, query, renew, release)
//! - Pool registrations
//! - Marker/limit pagination that never fetches behind the caller's back
//!
//! ## Module Organization
//!
//! - [`client`] - The [`QueueClient`] handle every resource is built from
//! - [`resource`] - Existence memoization, snapshots and lookup outcomes
//! - [`queue`], [`message`], [`claim`], [`pool`] - The resources themselves
//! - [`pagination`] - Page requests and one-shot pages
//! - [`transport`] - The transport seam, with HTTP and in-memory adapters
//! - [`error`] - Error types for all operations
//! - [`config`] - Client configuration loading
//!
//! ## Example
//!
//! ```
//! use queue_steward_client::{ClaimRequest, NewMessage, QueueClient};
//! use serde_json::json;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), queue_steward_client::ClientError> {
//! let client = QueueClient::in_memory();
//! let mut queue = client.queue("jobs")?.ensure(true).await?;
//!
//! queue.post_one(NewMessage::new(300, json!({"task": "resize"}))?).await?;
//!
//! if let Some(mut claim) = queue.claim(ClaimRequest::new(60, 30)?).await?.into_claim() {
//!     for message in claim.messages().unwrap_or_default() {
//!         println!("working on {}", message.id);
//!     }
//!     claim.release().await?;
//! }
//! # Ok(())
//! # }
//! ```

pub mod claim;
pub mod client;
pub mod config;
pub mod error;
pub mod message;
pub mod pagination;
pub mod pool;
pub mod queue;
pub mod resource;
pub mod transport;

pub use claim::{Claim, ClaimId, ClaimRequest, ClaimResult, ClaimSnapshot, ClaimState};
pub use client::QueueClient;
pub use config::ClientConfig;
pub use error::{
    ClientError, ConfigurationError, ResourceKind, TransportError, ValidationError,
};
pub use message::{ListMessages, Message, MessageId, MessageRef, NewMessage, PostedMessages};
pub use pagination::{Page, PageRequest, MAX_PAGE_LIMIT};
pub use pool::{Pool, PoolListing, PoolName, PoolSnapshot, PoolSpec};
pub use queue::{Metadata, Queue, QueueListing, QueueName, QueueSnapshot, QueueStats};
pub use resource::{Ensured, Existence, Resource};
pub use transport::{
    HttpTransport, InMemoryTransport, Method, Transport, TransportRequest, TransportResponse,
};
