//! Common test utilities for queue-steward-client integration tests
//!
//! This module provides:
//! - Clients wired to an in-memory service whose clock tests can advance
//! - Helpers for seeding queues with messages

use queue_steward_client::{
    ClientConfig, InMemoryTransport, MessageId, NewMessage, Queue, QueueClient,
};
use serde_json::json;

/// A client plus the in-memory service behind it
pub struct TestService {
    pub client: QueueClient,
    pub transport: InMemoryTransport,
}

impl TestService {
    pub fn new() -> Self {
        Self::with_client_id("integration-test")
    }

    pub fn with_client_id(client_id: &str) -> Self {
        let transport = InMemoryTransport::new();
        let client = QueueClient::new(
            transport.clone(),
            ClientConfig::default().with_client_id(client_id),
        );
        Self { client, transport }
    }

    /// A second client with its own identity talking to the same service
    #[allow(dead_code)]
    pub fn peer(&self, client_id: &str) -> QueueClient {
        QueueClient::new(
            self.transport.clone(),
            ClientConfig::default().with_client_id(client_id),
        )
    }

    /// Move the service clock forward.
    #[allow(dead_code)]
    pub fn advance_seconds(&self, seconds: i64) {
        self.transport.advance(chrono::Duration::seconds(seconds));
    }

    /// Create `name` and post `count` messages numbered from zero.
    #[allow(dead_code)]
    pub async fn seeded_queue(&self, name: &str, count: usize, ttl: u64) -> (Queue, Vec<MessageId>) {
        let mut queue = self
            .client
            .queue(name)
            .unwrap()
            .ensure(true)
            .await
            .unwrap();

        if count == 0 {
            return (queue, Vec::new());
        }

        let messages = (0..count)
            .map(|i| NewMessage::new(ttl, json!({ "seq": i })).unwrap())
            .collect();
        let posted = queue.post(messages).await.unwrap();
        let ids = posted.ids();
        assert_eq!(ids.len(), count);

        (queue, ids)
    }
}
