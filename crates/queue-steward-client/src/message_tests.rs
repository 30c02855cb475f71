//! Tests for message operations.

use super::*;
use crate::client::QueueClient;
use crate::config::ClientConfig;
use crate::resource::Resource;
use crate::transport::{InMemoryTransport, MockTransport};
use serde_json::json;

async fn ready_queue(client: &QueueClient, name: &str) -> Queue {
    client.queue(name).unwrap().ensure(true).await.unwrap()
}

fn messages(count: usize) -> Vec<NewMessage> {
    (0..count)
        .map(|i| NewMessage::new(300, json!({"event": "BackupStarted", "n": i})).unwrap())
        .collect()
}

mod documents {
    use super::*;

    #[test]
    fn test_id_comes_from_href() {
        assert_eq!(
            id_from_href("/v1/queues/fizbit/messages/50b68a50d6f5b8c8a7c62b01"),
            Some("50b68a50d6f5b8c8a7c62b01")
        );
        assert_eq!(
            id_from_href("/v1/queues/fizbit/messages/50b68a50d6?claim_id=a6b1"),
            Some("50b68a50d6")
        );
        assert_eq!(id_from_href(""), None);
    }

    #[test]
    fn test_message_from_document() {
        let doc: MessageDocument = serde_json::from_value(json!({
            "href": "/v1/queues/fizbit/messages/abc123",
            "ttl": 300,
            "age": 12,
            "body": {"event": "BackupStarted"}
        }))
        .unwrap();

        let message = Message::try_from(doc).unwrap();
        assert_eq!(message.id.as_str(), "abc123");
        assert_eq!(message.ttl, 300);
        assert_eq!(message.age, 12);
        assert_eq!(message.body["event"], "BackupStarted");
    }

    #[test]
    fn test_new_message_requires_positive_ttl() {
        assert!(NewMessage::new(0, json!({})).is_err());
        assert_eq!(NewMessage::new(60, json!("x")).unwrap().ttl(), 60);
    }

    #[test]
    fn test_posted_messages_ids() {
        let posted: PostedMessages = serde_json::from_value(json!({
            "partial": false,
            "resources": [
                "/v1/queues/fizbit/messages/a1",
                "/v1/queues/fizbit/messages/b2"
            ]
        }))
        .unwrap();

        let ids: Vec<String> = posted.ids().iter().map(|id| id.to_string()).collect();
        assert_eq!(ids, vec!["a1", "b2"]);
    }
}

mod posting {
    use super::*;

    #[tokio::test]
    async fn test_post_returns_references() {
        let client = QueueClient::in_memory();
        let mut queue = ready_queue(&client, "fizbit").await;

        let posted = queue.post(messages(3)).await.unwrap();
        assert!(!posted.partial);
        assert_eq!(posted.resources.len(), 3);
        assert!(posted.resources[0].href().starts_with("/v1/queues/fizbit/messages/"));
    }

    #[tokio::test]
    async fn test_post_nothing_is_invalid() {
        let mut mock = MockTransport::new();
        mock.expect_send().never();

        let client = QueueClient::new(mock, ClientConfig::default());
        let mut queue = client.queue("fizbit").unwrap();
        assert!(matches!(
            queue.post(Vec::new()).await,
            Err(ClientError::InvalidArgument(_))
        ));
    }

    #[tokio::test]
    async fn test_post_to_missing_queue_is_not_found() {
        let client = QueueClient::in_memory();
        let mut queue = client.queue("fizbit").unwrap();

        let error = queue.post(messages(1)).await.unwrap_err();
        assert_eq!(error.to_string(), "Queue(fizbit) does not exist");
    }
}

mod fetching {
    use super::*;

    #[tokio::test]
    async fn test_message_by_id() {
        let client = QueueClient::in_memory();
        let mut queue = ready_queue(&client, "fizbit").await;
        let reference = queue.post_one(messages(1).remove(0)).await.unwrap();
        let id = reference.id().unwrap();

        let message = queue.message(&id).await.unwrap();
        assert_eq!(message.id, id);
        assert_eq!(message.body["event"], "BackupStarted");
    }

    #[tokio::test]
    async fn test_missing_queue_is_reported_before_missing_message() {
        let client = QueueClient::in_memory();
        let mut queue = client.queue("fizbit").unwrap();
        let id = MessageId::new("abc").unwrap();

        match queue.message(&id).await {
            Err(ClientError::NotFound { resource, key }) => {
                assert_eq!(resource, ResourceKind::Queue);
                assert_eq!(key, "fizbit");
            }
            other => panic!("Expected queue NotFound, got: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_missing_message_is_not_found() {
        let client = QueueClient::in_memory();
        let mut queue = ready_queue(&client, "fizbit").await;
        let id = MessageId::new("abc").unwrap();

        let error = queue.message(&id).await.unwrap_err();
        assert_eq!(error.to_string(), "Message(abc) does not exist");
    }

    #[tokio::test]
    async fn test_batch_fetch_returns_what_resolved() {
        let client = QueueClient::in_memory();
        let mut queue = ready_queue(&client, "fizbit").await;
        let mut ids = queue.post(messages(2)).await.unwrap().ids();
        ids.push(MessageId::new("missing").unwrap());

        let found = queue.messages_by_id(&ids).await.unwrap();
        assert_eq!(found.len(), 2);
    }

    #[tokio::test]
    async fn test_batch_fetch_with_nothing_resolved_names_the_batch() {
        let client = QueueClient::in_memory();
        let mut queue = ready_queue(&client, "fizbit").await;
        let ids = vec![MessageId::new("a").unwrap(), MessageId::new("b").unwrap()];

        let error = queue.messages_by_id(&ids).await.unwrap_err();
        assert_eq!(error.to_string(), "Messages(a, b) does not exist");
    }

    #[tokio::test]
    async fn test_batch_fetch_needs_ids() {
        let client = QueueClient::in_memory();
        let mut queue = client.queue("fizbit").unwrap();
        assert!(matches!(
            queue.messages_by_id(&[]).await,
            Err(ClientError::InvalidArgument(_))
        ));
    }

    #[tokio::test]
    async fn test_batch_fetch_on_missing_queue_names_the_queue() {
        let client = QueueClient::in_memory();
        let mut queue = client.queue("ghost").unwrap();
        let ids = vec![MessageId::new("a").unwrap(), MessageId::new("b").unwrap()];

        let error = queue.messages_by_id(&ids).await.unwrap_err();
        assert!(matches!(
            error,
            ClientError::NotFound {
                resource: ResourceKind::Queue,
                ..
            }
        ));
        assert_eq!(error.to_string(), "Queue(ghost) does not exist");
    }
}

mod listing {
    use super::*;

    #[tokio::test]
    async fn test_pages_are_disjoint_and_cover_everything() {
        let client = QueueClient::in_memory();
        let mut queue = ready_queue(&client, "fizbit").await;
        let posted = queue.post(messages(5)).await.unwrap().ids();

        let listing = ListMessages::new()
            .echo(true)
            .with_page(PageRequest::new().with_limit(2));

        let mut seen = Vec::new();
        let mut page = queue.messages(listing.clone()).await.unwrap();
        while !page.is_empty() {
            seen.extend(page.iter().map(|m| m.id.clone()));
            let next = page.continuation().unwrap();
            page = queue
                .messages(listing.clone().with_page(next))
                .await
                .unwrap();
        }

        assert_eq!(seen, posted);
    }

    #[tokio::test]
    async fn test_own_messages_are_hidden_without_echo() {
        let client = QueueClient::in_memory();
        let mut queue = ready_queue(&client, "fizbit").await;
        queue.post(messages(2)).await.unwrap();

        let page = queue.messages(ListMessages::new()).await.unwrap();
        assert!(page.is_empty());
    }

    #[tokio::test]
    async fn test_other_clients_see_messages() {
        let transport = InMemoryTransport::new();
        let producer = QueueClient::new(transport.clone(), ClientConfig::default());
        let consumer = QueueClient::new(transport, ClientConfig::default());

        let mut queue = ready_queue(&producer, "fizbit").await;
        queue.post(messages(2)).await.unwrap();

        let mut view = consumer.queue("fizbit").unwrap();
        let page = view.messages(ListMessages::new()).await.unwrap();
        assert_eq!(page.len(), 2);
    }

    #[tokio::test]
    async fn test_limit_is_validated() {
        let client = QueueClient::in_memory();
        let mut queue = client.queue("fizbit").unwrap();
        let listing = ListMessages::new().with_page(PageRequest::new().with_limit(0));
        assert!(matches!(
            queue.messages(listing).await,
            Err(ClientError::InvalidArgument(_))
        ));
    }
}

mod deletion {
    use super::*;

    #[tokio::test]
    async fn test_partial_batch_delete_succeeds() {
        let client = QueueClient::in_memory();
        let mut queue = ready_queue(&client, "fizbit").await;
        let mut ids = queue.post(messages(1)).await.unwrap().ids();
        ids.push(MessageId::new("missing").unwrap());

        queue.delete_messages(&ids).await.unwrap();
    }

    #[tokio::test]
    async fn test_batch_delete_with_nothing_resolved_names_the_batch() {
        let client = QueueClient::in_memory();
        let mut queue = ready_queue(&client, "fizbit").await;
        let ids = vec![MessageId::new("x1").unwrap(), MessageId::new("y2").unwrap()];

        let error = queue.delete_messages(&ids).await.unwrap_err();
        assert_eq!(error.to_string(), "Messages(x1, y2) does not exist");
    }

    #[tokio::test]
    async fn test_batch_delete_on_missing_queue_names_the_queue() {
        let client = QueueClient::in_memory();
        let mut queue = client.queue("ghost").unwrap();
        let ids = vec![MessageId::new("a").unwrap()];

        let error = queue.delete_messages(&ids).await.unwrap_err();
        assert!(matches!(
            error,
            ClientError::NotFound {
                resource: ResourceKind::Queue,
                ..
            }
        ));
        assert!(!queue.exists().await.unwrap());
    }

    #[tokio::test]
    async fn test_single_delete_is_idempotent() {
        let client = QueueClient::in_memory();
        let mut queue = ready_queue(&client, "fizbit").await;
        let id = queue.post_one(messages(1).remove(0)).await.unwrap().id().unwrap();

        queue.delete_message(&id, None).await.unwrap();
        queue.delete_message(&id, None).await.unwrap();
        assert!(queue.message(&id).await.unwrap_err().is_not_found());
    }
}
