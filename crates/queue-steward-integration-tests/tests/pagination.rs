//! Integration tests for marker-based pagination
//!
//! These tests verify:
//! - Walking every page visits each item exactly once, in order
//! - Limits are enforced client-side before any request is sent
//! - An empty listing is a page without continuation

mod common;

use common::TestService;
use queue_steward_client::{
    ClientError, ListMessages, MessageId, Method, PageRequest, QueueListing, MAX_PAGE_LIMIT,
};
use std::collections::HashSet;

#[tokio::test]
async fn test_message_pages_are_disjoint_and_complete() {
    // Arrange
    let service = TestService::new();
    let (_, ids) = service.seeded_queue("fizbit", 25, 300).await;
    let consumer = service.peer("consumer");
    let mut queue = consumer.queue("fizbit").unwrap();

    // Act
    let mut seen: Vec<MessageId> = Vec::new();
    let mut request = PageRequest::new().with_limit(10);
    let mut pages = 0;
    loop {
        let page = queue
            .messages(ListMessages::new().with_page(request.clone()))
            .await
            .unwrap();
        if page.is_empty() {
            assert!(page.continuation().is_none());
            break;
        }
        assert!(page.len() <= 10);
        pages += 1;
        seen.extend(page.iter().map(|m| m.id.clone()));
        request = page.continuation().unwrap();
    }

    // Assert
    assert_eq!(pages, 3);
    assert_eq!(seen, ids);
    let unique: HashSet<_> = seen.iter().collect();
    assert_eq!(unique.len(), 25);
}

#[tokio::test]
async fn test_queue_pages_follow_name_order() {
    let service = TestService::new();
    let names: Vec<String> = (0..7).map(|i| format!("queue-{:02}", i)).collect();
    for name in names.iter().rev() {
        service.client.queue(name).unwrap().ensure(true).await.unwrap();
    }

    let first = service
        .client
        .queues(QueueListing::new().with_page(PageRequest::new().with_limit(5)))
        .await
        .unwrap();
    assert_eq!(first.len(), 5);
    assert_eq!(first.last_marker(), Some("queue-04"));

    let second = service
        .client
        .queues(QueueListing::new().with_page(first.continuation().unwrap()))
        .await
        .unwrap();
    let listed: Vec<&str> = first.iter().chain(second.iter()).map(|q| q.name()).collect();
    assert_eq!(listed, names.iter().map(String::as_str).collect::<Vec<_>>());
}

#[tokio::test]
async fn test_out_of_range_limits_never_reach_the_service() {
    let service = TestService::new();
    let (mut queue, _) = service.seeded_queue("fizbit", 1, 300).await;
    let before = service.transport.request_count(Method::Get);

    for limit in [0, MAX_PAGE_LIMIT + 1] {
        let listing = ListMessages::new().with_page(PageRequest::new().with_limit(limit));
        let error = queue.messages(listing).await.unwrap_err();
        assert!(matches!(error, ClientError::InvalidArgument(_)));

        let listing = QueueListing::new().with_page(PageRequest::new().with_limit(limit));
        assert!(service.client.queues(listing).await.is_err());
    }

    assert_eq!(service.transport.request_count(Method::Get), before);
}

#[tokio::test]
async fn test_empty_queue_lists_an_empty_page() {
    let service = TestService::new();
    let (mut queue, _) = service.seeded_queue("fizbit", 0, 300).await;

    let page = queue.messages(ListMessages::new()).await.unwrap();
    assert!(page.is_empty());
    assert!(page.continuation().is_none());
}
