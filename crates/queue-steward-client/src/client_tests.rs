//! Tests for the client handle.

use super::*;
use crate::pagination::PageRequest;
use crate::resource::Resource;
use crate::transport::MockTransport;
use serde_json::json;

fn memory_client() -> (QueueClient, InMemoryTransport) {
    let transport = InMemoryTransport::new();
    let client = QueueClient::new(transport.clone(), ClientConfig::default());
    (client, transport)
}

mod construction {
    use super::*;

    #[test]
    fn test_connect_rejects_invalid_configuration() {
        let config = ClientConfig::default().with_endpoint("");
        assert!(QueueClient::connect(config).is_err());
    }

    #[test]
    fn test_connect_with_defaults() {
        let client = QueueClient::connect(ClientConfig::default()).unwrap();
        assert_eq!(client.config().api_version, "v1");
    }

    #[test]
    fn test_queue_handle_validates_name() {
        let client = QueueClient::in_memory();
        assert!(client.queue("fizbit").is_ok());
        assert!(matches!(
            client.queue("not a name"),
            Err(ClientError::InvalidArgument(_))
        ));
        assert!(matches!(
            client.pool(""),
            Err(ClientError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_debug_hides_transport() {
        let client = QueueClient::in_memory();
        let rendered = format!("{:?}", client);
        assert!(rendered.contains("QueueClient"));
        assert!(rendered.contains("<Transport>"));
    }
}

mod requests {
    use super::*;

    #[tokio::test]
    async fn test_every_request_carries_the_client_id() {
        let (client, transport) = memory_client();
        let client_id = client.config().client_id.clone();

        client.queue("fizbit").unwrap().ensure(true).await.unwrap();

        let requests = transport.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].header(CLIENT_ID_HEADER), Some(client_id.as_str()));
    }

    #[tokio::test]
    async fn test_send_passes_transport_errors_through() {
        let mut mock = MockTransport::new();
        mock.expect_send()
            .returning(|_| Err(TransportError::Timeout));

        let client = QueueClient::new(mock, ClientConfig::default());
        let result = client.queues(QueueListing::new()).await;

        assert!(matches!(
            result,
            Err(ClientError::Transport(TransportError::Timeout))
        ));
    }
}

mod queue_listing {
    use super::*;

    #[tokio::test]
    async fn test_empty_service_lists_nothing() {
        let (client, _) = memory_client();
        let page = client.queues(QueueListing::new()).await.unwrap();
        assert!(page.is_empty());
        assert!(page.continuation().is_none());
    }

    #[tokio::test]
    async fn test_listed_queues_are_known_to_exist() {
        let (client, transport) = memory_client();
        for name in ["alpha", "beta"] {
            client.queue(name).unwrap().ensure(true).await.unwrap();
        }
        let before = transport.requests().len();

        let page = client.queues(QueueListing::new()).await.unwrap();
        let names: Vec<&str> = page.iter().map(Queue::name).collect();
        assert_eq!(names, vec!["alpha", "beta"]);

        let mut first = page.into_iter().next().unwrap();
        assert!(first.exists().await.unwrap());
        assert_eq!(transport.requests().len(), before + 1);
    }

    #[tokio::test]
    async fn test_detailed_listing_carries_metadata() {
        let (client, _) = memory_client();
        let mut queue = client.queue("alpha").unwrap().ensure(true).await.unwrap();
        let mut metadata = crate::queue::Metadata::new();
        metadata.insert("owner".to_string(), json!("ops"));
        queue.set_metadata(metadata).await.unwrap();

        let plain = client.queues(QueueListing::new()).await.unwrap();
        assert!(plain.items()[0].snapshot().is_none());

        let detailed = client
            .queues(QueueListing::new().detailed(true))
            .await
            .unwrap();
        let snapshot = detailed.items()[0].snapshot().unwrap();
        assert_eq!(snapshot.metadata["owner"], "ops");
    }

    #[tokio::test]
    async fn test_listed_names_are_not_revalidated() {
        let long_name = "q".repeat(80);
        let listed = long_name.clone();
        let mut mock = MockTransport::new();
        mock.expect_send().times(1).returning(move |_| {
            Ok(TransportResponse::new(200).with_body(json!({
                "queues": [{"name": "alpha"}, {"name": listed.clone()}],
                "links": []
            })))
        });

        let client = QueueClient::new(mock, ClientConfig::default());
        let page = client.queues(QueueListing::new()).await.unwrap();

        let names: Vec<&str> = page.iter().map(Queue::name).collect();
        assert_eq!(names, vec!["alpha", long_name.as_str()]);
        assert!(client.queue(&long_name).is_err());
    }

    #[tokio::test]
    async fn test_limit_is_validated_before_sending() {
        let mut mock = MockTransport::new();
        mock.expect_send().never();

        let client = QueueClient::new(mock, ClientConfig::default());
        let listing = QueueListing::new().with_page(PageRequest::new().with_limit(21));

        assert!(matches!(
            client.queues(listing).await,
            Err(ClientError::InvalidArgument(_))
        ));
    }
}

mod pool_listing {
    use super::*;
    use crate::pool::PoolSpec;

    #[tokio::test]
    async fn test_pools_are_listed_with_registration() {
        let (client, _) = memory_client();
        let spec = PoolSpec::new(10, "mongodb://db1:27017").unwrap();
        client.pool("east").unwrap().ensure(&spec).await.unwrap();

        let page = client.pools(PoolListing::new()).await.unwrap();
        assert_eq!(page.len(), 1);
        let snapshot = page.items()[0].snapshot().unwrap();
        assert_eq!(snapshot.name, "east");
        assert_eq!(snapshot.weight, 10);
        assert_eq!(snapshot.uri, "mongodb://db1:27017");
    }
}
