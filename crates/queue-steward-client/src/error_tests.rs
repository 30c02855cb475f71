//! Tests for error types.

use super::*;

#[test]
fn test_not_found_message_names_the_key() {
    let error = ClientError::not_found(ResourceKind::Queue, "test");
    assert_eq!(error.to_string(), "Queue(test) does not exist");
    assert!(error.is_not_found());
}

#[test]
fn test_batch_not_found_names_every_id() {
    let error = ClientError::batch_not_found(&["a1", "b2", "c3"]);
    match &error {
        ClientError::NotFound { resource, key } => {
            assert_eq!(*resource, ResourceKind::MessageBatch);
            assert_eq!(key, "a1, b2, c3");
        }
        other => panic!("Expected NotFound, got: {:?}", other),
    }
    assert_eq!(error.to_string(), "Messages(a1, b2, c3) does not exist");
}

#[test]
fn test_from_status_classification() {
    assert!(TransportError::from_status(404, "queues/x", "").is_not_found());
    assert!(matches!(
        TransportError::from_status(504, "queues/x", ""),
        TransportError::Timeout
    ));
    match TransportError::from_status(409, "queues/x", "conflict") {
        TransportError::Http { status, message } => {
            assert_eq!(status, 409);
            assert_eq!(message, "conflict");
        }
        other => panic!("Expected Http error, got: {:?}", other),
    }
}

#[test]
fn test_error_transience() {
    assert!(TransportError::Timeout.is_transient());
    assert!(TransportError::Connection {
        message: "refused".to_string()
    }
    .is_transient());
    assert!(TransportError::Http {
        status: 503,
        message: String::new()
    }
    .is_transient());
    assert!(!TransportError::Http {
        status: 400,
        message: String::new()
    }
    .is_transient());
    assert!(!ClientError::not_found(ResourceKind::Claim, "c").is_transient());
    assert!(ClientError::Transport(TransportError::Timeout).is_transient());
}

#[test]
fn test_or_not_found_translates_only_the_not_found_signal() {
    let missing: Result<(), TransportError> = Err(TransportError::NotFound {
        path: "queues/q/claims/c".to_string(),
    });
    match missing.or_not_found(ResourceKind::Claim, "c") {
        Err(ClientError::NotFound { resource, key }) => {
            assert_eq!(resource, ResourceKind::Claim);
            assert_eq!(key, "c");
        }
        other => panic!("Expected NotFound, got: {:?}", other),
    }

    let failed: Result<(), TransportError> = Err(TransportError::Http {
        status: 500,
        message: "boom".to_string(),
    });
    match failed.or_not_found(ResourceKind::Claim, "c") {
        Err(ClientError::Transport(TransportError::Http { status, .. })) => {
            assert_eq!(status, 500)
        }
        other => panic!("Expected passthrough transport error, got: {:?}", other),
    }
}

#[test]
fn test_json_error_becomes_decode_error() {
    let parse_error = serde_json::from_str::<serde_json::Value>("{not json").unwrap_err();
    let error = TransportError::from(parse_error);
    assert!(matches!(error, TransportError::Decode { .. }));
    assert!(!error.is_transient());
}
