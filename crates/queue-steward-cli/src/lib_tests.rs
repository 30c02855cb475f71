//! Tests for argument parsing, error mapping and configuration loading.

use super::*;
use queue_steward_client::ValidationError;
use std::io::Write;

mod parsing {
    use super::*;

    #[test]
    fn test_global_flags_and_defaults() {
        let cli = Cli::try_parse_from(["queue-steward", "queue", "create", "fizbit"]).unwrap();
        assert_eq!(cli.format, OutputFormat::Table);
        assert_eq!(cli.log_level, "warn");
        assert!(cli.endpoint.is_none());

        match cli.command {
            Commands::Queue {
                action: QueueCommands::Create { name },
            } => assert_eq!(name, "fizbit"),
            other => panic!("Expected queue create, got: {:?}", other),
        }
    }

    #[test]
    fn test_claim_create_defaults_grace() {
        let cli = Cli::try_parse_from([
            "queue-steward",
            "--format",
            "json",
            "claim",
            "create",
            "fizbit",
            "--ttl",
            "120",
        ])
        .unwrap();
        assert_eq!(cli.format, OutputFormat::Json);

        match cli.command {
            Commands::Claim {
                action:
                    ClaimCommands::Create {
                        ttl, grace, limit, ..
                    },
            } => {
                assert_eq!(ttl, 120);
                assert_eq!(grace, 60);
                assert_eq!(limit, None);
            }
            other => panic!("Expected claim create, got: {:?}", other),
        }
    }

    #[test]
    fn test_listing_flags() {
        let cli = Cli::try_parse_from([
            "queue-steward",
            "message",
            "list",
            "fizbit",
            "--marker",
            "abc",
            "--limit",
            "5",
            "--echo",
        ])
        .unwrap();

        match cli.command {
            Commands::Message {
                action:
                    MessageCommands::List {
                        page,
                        echo,
                        include_claimed,
                        ..
                    },
            } => {
                assert_eq!(page.marker.as_deref(), Some("abc"));
                assert_eq!(page.limit, Some(5));
                assert!(echo);
                assert!(!include_claimed);
            }
            other => panic!("Expected message list, got: {:?}", other),
        }
    }

    #[test]
    fn test_malformed_json_is_rejected_by_the_parser() {
        let result = Cli::try_parse_from(["queue-steward", "message", "post", "fizbit", "{not json"]);
        let error = result.unwrap_err().to_string();
        assert!(error.contains("invalid json value"));
    }

    #[test]
    fn test_metadata_must_be_an_object() {
        let result = Cli::try_parse_from(["queue-steward", "queue", "set-metadata", "fizbit", "[1]"]);
        assert!(result.is_err());

        let cli = Cli::try_parse_from([
            "queue-steward",
            "queue",
            "set-metadata",
            "fizbit",
            r#"{"owner": "ops"}"#,
        ])
        .unwrap();
        match cli.command {
            Commands::Queue {
                action: QueueCommands::SetMetadata { metadata, .. },
            } => assert_eq!(metadata["owner"], "ops"),
            other => panic!("Expected set-metadata, got: {:?}", other),
        }
    }

    #[test]
    fn test_message_get_requires_ids() {
        assert!(Cli::try_parse_from(["queue-steward", "message", "get", "fizbit"]).is_err());
    }

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }
}

mod exit_codes {
    use super::*;
    use queue_steward_client::{ResourceKind, TransportError};

    #[test]
    fn test_each_error_kind_has_its_own_code() {
        let config = CliError::from(ConfigurationError::Missing {
            key: "endpoint".to_string(),
        });
        let not_found = CliError::from(ClientError::not_found(ResourceKind::Queue, "fizbit"));
        let invalid = CliError::from(ClientError::from(ValidationError::Required {
            field: "ids".to_string(),
        }));
        let transport = CliError::from(ClientError::from(TransportError::Timeout));
        let io = CliError::from(std::io::Error::other("closed"));

        assert_eq!(config.exit_code(), 1);
        assert_eq!(not_found.exit_code(), 2);
        assert_eq!(invalid.exit_code(), 3);
        assert_eq!(transport.exit_code(), 4);
        assert_eq!(io.exit_code(), 5);
    }

    #[test]
    fn test_not_found_message_is_flat() {
        let error = CliError::from(ClientError::not_found(ResourceKind::Queue, "fizbit"));
        assert_eq!(error.to_string(), "Queue(fizbit) does not exist");
    }
}

mod configuration {
    use super::*;

    #[test]
    fn test_flags_override_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "endpoint = \"http://from-file:8888\"").unwrap();
        writeln!(file, "client_id = \"file-client\"").unwrap();

        let path = file.path().to_string_lossy().to_string();
        let cli = Cli::try_parse_from([
            "queue-steward",
            "--config",
            path.as_str(),
            "--client-id",
            "flag-client",
            "queue",
            "list",
        ])
        .unwrap();

        let config = load_configuration(&cli).unwrap();
        assert_eq!(config.endpoint, "http://from-file:8888");
        assert_eq!(config.client_id, "flag-client");
    }

    #[test]
    fn test_explicit_missing_file_is_a_configuration_error() {
        let cli = Cli::try_parse_from([
            "queue-steward",
            "--config",
            "/definitely/not/here/config.toml",
            "queue",
            "list",
        ])
        .unwrap();

        let error = load_configuration(&cli).unwrap_err();
        assert_eq!(error.exit_code(), 1);
    }

    #[test]
    fn test_default_path_is_under_config_dir() {
        if let Some(path) = default_config_path() {
            assert!(path.ends_with("queue-steward/config.toml"));
        }
    }
}
