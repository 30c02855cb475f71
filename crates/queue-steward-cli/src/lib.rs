//! # Queue Steward CLI
//!
//! Command-line interface for the hosted queueing service.
//!
//! This module provides CLI commands for:
//! - Queue management (create, delete, existence, metadata, stats, listing)
//! - Posting, listing, fetching and deleting messages
//! - Claim lifecycle (create, query, renew, release)
//! - Pool registrations
//!
//! Each subcommand maps to exactly one client operation and prints a
//! [`Listing`](output::Listing) as a table or as JSON.

pub mod commands;
pub mod output;

use clap::{CommandFactory, Parser, Subcommand};
use output::OutputFormat;
use queue_steward_client::{ClientConfig, ClientError, ConfigurationError, QueueClient};
use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing::debug;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

// ============================================================================
// CLI Structure
// ============================================================================

/// Queue Steward CLI - manage queues, messages, claims and pools
#[derive(Parser, Debug)]
#[command(name = "queue-steward")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Manage queues, messages, claims and pools on a hosted queueing service")]
pub struct Cli {
    /// Configuration file path
    #[arg(short, long, env = "QUEUE_STEWARD_CONFIG")]
    pub config: Option<PathBuf>,

    /// Service endpoint, overriding the configuration
    #[arg(long)]
    pub endpoint: Option<String>,

    /// Client identity sent with every request, overriding the configuration
    #[arg(long)]
    pub client_id: Option<String>,

    /// Logging level
    #[arg(short, long, default_value = "warn")]
    pub log_level: String,

    /// Enable JSON logging
    #[arg(long)]
    pub json_logs: bool,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Table)]
    pub format: OutputFormat,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Queue management commands
    Queue {
        #[command(subcommand)]
        action: QueueCommands,
    },

    /// Message commands
    Message {
        #[command(subcommand)]
        action: MessageCommands,
    },

    /// Claim commands
    Claim {
        #[command(subcommand)]
        action: ClaimCommands,
    },

    /// Pool registration commands
    Pool {
        #[command(subcommand)]
        action: PoolCommands,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

// ============================================================================
// Queue Commands
// ============================================================================

#[derive(Subcommand, Debug)]
pub enum QueueCommands {
    /// Create a queue (no-op if it already exists)
    Create { name: String },

    /// Delete a queue
    Delete { name: String },

    /// Check whether a queue exists
    Exists { name: String },

    /// List queues
    List {
        #[command(flatten)]
        page: PageArgs,

        /// Include each queue's metadata
        #[arg(long)]
        detailed: bool,
    },

    /// Show a queue's metadata
    GetMetadata { name: String },

    /// Replace a queue's metadata
    SetMetadata {
        name: String,

        /// Metadata as a JSON object
        #[arg(value_parser = parse_json_object)]
        metadata: serde_json::Map<String, Value>,
    },

    /// Show a queue's message counters
    Stats { name: String },
}

// ============================================================================
// Message Commands
// ============================================================================

#[derive(Subcommand, Debug)]
pub enum MessageCommands {
    /// Post messages to a queue
    Post {
        queue: String,

        /// JSON array of messages, e.g. '[{"ttl": 300, "body": {"event": "x"}}]'
        #[arg(value_parser = parse_json)]
        messages: Value,
    },

    /// List messages in a queue
    List {
        queue: String,

        #[command(flatten)]
        page: PageArgs,

        /// Include messages posted by this client
        #[arg(long)]
        echo: bool,

        /// Include messages held by a claim
        #[arg(long)]
        include_claimed: bool,
    },

    /// Fetch messages by id
    Get {
        queue: String,

        #[arg(required = true)]
        ids: Vec<String>,
    },

    /// Delete a batch of messages by id
    Delete {
        queue: String,

        #[arg(required = true)]
        ids: Vec<String>,
    },

    /// Delete a single message, optionally under a claim
    DeleteOne {
        queue: String,

        id: String,

        /// Claim holding the message
        #[arg(long)]
        claim_id: Option<String>,
    },
}

// ============================================================================
// Claim Commands
// ============================================================================

#[derive(Subcommand, Debug)]
pub enum ClaimCommands {
    /// Claim messages from a queue
    Create {
        queue: String,

        /// Claim lifetime in seconds
        #[arg(long, default_value_t = 300)]
        ttl: u64,

        /// Extra lifetime given to claimed messages, in seconds
        #[arg(long, default_value_t = 60)]
        grace: u64,

        /// Maximum number of messages to claim
        #[arg(long)]
        limit: Option<u32>,
    },

    /// Show a claim
    Query { queue: String, claim_id: String },

    /// Renew a claim
    Renew {
        queue: String,

        claim_id: String,

        /// New claim lifetime in seconds
        #[arg(long)]
        ttl: u64,
    },

    /// Release a claim
    Release { queue: String, claim_id: String },
}

// ============================================================================
// Pool Commands
// ============================================================================

#[derive(Subcommand, Debug)]
pub enum PoolCommands {
    /// Register a pool (no-op if it already exists)
    Create {
        name: String,

        /// Storage URI of the pool
        uri: String,

        /// Relative weight when placing new queues
        weight: u32,

        /// Backend options as a JSON object
        #[arg(long, value_parser = parse_json_object)]
        options: Option<serde_json::Map<String, Value>>,
    },

    /// Show a pool registration
    Get { name: String },

    /// Delete a pool registration
    Delete { name: String },

    /// List pools
    List {
        #[command(flatten)]
        page: PageArgs,

        /// Include each pool's options
        #[arg(long)]
        detailed: bool,
    },
}

/// Marker and limit flags shared by listing commands
#[derive(clap::Args, Debug, Clone, Default)]
pub struct PageArgs {
    /// Continue after this marker
    #[arg(long)]
    pub marker: Option<String>,

    /// Maximum number of items to return
    #[arg(long)]
    pub limit: Option<u32>,
}

fn parse_json(raw: &str) -> Result<Value, String> {
    serde_json::from_str(raw).map_err(|e| format!("invalid json value: '{}' ({})", raw, e))
}

fn parse_json_object(raw: &str) -> Result<serde_json::Map<String, Value>, String> {
    match parse_json(raw)? {
        Value::Object(map) => Ok(map),
        _ => Err(format!("expected a JSON object, got '{}'", raw)),
    }
}

// ============================================================================
// CLI Error Types
// ============================================================================

/// CLI-specific errors
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error("{0}")]
    Configuration(#[from] ConfigurationError),

    #[error("{0}")]
    Client(#[from] ClientError),

    #[error("Invalid argument: {arg} - {message}")]
    InvalidArgument { arg: String, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl CliError {
    /// Process exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Configuration(_) => 1,
            Self::Client(ClientError::NotFound { .. }) => 2,
            Self::Client(ClientError::InvalidArgument(_)) => 3,
            Self::InvalidArgument { .. } => 3,
            Self::Client(ClientError::Transport(_)) => 4,
            Self::Io(_) => 5,
        }
    }
}

// ============================================================================
// Main Entry Point
// ============================================================================

/// Main CLI entry point
pub async fn run_cli() -> Result<(), CliError> {
    let cli = Cli::parse();

    initialize_logging(&cli)?;

    if let Commands::Completions { shell } = cli.command {
        let mut command = Cli::command();
        clap_complete::generate(shell, &mut command, "queue-steward", &mut std::io::stdout());
        return Ok(());
    }

    let config = load_configuration(&cli)?;
    let client = QueueClient::connect(config)?;

    if let Some(listing) = commands::execute(cli.command, &client).await? {
        println!("{}", listing.render(cli.format));
    }
    Ok(())
}

/// Initialize logging based on CLI arguments.
///
/// `RUST_LOG` takes precedence over `--log-level`. Logs go to stderr so
/// command output on stdout stays parseable.
pub fn initialize_logging(cli: &Cli) -> Result<(), CliError> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&cli.log_level))
        .map_err(|e| ConfigurationError::Invalid {
            message: format!("Invalid log level '{}': {}", cli.log_level, e),
        })?;

    let registry = tracing_subscriber::registry().with(filter);
    let result = if cli.json_logs {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr),
            )
            .try_init()
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .try_init()
    };

    result.map_err(|e| {
        ConfigurationError::Invalid {
            message: format!("Failed to initialize logging: {}", e),
        }
        .into()
    })
}

/// Default configuration file location, `~/.config/queue-steward/config.toml`
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("queue-steward").join("config.toml"))
}

/// Resolve client configuration: file, then environment, then CLI flags.
///
/// An explicit `--config` file must exist; the default location is only
/// read when present.
pub fn load_configuration(cli: &Cli) -> Result<ClientConfig, CliError> {
    let path = match &cli.config {
        Some(path) => Some(path.clone()),
        None => default_config_path().filter(|path| path.is_file()),
    };
    debug!(path = ?path, "Loading configuration");

    let mut config = ClientConfig::load(path.as_deref().map(Path::new))?;
    if let Some(endpoint) = &cli.endpoint {
        config = config.with_endpoint(endpoint.clone());
    }
    if let Some(client_id) = &cli.client_id {
        config = config.with_client_id(client_id.clone());
    }

    config.validate()?;
    Ok(config)
}

#[cfg(test)]
#[path = "lib_tests.rs"]
mod tests;
