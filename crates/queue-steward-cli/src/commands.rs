//! Command execution.
//!
//! Each subcommand maps to one client operation. Domain faults are returned
//! unchanged for `main` to report; nothing is retried.

use crate::output::Listing;
use crate::{ClaimCommands, CliError, Commands, MessageCommands, PageArgs, PoolCommands, QueueCommands};
use queue_steward_client::{
    ClaimId, ClaimRequest, ClaimResult, ClientError, ListMessages, Message, MessageId, NewMessage,
    PageRequest, Pool, PoolListing, PoolSpec, QueueClient, QueueListing, Resource,
};
use serde_json::{json, Value};
use tracing::info;

#[cfg(test)]
#[path = "commands_tests.rs"]
mod tests;

const MESSAGE_COLUMNS: &[&str] = &["ID", "TTL", "Age"];
const MESSAGE_DETAIL_COLUMNS: &[&str] = &["ID", "TTL", "Age", "Body", "Href"];
const CLAIM_COLUMNS: &[&str] = &["id", "ttl", "age"];
const CLAIM_QUERY_COLUMNS: &[&str] = &["id", "ttl", "age", "messages"];
const POOL_COLUMNS: &[&str] = &["name", "weight", "uri", "options"];

/// Execute a parsed command against the client.
///
/// Returns the listing to print, or `None` for commands with no output.
pub async fn execute(command: Commands, client: &QueueClient) -> Result<Option<Listing>, CliError> {
    match command {
        Commands::Queue { action } => execute_queue_command(action, client).await,
        Commands::Message { action } => execute_message_command(action, client).await,
        Commands::Claim { action } => execute_claim_command(action, client).await,
        Commands::Pool { action } => execute_pool_command(action, client).await,
        Commands::Completions { .. } => Ok(None),
    }
}

impl From<PageArgs> for PageRequest {
    fn from(args: PageArgs) -> Self {
        let mut page = PageRequest::new();
        if let Some(marker) = args.marker {
            page = page.with_marker(marker);
        }
        if let Some(limit) = args.limit {
            page = page.with_limit(limit);
        }
        page
    }
}

fn message_ids(ids: Vec<String>) -> Result<Vec<MessageId>, ClientError> {
    ids.into_iter()
        .map(|id| MessageId::new(id).map_err(ClientError::from))
        .collect()
}

fn claim_id(raw: String) -> Result<ClaimId, ClientError> {
    Ok(ClaimId::new(raw)?)
}

fn message_row(message: &Message) -> Vec<Value> {
    vec![
        json!(message.id.as_str()),
        json!(message.ttl),
        json!(message.age),
    ]
}

// ============================================================================
// Queues
// ============================================================================

async fn execute_queue_command(
    action: QueueCommands,
    client: &QueueClient,
) -> Result<Option<Listing>, CliError> {
    match action {
        QueueCommands::Create { name } => {
            let outcome = client.queue(&name)?.lookup(true).await?;
            info!(queue = %name, created = outcome.was_created(), "Queue ensured");
            Ok(Some(Listing::new(&["Name"]).with_row(vec![json!(name)])))
        }
        QueueCommands::Delete { name } => {
            client.queue(&name)?.delete().await?;
            Ok(None)
        }
        QueueCommands::Exists { name } => {
            let exists = client.queue(&name)?.exists().await?;
            Ok(Some(Listing::new(&["Exists"]).with_row(vec![json!(exists)])))
        }
        QueueCommands::List { page, detailed } => {
            let listing = QueueListing::new()
                .with_page(page.into())
                .detailed(detailed);
            let queues = client.queues(listing).await?;

            let columns: &[&'static str] = if detailed {
                &["Name", "Metadata"]
            } else {
                &["Name"]
            };
            let mut output = Listing::new(columns);
            for queue in &queues {
                let mut row = vec![json!(queue.name())];
                if detailed {
                    let metadata = queue
                        .snapshot()
                        .map(|s| Value::Object(s.metadata.clone()))
                        .unwrap_or_else(|| json!({}));
                    row.push(metadata);
                }
                output.push(row);
            }
            Ok(Some(output))
        }
        QueueCommands::GetMetadata { name } => {
            let metadata = client.queue(&name)?.metadata().await?;
            Ok(Some(
                Listing::new(&["Metadata"]).with_row(vec![Value::Object(metadata)]),
            ))
        }
        QueueCommands::SetMetadata { name, metadata } => {
            client.queue(&name)?.set_metadata(metadata).await?;
            Ok(None)
        }
        QueueCommands::Stats { name } => {
            let stats = client.queue(&name)?.stats().await?;
            let stats = serde_json::to_value(&stats.messages).unwrap_or(Value::Null);
            Ok(Some(Listing::new(&["Stats"]).with_row(vec![stats])))
        }
    }
}

// ============================================================================
// Messages
// ============================================================================

/// Build messages from a JSON array of `{"ttl": .., "body": ..}` objects.
fn new_messages(raw: Value) -> Result<Vec<NewMessage>, CliError> {
    let invalid = |message: String| CliError::InvalidArgument {
        arg: "messages".to_string(),
        message,
    };

    let items = match raw {
        Value::Array(items) => items,
        other => return Err(invalid(format!("expected a JSON array, got {}", other))),
    };

    items
        .into_iter()
        .map(|item| {
            let ttl = item
                .get("ttl")
                .and_then(Value::as_u64)
                .ok_or_else(|| invalid(format!("message {} has no positive 'ttl'", item)))?;
            let body = item.get("body").cloned().unwrap_or(Value::Null);
            NewMessage::new(ttl, body).map_err(|e| invalid(e.to_string()))
        })
        .collect()
}

async fn execute_message_command(
    action: MessageCommands,
    client: &QueueClient,
) -> Result<Option<Listing>, CliError> {
    match action {
        MessageCommands::Post { queue, messages } => {
            let messages = new_messages(messages)?;
            let posted = client.queue(&queue)?.post(messages).await?;

            let mut output = Listing::new(&["Resources"]);
            for resource in &posted.resources {
                output.push(vec![json!(resource.href())]);
            }
            Ok(Some(output))
        }
        MessageCommands::List {
            queue,
            page,
            echo,
            include_claimed,
        } => {
            let listing = ListMessages::new()
                .with_page(page.into())
                .echo(echo)
                .include_claimed(include_claimed);
            let messages = client.queue(&queue)?.messages(listing).await?;

            let mut output = Listing::new(MESSAGE_COLUMNS);
            for message in &messages {
                output.push(message_row(message));
            }
            Ok(Some(output))
        }
        MessageCommands::Get { queue, ids } => {
            let ids = message_ids(ids)?;
            let messages = client.queue(&queue)?.messages_by_id(&ids).await?;

            let mut output = Listing::new(MESSAGE_DETAIL_COLUMNS);
            for message in messages {
                let mut row = message_row(&message);
                row.push(message.body);
                row.push(json!(message.href));
                output.push(row);
            }
            Ok(Some(output))
        }
        MessageCommands::Delete { queue, ids } => {
            let ids = message_ids(ids)?;
            client.queue(&queue)?.delete_messages(&ids).await?;
            Ok(None)
        }
        MessageCommands::DeleteOne {
            queue,
            id,
            claim_id: claim,
        } => {
            let id = message_ids(vec![id])?.remove(0);
            let claim = claim.map(claim_id).transpose()?;
            client
                .queue(&queue)?
                .delete_message(&id, claim.as_ref())
                .await?;
            Ok(None)
        }
    }
}

// ============================================================================
// Claims
// ============================================================================

async fn execute_claim_command(
    action: ClaimCommands,
    client: &QueueClient,
) -> Result<Option<Listing>, CliError> {
    match action {
        ClaimCommands::Create {
            queue,
            ttl,
            grace,
            limit,
        } => {
            let mut request = ClaimRequest::new(ttl, grace).map_err(ClientError::from)?;
            if let Some(limit) = limit {
                request = request.with_limit(limit);
            }

            let mut output = Listing::new(CLAIM_COLUMNS);
            if let ClaimResult::Acquired(claim) = client.queue(&queue)?.claim(request).await? {
                output.push(vec![
                    json!(claim.id().as_str()),
                    json!(claim.ttl()),
                    json!(claim.age()),
                ]);
            }
            Ok(Some(output))
        }
        ClaimCommands::Query { queue, claim_id: id } => {
            let mut claim = client
                .queue(&queue)?
                .claim_by_id(claim_id(id)?)
                .await?;
            let snapshot = claim.load().await?;

            let messages: Vec<Value> = snapshot
                .messages
                .iter()
                .map(|m| json!({"id": m.id.as_str(), "ttl": m.ttl, "age": m.age, "body": m.body}))
                .collect();
            Ok(Some(Listing::new(CLAIM_QUERY_COLUMNS).with_row(vec![
                json!(snapshot.id.as_str()),
                json!(snapshot.ttl),
                json!(snapshot.age),
                Value::Array(messages),
            ])))
        }
        ClaimCommands::Renew {
            queue,
            claim_id: id,
            ttl,
        } => {
            let mut claim = client
                .queue(&queue)?
                .claim_by_id(claim_id(id)?)
                .await?;
            claim.update(ttl).await?;
            Ok(None)
        }
        ClaimCommands::Release { queue, claim_id: id } => {
            let mut claim = client
                .queue(&queue)?
                .claim_by_id(claim_id(id)?)
                .await?;
            claim.release().await?;
            Ok(None)
        }
    }
}

// ============================================================================
// Pools
// ============================================================================

fn pool_row(pool: &Pool) -> Vec<Value> {
    match pool.snapshot() {
        Some(snapshot) => vec![
            json!(snapshot.name),
            json!(snapshot.weight),
            json!(snapshot.uri),
            Value::Object(snapshot.options.clone()),
        ],
        None => vec![json!(pool.name()), Value::Null, Value::Null, Value::Null],
    }
}

async fn execute_pool_command(
    action: PoolCommands,
    client: &QueueClient,
) -> Result<Option<Listing>, CliError> {
    match action {
        PoolCommands::Create {
            name,
            uri,
            weight,
            options,
        } => {
            let mut spec = PoolSpec::new(weight, uri).map_err(ClientError::from)?;
            if let Some(options) = options {
                spec = spec.with_options(options);
            }

            let pool = client.pool(&name)?.ensure(&spec).await?;
            Ok(Some(Listing::new(POOL_COLUMNS).with_row(vec![
                json!(pool.name()),
                json!(spec.weight()),
                json!(spec.uri()),
                Value::Object(spec.options().clone()),
            ])))
        }
        PoolCommands::Get { name } => {
            let mut pool = client.pool(&name)?;
            pool.load().await?;
            Ok(Some(Listing::new(POOL_COLUMNS).with_row(pool_row(&pool))))
        }
        PoolCommands::Delete { name } => {
            client.pool(&name)?.delete().await?;
            Ok(None)
        }
        PoolCommands::List { page, detailed } => {
            let listing = PoolListing::new()
                .with_page(page.into())
                .detailed(detailed);
            let pools = client.pools(listing).await?;

            let mut output = Listing::new(POOL_COLUMNS);
            for pool in &pools {
                output.push(pool_row(pool));
            }
            Ok(Some(output))
        }
    }
}
