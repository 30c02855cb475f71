//! In-memory transport emulating the queue service for testing and development.
//!
//! The emulation follows the v1 REST semantics the resource layer relies on:
//! - Create-or-no-op `PUT` for queues and pools (201 created, 204 existing)
//! - Marker/limit listings that answer 204 when nothing is left
//! - Echo filtering by the `Client-ID` header
//! - Claims that expire after their ttl and extend claimed messages by grace
//! - Batch fetch and delete that answer 404 only when no id resolved
//!
//! Time can be moved forward with [`InMemoryTransport::advance`] so expiry can
//! be tested without sleeping. Every request is recorded and can be inspected
//! with [`InMemoryTransport::requests`].

use super::{Method, Transport, TransportRequest, TransportResponse, CLIENT_ID_HEADER};
use crate::error::TransportError;
use crate::pagination::MAX_PAGE_LIMIT;
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};

#[cfg(test)]
#[path = "memory_tests.rs"]
mod tests;

const DEFAULT_LIMIT: u32 = 10;

// ============================================================================
// Internal Storage Structures
// ============================================================================

struct StoredMessage {
    ttl: u64,
    body: Value,
    created: DateTime<Utc>,
    expires: DateTime<Utc>,
    client_id: Option<String>,
    claim: Option<String>,
}

struct StoredClaim {
    ttl: u64,
    grace: u64,
    created: DateTime<Utc>,
    expires: DateTime<Utc>,
}

#[derive(Default)]
struct StoredQueue {
    metadata: Map<String, Value>,
    /// Keyed by id; ids sort in posting order
    messages: BTreeMap<String, StoredMessage>,
    claims: BTreeMap<String, StoredClaim>,
}

impl StoredQueue {
    /// Drop expired claims and messages as of `now`.
    fn expire(&mut self, now: DateTime<Utc>) {
        self.claims.retain(|_, claim| claim.expires > now);
        self.messages.retain(|_, message| message.expires > now);

        let claims = &self.claims;
        for message in self.messages.values_mut() {
            if let Some(claim_id) = &message.claim {
                if !claims.contains_key(claim_id) {
                    message.claim = None;
                }
            }
        }
    }

    fn claimed_ids(&self, claim_id: &str) -> Vec<String> {
        self.messages
            .iter()
            .filter(|(_, m)| m.claim.as_deref() == Some(claim_id))
            .map(|(id, _)| id.clone())
            .collect()
    }
}

struct StoredPool {
    weight: u64,
    uri: String,
    options: Map<String, Value>,
}

struct ServiceState {
    queues: BTreeMap<String, StoredQueue>,
    pools: BTreeMap<String, StoredPool>,
    next_id: u64,
    clock_offset: Duration,
    requests: Vec<TransportRequest>,
}

impl Default for ServiceState {
    fn default() -> Self {
        Self {
            queues: BTreeMap::new(),
            pools: BTreeMap::new(),
            next_id: 0,
            clock_offset: Duration::zero(),
            requests: Vec::new(),
        }
    }
}

impl ServiceState {
    fn now(&self) -> DateTime<Utc> {
        Utc::now() + self.clock_offset
    }

    /// Ids are fixed-width hex so lexical order matches creation order.
    fn allocate_id(&mut self) -> String {
        self.next_id += 1;
        format!("{:024x}", self.next_id)
    }

    fn queue_mut(&mut self, name: &str, path: &str) -> Result<&mut StoredQueue, TransportError> {
        self.queues.get_mut(name).ok_or_else(|| not_found(path))
    }
}

// ============================================================================
// Helpers
// ============================================================================

fn not_found(path: &str) -> TransportError {
    TransportError::NotFound {
        path: path.to_string(),
    }
}

fn bad_request(message: impl Into<String>) -> TransportError {
    TransportError::Http {
        status: 400,
        message: message.into(),
    }
}

fn no_content() -> TransportResponse {
    TransportResponse::new(204)
}

fn ok(body: Value) -> TransportResponse {
    TransportResponse::new(200).with_body(body)
}

fn age_of(created: DateTime<Utc>, now: DateTime<Utc>) -> u64 {
    (now - created).num_seconds().max(0) as u64
}

/// Lifetimes beyond ten years are treated as ten years.
fn seconds(value: u64) -> Duration {
    const CAP: u64 = 10 * 365 * 24 * 60 * 60;
    Duration::seconds(value.min(CAP) as i64)
}

fn flag(request: &TransportRequest, name: &str) -> bool {
    request
        .query_param(name)
        .map(|v| v.eq_ignore_ascii_case("true"))
        .unwrap_or(false)
}

fn page_limit(request: &TransportRequest) -> Result<usize, TransportError> {
    let limit = match request.query_param("limit") {
        Some(raw) => raw
            .parse::<u32>()
            .map_err(|_| bad_request(format!("limit '{}' is not a number", raw)))?,
        None => DEFAULT_LIMIT,
    };
    if limit == 0 || limit > MAX_PAGE_LIMIT {
        return Err(bad_request(format!(
            "limit must be between 1 and {}",
            MAX_PAGE_LIMIT
        )));
    }
    Ok(limit as usize)
}

fn id_list(request: &TransportRequest) -> Option<Vec<String>> {
    request.query_param("ids").map(|ids| {
        ids.split(',')
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .map(str::to_string)
            .collect()
    })
}

fn positive_field(body: &Value, field: &str) -> Result<u64, TransportError> {
    match body.get(field).and_then(Value::as_u64) {
        Some(value) if value > 0 => Ok(value),
        _ => Err(bad_request(format!("'{}' must be a positive integer", field))),
    }
}

fn listing(field: &str, items: Vec<Value>, next_href: String) -> TransportResponse {
    let mut body = Map::new();
    body.insert(field.to_string(), Value::Array(items));
    body.insert(
        "links".to_string(),
        json!([{"rel": "next", "href": next_href}]),
    );
    ok(Value::Object(body))
}

fn message_href(queue: &str, id: &str) -> String {
    format!("/v1/queues/{}/messages/{}", queue, id)
}

fn message_document(queue: &str, id: &str, message: &StoredMessage, now: DateTime<Utc>) -> Value {
    json!({
        "href": message_href(queue, id),
        "ttl": message.ttl,
        "age": age_of(message.created, now),
        "body": message.body,
    })
}

// ============================================================================
// InMemoryTransport
// ============================================================================

/// Transport backed by an in-process emulation of the queue service.
///
/// Clones share the same state.
#[derive(Clone, Default)]
pub struct InMemoryTransport {
    state: Arc<RwLock<ServiceState>>,
}

impl InMemoryTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Move the emulated clock forward.
    pub fn advance(&self, by: Duration) {
        if let Ok(mut state) = self.state.write() {
            state.clock_offset = state.clock_offset + by;
        }
    }

    /// Every request received so far, in arrival order
    pub fn requests(&self) -> Vec<TransportRequest> {
        self.state
            .read()
            .map(|state| state.requests.clone())
            .unwrap_or_default()
    }

    /// Number of requests received with the given method
    pub fn request_count(&self, method: Method) -> usize {
        self.requests()
            .iter()
            .filter(|r| r.method == method)
            .count()
    }

    fn handle(
        state: &mut ServiceState,
        request: &TransportRequest,
    ) -> Result<TransportResponse, TransportError> {
        let now = state.now();
        for queue in state.queues.values_mut() {
            queue.expire(now);
        }

        let segments: Vec<&str> = request.path.split('/').filter(|s| !s.is_empty()).collect();
        let response = match (request.method, segments.as_slice()) {
            (Method::Get, ["queues"]) => list_queues(state, request),
            (Method::Put, ["queues", name]) => Ok(create_queue(state, name)),
            (Method::Get, ["queues", name]) => {
                state.queue_mut(name, &request.path)?;
                Ok(no_content())
            }
            (Method::Delete, ["queues", name]) => {
                state.queues.remove(*name);
                Ok(no_content())
            }
            (Method::Get, ["queues", name, "metadata"]) => {
                let queue = state.queue_mut(name, &request.path)?;
                Ok(ok(Value::Object(queue.metadata.clone())))
            }
            (Method::Put, ["queues", name, "metadata"]) => {
                let metadata = match &request.body {
                    Some(Value::Object(metadata)) => metadata.clone(),
                    _ => return Err(bad_request("metadata must be a JSON object")),
                };
                state.queue_mut(name, &request.path)?.metadata = metadata;
                Ok(no_content())
            }
            (Method::Get, ["queues", name, "stats"]) => stats(state, name, request, now),
            (Method::Post, ["queues", name, "messages"]) => post_messages(state, name, request, now),
            (Method::Get, ["queues", name, "messages"]) => match id_list(request) {
                Some(ids) => get_messages_by_id(state, name, &ids, request, now),
                None => list_messages(state, name, request, now),
            },
            (Method::Delete, ["queues", name, "messages"]) => {
                let ids = id_list(request).ok_or_else(|| bad_request("'ids' is required"))?;
                delete_messages_by_id(state, name, &ids, request)
            }
            (Method::Get, ["queues", name, "messages", id]) => {
                let queue = state.queue_mut(name, &request.path)?;
                let message = queue.messages.get(*id).ok_or_else(|| not_found(&request.path))?;
                Ok(ok(message_document(name, id, message, now)))
            }
            (Method::Delete, ["queues", name, "messages", id]) => {
                delete_message(state, name, id, request)
            }
            (Method::Post, ["queues", name, "claims"]) => create_claim(state, name, request, now),
            (Method::Get, ["queues", name, "claims", id]) => get_claim(state, name, id, request, now),
            (Method::Patch, ["queues", name, "claims", id]) => {
                update_claim(state, name, id, request, now)
            }
            (Method::Delete, ["queues", name, "claims", id]) => {
                let queue = state.queue_mut(name, &request.path)?;
                queue
                    .claims
                    .remove(*id)
                    .ok_or_else(|| not_found(&request.path))?;
                for message in queue.messages.values_mut() {
                    if message.claim.as_deref() == Some(*id) {
                        message.claim = None;
                    }
                }
                Ok(no_content())
            }
            (Method::Get, ["pools"]) => list_pools(state, request),
            (Method::Put, ["pools", name]) => create_pool(state, name, request),
            (Method::Get, ["pools", name]) => {
                let pool = state.pools.get(*name).ok_or_else(|| not_found(&request.path))?;
                Ok(ok(json!({
                    "name": name,
                    "weight": pool.weight,
                    "uri": pool.uri,
                    "options": pool.options,
                })))
            }
            (Method::Delete, ["pools", name]) => {
                state.pools.remove(*name);
                Ok(no_content())
            }
            (_, [_, ..]) if is_known_path(&segments) => Err(TransportError::Http {
                status: 405,
                message: format!("{} not allowed on {}", request.method, request.path),
            }),
            _ => Err(not_found(&request.path)),
        }?;

        Ok(response)
    }
}

fn is_known_path(segments: &[&str]) -> bool {
    matches!(
        segments,
        ["queues"]
            | ["queues", _]
            | ["queues", _, "metadata" | "stats" | "messages" | "claims"]
            | ["queues", _, "messages" | "claims", _]
            | ["pools"]
            | ["pools", _]
    )
}

#[async_trait]
impl Transport for InMemoryTransport {
    async fn send(&self, request: TransportRequest) -> Result<TransportResponse, TransportError> {
        let mut state = self.state.write().map_err(|_| TransportError::Connection {
            message: "in-memory service state is poisoned".to_string(),
        })?;
        state.requests.push(request.clone());
        Self::handle(&mut state, &request)
    }
}

impl std::fmt::Debug for InMemoryTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryTransport").finish_non_exhaustive()
    }
}

// ============================================================================
// Queues
// ============================================================================

fn create_queue(state: &mut ServiceState, name: &str) -> TransportResponse {
    if state.queues.contains_key(name) {
        return no_content();
    }
    state.queues.insert(name.to_string(), StoredQueue::default());
    TransportResponse::new(201).with_header("location", format!("/v1/queues/{}", name))
}

fn list_queues(
    state: &ServiceState,
    request: &TransportRequest,
) -> Result<TransportResponse, TransportError> {
    let limit = page_limit(request)?;
    let detailed = flag(request, "detailed");
    let marker = request.query_param("marker").unwrap_or("");

    let items: Vec<Value> = state
        .queues
        .iter()
        .filter(|(name, _)| name.as_str() > marker)
        .take(limit)
        .map(|(name, queue)| {
            let mut item = json!({
                "name": name,
                "href": format!("/v1/queues/{}", name),
            });
            if detailed {
                item["metadata"] = Value::Object(queue.metadata.clone());
            }
            item
        })
        .collect();

    let last = match items.last().and_then(|item| item["name"].as_str()) {
        Some(last) => last.to_string(),
        None => return Ok(no_content()),
    };
    let mut next = format!("/v1/queues?marker={}&limit={}", last, limit);
    if detailed {
        next.push_str("&detailed=true");
    }
    Ok(listing("queues", items, next))
}

fn stats(
    state: &mut ServiceState,
    name: &str,
    request: &TransportRequest,
    now: DateTime<Utc>,
) -> Result<TransportResponse, TransportError> {
    let queue = state.queue_mut(name, &request.path)?;

    let total = queue.messages.len();
    let claimed = queue.messages.values().filter(|m| m.claim.is_some()).count();
    let mut counts = json!({
        "free": total - claimed,
        "claimed": claimed,
        "total": total,
    });

    let describe = |(id, message): (&String, &StoredMessage)| {
        json!({
            "href": message_href(name, id),
            "age": age_of(message.created, now),
            "created": message.created.to_rfc3339_opts(chrono::SecondsFormat::Secs, true),
        })
    };
    if let Some(oldest) = queue.messages.iter().next().map(describe) {
        counts["oldest"] = oldest;
    }
    if let Some(newest) = queue.messages.iter().next_back().map(describe) {
        counts["newest"] = newest;
    }

    Ok(ok(json!({ "messages": counts })))
}

// ============================================================================
// Messages
// ============================================================================

fn post_messages(
    state: &mut ServiceState,
    name: &str,
    request: &TransportRequest,
    now: DateTime<Utc>,
) -> Result<TransportResponse, TransportError> {
    let documents = match &request.body {
        Some(Value::Array(documents)) if !documents.is_empty() => documents.clone(),
        _ => return Err(bad_request("expected a non-empty array of messages")),
    };
    state.queue_mut(name, &request.path)?;

    let mut accepted = Vec::with_capacity(documents.len());
    for document in &documents {
        let ttl = positive_field(document, "ttl")?;
        let body = document.get("body").cloned().unwrap_or(Value::Null);
        accepted.push((ttl, body));
    }

    let client_id = request.header(CLIENT_ID_HEADER).map(str::to_string);
    let mut resources = Vec::with_capacity(accepted.len());
    for (ttl, body) in accepted {
        let id = state.allocate_id();
        let queue = state.queue_mut(name, &request.path)?;
        queue.messages.insert(
            id.clone(),
            StoredMessage {
                ttl,
                body,
                created: now,
                expires: now + seconds(ttl),
                client_id: client_id.clone(),
                claim: None,
            },
        );
        resources.push(message_href(name, &id));
    }

    Ok(TransportResponse::new(201).with_body(json!({
        "partial": false,
        "resources": resources,
    })))
}

fn list_messages(
    state: &mut ServiceState,
    name: &str,
    request: &TransportRequest,
    now: DateTime<Utc>,
) -> Result<TransportResponse, TransportError> {
    let limit = page_limit(request)?;
    let echo = flag(request, "echo");
    let include_claimed = flag(request, "include_claimed");
    let marker = request.query_param("marker").unwrap_or("").to_string();
    let client_id = request.header(CLIENT_ID_HEADER);

    let queue = state.queue_mut(name, &request.path)?;
    let items: Vec<Value> = queue
        .messages
        .iter()
        .filter(|(id, _)| id.as_str() > marker.as_str())
        .filter(|(_, m)| echo || client_id.is_none() || m.client_id.as_deref() != client_id)
        .filter(|(_, m)| include_claimed || m.claim.is_none())
        .take(limit)
        .map(|(id, m)| message_document(name, id, m, now))
        .collect();

    let last = match items
        .last()
        .and_then(|item| item["href"].as_str())
        .and_then(|href| href.rsplit('/').next())
    {
        Some(last) => last.to_string(),
        None => return Ok(no_content()),
    };

    let next = format!(
        "/v1/queues/{}/messages?marker={}&limit={}&echo={}&include_claimed={}",
        name, last, limit, echo, include_claimed
    );
    Ok(listing("messages", items, next))
}

fn get_messages_by_id(
    state: &mut ServiceState,
    name: &str,
    ids: &[String],
    request: &TransportRequest,
    now: DateTime<Utc>,
) -> Result<TransportResponse, TransportError> {
    let queue = state.queue_mut(name, &request.path)?;
    let found: Vec<Value> = ids
        .iter()
        .filter_map(|id| {
            queue
                .messages
                .get(id)
                .map(|m| message_document(name, id, m, now))
        })
        .collect();

    if found.is_empty() {
        return Err(not_found(&request.path));
    }
    Ok(ok(Value::Array(found)))
}

fn delete_messages_by_id(
    state: &mut ServiceState,
    name: &str,
    ids: &[String],
    request: &TransportRequest,
) -> Result<TransportResponse, TransportError> {
    let queue = state.queue_mut(name, &request.path)?;
    let removed = ids
        .iter()
        .filter(|id| queue.messages.remove(id.as_str()).is_some())
        .count();

    if removed == 0 {
        return Err(not_found(&request.path));
    }
    Ok(no_content())
}

fn delete_message(
    state: &mut ServiceState,
    name: &str,
    id: &str,
    request: &TransportRequest,
) -> Result<TransportResponse, TransportError> {
    let queue = state.queue_mut(name, &request.path)?;
    let message = queue.messages.get(id).ok_or_else(|| not_found(&request.path))?;

    let claim_id = request.query_param("claim_id");
    match (&message.claim, claim_id) {
        (Some(held_by), Some(claim_id)) if held_by == claim_id => {}
        (None, None) => {}
        (Some(_), _) => {
            return Err(TransportError::Http {
                status: 403,
                message: format!("message {} is claimed; a matching claim_id is required", id),
            })
        }
        (None, Some(_)) => {
            return Err(TransportError::Http {
                status: 403,
                message: format!("message {} is not claimed", id),
            })
        }
    }

    queue.messages.remove(id);
    Ok(no_content())
}

// ============================================================================
// Claims
// ============================================================================

fn create_claim(
    state: &mut ServiceState,
    name: &str,
    request: &TransportRequest,
    now: DateTime<Utc>,
) -> Result<TransportResponse, TransportError> {
    let limit = page_limit(request)?;
    let body = request
        .body
        .clone()
        .ok_or_else(|| bad_request("claim body is required"))?;
    let ttl = positive_field(&body, "ttl")?;
    let grace = positive_field(&body, "grace")?;

    state.queue_mut(name, &request.path)?;
    let claim_id = state.allocate_id();
    let queue = state.queue_mut(name, &request.path)?;

    let ids: Vec<String> = queue
        .messages
        .iter()
        .filter(|(_, m)| m.claim.is_none())
        .take(limit)
        .map(|(id, _)| id.clone())
        .collect();
    if ids.is_empty() {
        return Ok(no_content());
    }

    let expires = now + seconds(ttl);
    let message_floor = expires + seconds(grace);
    let mut documents = Vec::with_capacity(ids.len());
    for id in &ids {
        if let Some(message) = queue.messages.get_mut(id) {
            message.claim = Some(claim_id.clone());
            if message.expires < message_floor {
                message.expires = message_floor;
            }
            documents.push(message_document(name, id, message, now));
        }
    }
    queue.claims.insert(
        claim_id.clone(),
        StoredClaim {
            ttl,
            grace,
            created: now,
            expires,
        },
    );

    Ok(TransportResponse::new(201)
        .with_header("location", format!("/v1/queues/{}/claims/{}", name, claim_id))
        .with_body(Value::Array(documents)))
}

fn get_claim(
    state: &mut ServiceState,
    name: &str,
    id: &str,
    request: &TransportRequest,
    now: DateTime<Utc>,
) -> Result<TransportResponse, TransportError> {
    let queue = state.queue_mut(name, &request.path)?;
    let claim = queue.claims.get(id).ok_or_else(|| not_found(&request.path))?;

    let messages: Vec<Value> = queue
        .claimed_ids(id)
        .iter()
        .filter_map(|mid| {
            queue
                .messages
                .get(mid)
                .map(|m| message_document(name, mid, m, now))
        })
        .collect();

    Ok(ok(json!({
        "age": age_of(claim.created, now),
        "ttl": claim.ttl,
        "href": format!("/v1/queues/{}/claims/{}", name, id),
        "messages": messages,
    })))
}

fn update_claim(
    state: &mut ServiceState,
    name: &str,
    id: &str,
    request: &TransportRequest,
    now: DateTime<Utc>,
) -> Result<TransportResponse, TransportError> {
    let body = request
        .body
        .clone()
        .ok_or_else(|| bad_request("claim body is required"))?;
    let ttl = positive_field(&body, "ttl")?;

    let queue = state.queue_mut(name, &request.path)?;
    let claim = queue
        .claims
        .get_mut(id)
        .ok_or_else(|| not_found(&request.path))?;
    claim.ttl = ttl;
    claim.expires = now + seconds(ttl);
    let message_floor = claim.expires + seconds(claim.grace);

    for mid in queue.claimed_ids(id) {
        if let Some(message) = queue.messages.get_mut(&mid) {
            if message.expires < message_floor {
                message.expires = message_floor;
            }
        }
    }
    Ok(no_content())
}

// ============================================================================
// Pools
// ============================================================================

fn create_pool(
    state: &mut ServiceState,
    name: &str,
    request: &TransportRequest,
) -> Result<TransportResponse, TransportError> {
    if state.pools.contains_key(name) {
        return Ok(no_content());
    }

    let body = request
        .body
        .as_ref()
        .ok_or_else(|| bad_request("pool body is required"))?;
    let weight = body
        .get("weight")
        .and_then(Value::as_u64)
        .ok_or_else(|| bad_request("'weight' must be a non-negative integer"))?;
    let uri = body
        .get("uri")
        .and_then(Value::as_str)
        .filter(|uri| !uri.is_empty())
        .ok_or_else(|| bad_request("'uri' is required"))?
        .to_string();
    let options = body
        .get("options")
        .and_then(Value::as_object)
        .cloned()
        .unwrap_or_default();

    state.pools.insert(
        name.to_string(),
        StoredPool {
            weight,
            uri,
            options,
        },
    );
    Ok(TransportResponse::new(201).with_header("location", format!("/v1/pools/{}", name)))
}

fn list_pools(
    state: &ServiceState,
    request: &TransportRequest,
) -> Result<TransportResponse, TransportError> {
    let limit = page_limit(request)?;
    let detailed = flag(request, "detailed");
    let marker = request.query_param("marker").unwrap_or("");

    let items: Vec<Value> = state
        .pools
        .iter()
        .filter(|(name, _)| name.as_str() > marker)
        .take(limit)
        .map(|(name, pool)| {
            let mut item = json!({
                "name": name,
                "href": format!("/v1/pools/{}", name),
                "weight": pool.weight,
                "uri": pool.uri,
            });
            if detailed {
                item["options"] = Value::Object(pool.options.clone());
            }
            item
        })
        .collect();

    let last = match items.last().and_then(|item| item["name"].as_str()) {
        Some(last) => last.to_string(),
        None => return Ok(no_content()),
    };
    Ok(listing(
        "pools",
        items,
        format!("/v1/pools?marker={}&limit={}", last, limit),
    ))
}
