//! Pool registrations: named storage backends with a weight and a URI.

use crate::client::QueueClient;
use crate::error::{ClientError, ResourceKind, ValidationError};
use crate::pagination::{Marked, PageRequest};
use crate::queue::Metadata;
use crate::resource::{validate_name, Ensured, Existence, Resource};
use crate::transport::{Method, TransportRequest};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::str::FromStr;
use tracing::info;

#[cfg(test)]
#[path = "pool_tests.rs"]
mod tests;

/// Validated pool name
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PoolName(String);

impl PoolName {
    pub fn new(name: String) -> Result<Self, ValidationError> {
        validate_name("pool_name", &name)?;
        Ok(Self(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for PoolName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for PoolName {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s.to_string())
    }
}

/// Desired registration for a pool
#[derive(Debug, Clone, PartialEq)]
pub struct PoolSpec {
    weight: u32,
    uri: String,
    options: Metadata,
}

impl PoolSpec {
    pub fn new(weight: u32, uri: impl Into<String>) -> Result<Self, ValidationError> {
        let uri = uri.into();
        if uri.trim().is_empty() {
            return Err(ValidationError::Required {
                field: "uri".to_string(),
            });
        }
        Ok(Self {
            weight,
            uri,
            options: Metadata::new(),
        })
    }

    pub fn with_options(mut self, options: Metadata) -> Self {
        self.options = options;
        self
    }

    pub fn weight(&self) -> u32 {
        self.weight
    }

    pub fn uri(&self) -> &str {
        &self.uri
    }

    pub fn options(&self) -> &Metadata {
        &self.options
    }

    fn to_body(&self) -> Value {
        json!({
            "weight": self.weight,
            "uri": self.uri,
            "options": self.options,
        })
    }
}

/// Pool registration as reported by the service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PoolSnapshot {
    #[serde(default)]
    pub name: String,
    pub weight: u32,
    pub uri: String,
    #[serde(default)]
    pub options: Metadata,
}

/// Parameters for [`QueueClient::pools`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PoolListing {
    pub page: PageRequest,
    /// Include each pool's options in the listing
    pub detailed: bool,
}

impl PoolListing {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_page(mut self, page: PageRequest) -> Self {
        self.page = page;
        self
    }

    pub fn detailed(mut self, detailed: bool) -> Self {
        self.detailed = detailed;
        self
    }
}

/// Handle to a pool registration
#[derive(Debug, Clone)]
pub struct Pool {
    client: QueueClient,
    name: PoolName,
    existence: Existence,
    snapshot: Option<PoolSnapshot>,
}

impl Pool {
    pub(crate) fn new(client: QueueClient, name: PoolName) -> Self {
        Self {
            client,
            name,
            existence: Existence::Unknown,
            snapshot: None,
        }
    }

    /// Handle for a pool the service just listed. Names come from the
    /// service and are not re-validated.
    pub(crate) fn listed(client: QueueClient, snapshot: PoolSnapshot) -> Self {
        Self {
            client,
            name: PoolName(snapshot.name.clone()),
            existence: Existence::Present,
            snapshot: Some(snapshot),
        }
    }

    pub fn name(&self) -> &str {
        self.name.as_str()
    }

    /// Look the pool up under the given auto-create policy, registering it
    /// from `spec` when missing and `auto_create` is set.
    pub async fn lookup(
        mut self,
        auto_create: bool,
        spec: &PoolSpec,
    ) -> Result<Ensured<Pool>, ClientError> {
        if !auto_create {
            return Ok(if self.refresh_existence().await? {
                Ensured::Found(self)
            } else {
                Ensured::Absent
            });
        }

        let request = TransportRequest::new(Method::Put, self.path()).with_body(spec.to_body());
        let response = self.client.send(request).await?;
        self.existence = Existence::Present;

        if response.status == 201 {
            info!(pool = %self.name, weight = spec.weight, "Pool registered");
            self.snapshot = Some(PoolSnapshot {
                name: self.name.to_string(),
                weight: spec.weight,
                uri: spec.uri.clone(),
                options: spec.options.clone(),
            });
            Ok(Ensured::Created(self))
        } else {
            Ok(Ensured::Found(self))
        }
    }

    /// Register the pool unless it already exists.
    pub async fn ensure(self, spec: &PoolSpec) -> Result<Pool, ClientError> {
        let name = self.name.clone();
        self.lookup(true, spec)
            .await?
            .or_not_found(ResourceKind::Pool, name.as_str())
    }

    /// Remove the registration. Deleting a missing pool succeeds.
    pub async fn delete(&mut self) -> Result<(), ClientError> {
        let request = TransportRequest::new(Method::Delete, self.path());
        match self.client.send(request).await {
            Ok(_) => info!(pool = %self.name, "Pool deleted"),
            Err(e) if e.is_not_found() => {}
            Err(e) => return Err(e.into()),
        }
        self.existence = Existence::Absent;
        self.snapshot = None;
        Ok(())
    }
}

#[async_trait]
impl Resource for Pool {
    type Snapshot = PoolSnapshot;

    fn kind(&self) -> ResourceKind {
        ResourceKind::Pool
    }

    fn key(&self) -> &str {
        self.name.as_str()
    }

    fn client(&self) -> &QueueClient {
        &self.client
    }

    fn path(&self) -> String {
        format!("pools/{}", self.name)
    }

    fn existence(&self) -> Existence {
        self.existence
    }

    fn record_existence(&mut self, existence: Existence) {
        if existence == Existence::Absent {
            self.snapshot = None;
        }
        self.existence = existence;
    }

    fn snapshot(&self) -> Option<&PoolSnapshot> {
        self.snapshot.as_ref()
    }

    async fn load(&mut self) -> Result<PoolSnapshot, ClientError> {
        let request =
            TransportRequest::new(Method::Get, self.path()).with_query("detailed", "true");
        let response = match self.client.send(request).await {
            Ok(response) => response,
            Err(e) if e.is_not_found() => {
                self.record_existence(Existence::Absent);
                return Err(ClientError::not_found(ResourceKind::Pool, self.name()));
            }
            Err(e) => return Err(e.into()),
        };

        let mut snapshot: PoolSnapshot = response.json()?;
        if snapshot.name.is_empty() {
            snapshot.name = self.name.to_string();
        }
        self.existence = Existence::Present;
        self.snapshot = Some(snapshot.clone());
        Ok(snapshot)
    }
}

impl Marked for Pool {
    fn marker(&self) -> &str {
        self.name.as_str()
    }
}
