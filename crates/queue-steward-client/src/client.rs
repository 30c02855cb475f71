//! The client handle shared by every resource.
//!
//! A [`QueueClient`] is built once and passed explicitly to whatever needs
//! it; clones share the same transport and configuration.

use crate::config::ClientConfig;
use crate::error::{ClientError, ConfigurationError, NotFoundExt, ResourceKind, TransportError};
use crate::pagination::{parse_page, Page, MAX_PAGE_LIMIT};
use crate::pool::{Pool, PoolListing, PoolName, PoolSnapshot};
use crate::queue::{Queue, QueueListing, QueueName, QueueSummary};
use crate::transport::{
    HttpTransport, InMemoryTransport, Method, Transport, TransportRequest, TransportResponse,
    CLIENT_ID_HEADER,
};
use std::sync::Arc;
use tracing::{debug, warn};

#[cfg(test)]
#[path = "client_tests.rs"]
mod tests;

/// Entry point for queue, message, claim and pool operations.
///
/// # Examples
///
/// ```no_run
/// # use queue_steward_client::{ClientConfig, QueueClient};
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let client = QueueClient::connect(ClientConfig::default())?;
/// let queue = client.queue("orders")?.ensure(true).await?;
/// println!("Queue {} is ready", queue.name());
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct QueueClient {
    transport: Arc<dyn Transport>,
    config: Arc<ClientConfig>,
}

impl QueueClient {
    /// Create a client over any transport.
    pub fn new(transport: impl Transport + 'static, config: ClientConfig) -> Self {
        Self::with_shared_transport(Arc::new(transport), config)
    }

    /// Create a client over a transport that is shared with other owners.
    pub fn with_shared_transport(transport: Arc<dyn Transport>, config: ClientConfig) -> Self {
        Self {
            transport,
            config: Arc::new(config),
        }
    }

    /// Create a client talking HTTP to `config.endpoint`.
    ///
    /// # Errors
    ///
    /// Returns `ConfigurationError` if the configuration is invalid.
    pub fn connect(config: ClientConfig) -> Result<Self, ConfigurationError> {
        config.validate()?;
        let transport = HttpTransport::new(&config)?;
        Ok(Self::new(transport, config))
    }

    /// Create a client backed by a fresh in-memory service emulation.
    pub fn in_memory() -> Self {
        Self::new(InMemoryTransport::new(), ClientConfig::default())
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Send one request through the transport, tagging it with the client id.
    pub(crate) async fn send(
        &self,
        request: TransportRequest,
    ) -> Result<TransportResponse, TransportError> {
        let method = request.method;
        let path = request.path.clone();
        let request = request.with_header(CLIENT_ID_HEADER, self.config.client_id.as_str());

        match self.transport.send(request).await {
            Ok(response) => {
                debug!(method = %method, path = %path, status = response.status, "Request completed");
                Ok(response)
            }
            Err(e) if e.is_not_found() => {
                debug!(method = %method, path = %path, "Request target not found");
                Err(e)
            }
            Err(e) => {
                warn!(method = %method, path = %path, error = %e, "Request failed");
                Err(e)
            }
        }
    }

    /// Reference a queue by name without contacting the service.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::InvalidArgument` if the name is malformed.
    pub fn queue(&self, name: &str) -> Result<Queue, ClientError> {
        let name = QueueName::new(name.to_string())?;
        Ok(Queue::new(self.clone(), name))
    }

    /// List one page of queues.
    ///
    /// The returned handles are known to exist; with `detailed` set they also
    /// carry each queue's metadata snapshot.
    pub async fn queues(&self, listing: QueueListing) -> Result<Page<Queue>, ClientError> {
        listing.page.validate(MAX_PAGE_LIMIT)?;

        let mut request = listing
            .page
            .apply(TransportRequest::new(Method::Get, "queues"));
        if listing.detailed {
            request = request.with_query("detailed", "true");
        }

        let response = self.send(request).await?;
        let page: Page<QueueSummary> = parse_page(&response, "queues", listing.page.limit)?;

        let client = self.clone();
        Ok(page.map(|summary| Queue::listed(client.clone(), summary)))
    }

    /// Reference a pool by name without contacting the service.
    pub fn pool(&self, name: &str) -> Result<Pool, ClientError> {
        let name = PoolName::new(name.to_string())?;
        Ok(Pool::new(self.clone(), name))
    }

    /// List one page of pool registrations.
    pub async fn pools(&self, listing: PoolListing) -> Result<Page<Pool>, ClientError> {
        listing.page.validate(MAX_PAGE_LIMIT)?;

        let mut request = listing
            .page
            .apply(TransportRequest::new(Method::Get, "pools"));
        if listing.detailed {
            request = request.with_query("detailed", "true");
        }

        let response = self
            .send(request)
            .await
            .or_not_found(ResourceKind::Pool, "*")?;
        let page: Page<PoolSnapshot> = parse_page(&response, "pools", listing.page.limit)?;

        let client = self.clone();
        Ok(page.map(|snapshot| Pool::listed(client.clone(), snapshot)))
    }
}

impl std::fmt::Debug for QueueClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueueClient")
            .field("config", &self.config)
            .field("transport", &"<Transport>")
            .finish()
    }
}
