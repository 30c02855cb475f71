//! Marker/limit pagination shared by queue, message and pool listings.
//!
//! A listing call returns exactly one [`Page`]. Pages are finite and never
//! fetch further pages on their own: to continue, re-issue the listing with
//! the marker of the last item seen ([`Page::continuation`]). Ordering is
//! only stable within a single listing call; concurrent writers may shift
//! later pages.

use crate::error::{TransportError, ValidationError};
use crate::transport::{TransportRequest, TransportResponse};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;

/// Largest page size accepted by the service for queues and messages
pub const MAX_PAGE_LIMIT: u32 = 20;

/// Items that can be used as a pagination marker
pub trait Marked {
    /// Opaque marker identifying this item within its listing
    fn marker(&self) -> &str;
}

/// Marker and limit for one listing call
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageRequest {
    pub marker: Option<String>,
    pub limit: Option<u32>,
}

impl PageRequest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_marker(mut self, marker: impl Into<String>) -> Self {
        self.marker = Some(marker.into());
        self
    }

    pub fn with_limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Reject limits outside `1..=max` before anything is sent.
    pub fn validate(&self, max: u32) -> Result<(), ValidationError> {
        if let Some(limit) = self.limit {
            if limit == 0 || limit > max {
                return Err(ValidationError::OutOfRange {
                    field: "limit".to_string(),
                    message: format!("must be between 1 and {}", max),
                });
            }
        }
        if let Some(marker) = &self.marker {
            if marker.is_empty() {
                return Err(ValidationError::Required {
                    field: "marker".to_string(),
                });
            }
        }
        Ok(())
    }

    /// Add `marker`/`limit` query parameters, only when present.
    pub(crate) fn apply(&self, mut request: TransportRequest) -> TransportRequest {
        if let Some(marker) = &self.marker {
            request = request.with_query("marker", marker.as_str());
        }
        if let Some(limit) = self.limit {
            request = request.with_query("limit", limit.to_string());
        }
        request
    }
}

/// One finite page of a listing
#[derive(Debug, Clone)]
pub struct Page<T> {
    items: Vec<T>,
    next_marker: Option<String>,
    limit: Option<u32>,
}

impl<T> Page<T> {
    pub(crate) fn new(items: Vec<T>, next_marker: Option<String>, limit: Option<u32>) -> Self {
        Self {
            items,
            next_marker,
            limit,
        }
    }

    /// A page with no items and no continuation
    pub fn empty() -> Self {
        Self::new(Vec::new(), None, None)
    }

    pub fn items(&self) -> &[T] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Marker advertised by the service's `next` link, if any
    pub fn next_marker(&self) -> Option<&str> {
        self.next_marker.as_deref()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.items.iter()
    }

    pub(crate) fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            next_marker: self.next_marker,
            limit: self.limit,
        }
    }
}

impl<T: Marked> Page<T> {
    /// Marker of the last item on this page
    pub fn last_marker(&self) -> Option<&str> {
        self.items.last().map(Marked::marker)
    }

    /// Request for the page following this one, keeping the same limit.
    ///
    /// Returns `None` for an empty page: there is nothing to continue from.
    pub fn continuation(&self) -> Option<PageRequest> {
        let marker = self.last_marker().or(self.next_marker())?;
        Some(PageRequest {
            marker: Some(marker.to_string()),
            limit: self.limit,
        })
    }
}

impl<T> IntoIterator for Page<T> {
    type Item = T;
    type IntoIter = std::vec::IntoIter<T>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}

impl<'a, T> IntoIterator for &'a Page<T> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

#[derive(Debug, Deserialize)]
struct Link {
    rel: String,
    href: String,
}

/// Decode a listing body of the form `{"<field>": [...], "links": [...]}`.
///
/// An absent body (204 No Content) is an empty page.
pub(crate) fn parse_page<T: DeserializeOwned>(
    response: &TransportResponse,
    field: &str,
    limit: Option<u32>,
) -> Result<Page<T>, TransportError> {
    let body = match &response.body {
        Some(Value::Object(body)) => body,
        None | Some(Value::Null) => return Ok(Page::empty()),
        Some(other) => {
            return Err(TransportError::Decode {
                message: format!("expected an object listing '{}', got {}", field, other),
            })
        }
    };

    let items = match body.get(field) {
        Some(items) => serde_json::from_value(items.clone())?,
        None => Vec::new(),
    };

    let links: Vec<Link> = match body.get("links") {
        Some(links) => serde_json::from_value(links.clone())?,
        None => Vec::new(),
    };

    let next_marker = links
        .iter()
        .find(|link| link.rel == "next")
        .and_then(|link| extract_marker(&link.href));

    Ok(Page::new(items, next_marker, limit))
}

/// Extract the `marker` query parameter from a listing link.
///
/// Links are usually relative (`/v1/queues?marker=q1&limit=10`).
///
/// # Examples
///
/// ```rust
/// use queue_steward_client::pagination::extract_marker;
///
/// assert_eq!(
///     extract_marker("/v1/queues?marker=kitkat&limit=10"),
///     Some("kitkat".to_string())
/// );
/// assert_eq!(extract_marker("/v1/queues?limit=10"), None);
/// ```
pub fn extract_marker(href: &str) -> Option<String> {
    let base = url::Url::parse("http://localhost/").ok()?;
    let url = base.join(href).ok()?;
    url.query_pairs()
        .find(|(key, _)| key == "marker")
        .map(|(_, value)| value.into_owned())
        .filter(|marker| !marker.is_empty())
}

#[cfg(test)]
#[path = "pagination_tests.rs"]
mod tests;
