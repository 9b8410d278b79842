//! # Vend API Client
//!
//! HTTPS listing client for the Vend REST API, with lazy pagination and
//! retry on transient failures.
//!
//! ## Request Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  open(listing, since)                                                  │
//! │     │   (nothing sent yet)                                             │
//! │     ▼                                                                   │
//! │  poll ──► GET https://<store>.vendhq.com/api/register_sales            │
//! │               ?since=2024-03-01+10%3A00%3A00&status=VOIDED&page=1      │
//! │               Authorization: Bearer <token>                            │
//! │     │                                                                   │
//! │     ├── 200 ─► { "pagination": {"page": 1, "pages": 3},               │
//! │     │            "register_sales": [ {...}, {...} ] }                  │
//! │     │          yield each resource, then request page 2 on demand      │
//! │     │                                                                   │
//! │     ├── connect error / timeout / 429 / 5xx                            │
//! │     │      └─► exponential backoff, up to max_retries                  │
//! │     │                                                                   │
//! │     └── any other status ─► HttpStatus, ends the stream                │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::sync::Arc;

use backoff::backoff::Backoff;
use backoff::ExponentialBackoff;
use chrono::{DateTime, Utc};
use futures_util::stream::{self, StreamExt, TryStreamExt};
use reqwest::header::ACCEPT;
use serde_json::Value;
use tracing::{debug, warn};
use url::Url;

use vend_core::Resource;

use crate::config::VendSettings;
use crate::error::{SyncError, SyncResult};
use crate::source::{Listing, ResourceSource, ResourceStream};

/// Format of the `since` query parameter (UTC).
pub const SINCE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

// =============================================================================
// URL Building
// =============================================================================

/// Resolves a configured address to the API base URL.
///
/// A bare store name becomes `https://<name>.vendhq.com/api/`; anything
/// with a scheme is used as given.
pub fn base_url(address: &str) -> SyncResult<Url> {
    let address = address.trim();

    if address.contains("://") {
        let mut url = Url::parse(address)?;
        if !url.path().ends_with('/') {
            let path = format!("{}/", url.path());
            url.set_path(&path);
        }
        return Ok(url);
    }

    let valid = !address.is_empty()
        && address
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-');
    if !valid {
        return Err(SyncError::InvalidUrl(format!(
            "'{}' is neither a store name nor a URL",
            address
        )));
    }

    Ok(Url::parse(&format!("https://{}.vendhq.com/api/", address))?)
}

/// URL of one page of a listing.
pub fn listing_url(
    base: &Url,
    listing: &Listing,
    since: Option<DateTime<Utc>>,
    page: u32,
    page_size: u32,
) -> SyncResult<Url> {
    let mut url = base.join(listing.class.endpoint())?;
    {
        let mut query = url.query_pairs_mut();
        if let Some(since) = since {
            query.append_pair("since", &since.format(SINCE_FORMAT).to_string());
        }
        if let Some(state) = listing.state {
            query.append_pair("status", state);
        }
        query.append_pair("page", &page.to_string());
        query.append_pair("page_size", &page_size.to_string());
    }
    Ok(url)
}

// =============================================================================
// Page Decoding
// =============================================================================

/// One decoded listing page.
#[derive(Debug, Clone, PartialEq)]
pub struct Page {
    pub resources: Vec<Resource>,
    pub page: u32,
    pub pages: u32,
}

impl Page {
    /// True if the listing continues after `requested`.
    pub fn has_more_after(&self, requested: u32) -> bool {
        requested < self.pages
    }
}

fn page_number(value: Option<&Value>) -> Option<u32> {
    match value? {
        Value::Number(n) => n.as_u64().and_then(|n| u32::try_from(n).ok()),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Decodes a listing response body.
///
/// A body without `pagination` is a single page. Array elements that are
/// not objects are dropped with a warning.
pub fn decode_page(body: Value, collection_key: &str) -> SyncResult<Page> {
    let Value::Object(mut body) = body else {
        return Err(SyncError::Decode("listing response is not a JSON object".into()));
    };

    let (page, pages) = match body.get("pagination") {
        Some(pagination) => {
            let page = page_number(pagination.get("page")).unwrap_or(1);
            let pages = page_number(pagination.get("pages")).unwrap_or(page);
            (page, pages)
        }
        None => (1, 1),
    };

    let items = match body.remove(collection_key) {
        Some(Value::Array(items)) => items,
        Some(Value::Null) | None => Vec::new(),
        Some(_) => {
            return Err(SyncError::Decode(format!(
                "`{}` in listing response is not an array",
                collection_key
            )))
        }
    };

    let resources = items
        .into_iter()
        .filter_map(|item| {
            let resource = Resource::from_json(item);
            if resource.is_none() {
                warn!(collection = %collection_key, "Ignoring non-object listing element");
            }
            resource
        })
        .collect();

    Ok(Page {
        resources,
        page,
        pages,
    })
}

// =============================================================================
// Vend Client
// =============================================================================

/// Authenticated client for the Vend API.
#[derive(Debug, Clone)]
pub struct VendClient {
    http: reqwest::Client,
    base: Url,
    token: String,
    settings: Arc<VendSettings>,
}

impl VendClient {
    /// Creates a client from the `[vend]` settings.
    pub fn new(settings: &VendSettings) -> SyncResult<Self> {
        let token = settings
            .token
            .clone()
            .filter(|t| !t.trim().is_empty())
            .ok_or(SyncError::MissingToken)?;
        let base = base_url(&settings.address)?;

        let http = reqwest::Client::builder()
            .timeout(settings.timeout())
            .user_agent(concat!("vend-sync/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| SyncError::InvalidConfig(format!("HTTP client: {}", e)))?;

        Ok(VendClient {
            http,
            base,
            token,
            settings: Arc::new(settings.clone()),
        })
    }

    /// The API base URL.
    pub fn base(&self) -> &Url {
        &self.base
    }

    /// Fetches one page, retrying transient failures.
    pub async fn fetch_page(
        &self,
        listing: &Listing,
        since: Option<DateTime<Utc>>,
        page: u32,
    ) -> SyncResult<Page> {
        let url = listing_url(&self.base, listing, since, page, self.settings.page_size)?;
        let mut backoff = self.create_backoff();
        let mut attempt = 0u32;

        loop {
            let error = match self.get_json(&url).await {
                Ok(body) => return decode_page(body, listing.class.collection_key()),
                Err(e) => e.for_class(listing.class.name()),
            };

            if !error.is_retryable() || attempt >= self.settings.max_retries {
                return Err(error);
            }
            attempt += 1;

            match backoff.next_backoff() {
                Some(duration) => {
                    warn!(
                        class = %listing.class,
                        page,
                        attempt,
                        ?duration,
                        "Retrying page after error: {}",
                        error
                    );
                    tokio::time::sleep(duration).await;
                }
                None => return Err(error),
            }
        }
    }

    async fn get_json(&self, url: &Url) -> SyncResult<Value> {
        debug!(url = %url, "GET");

        let response = self
            .http
            .get(url.clone())
            .bearer_auth(&self.token)
            .header(ACCEPT, "application/json")
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(SyncError::HttpStatus {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        Ok(response.json::<Value>().await?)
    }

    /// Fetches the page `next` names and works out the one after it.
    async fn next_page(
        &self,
        listing: &Listing,
        since: Option<DateTime<Utc>>,
        next: Option<u32>,
    ) -> SyncResult<Option<(Vec<Resource>, Option<u32>)>> {
        let Some(requested) = next else {
            return Ok(None);
        };

        let page = self.fetch_page(listing, since, requested).await?;
        debug!(
            class = %listing.class,
            page = requested,
            pages = page.pages,
            count = page.resources.len(),
            "Fetched page"
        );

        let next = page.has_more_after(requested).then(|| requested + 1);
        Ok(Some((page.resources, next)))
    }

    fn create_backoff(&self) -> ExponentialBackoff {
        ExponentialBackoff {
            initial_interval: self.settings.initial_backoff(),
            max_interval: self.settings.max_backoff(),
            multiplier: 2.0,
            max_elapsed_time: None, // bounded by max_retries instead
            ..Default::default()
        }
    }
}

impl ResourceSource for VendClient {
    fn open(&self, listing: &Listing, since: Option<DateTime<Utc>>) -> ResourceStream {
        let client = self.clone();
        let listing = listing.clone();

        stream::try_unfold(Some(1u32), move |next| {
            let client = client.clone();
            let listing = listing.clone();
            async move { client.next_page(&listing, since, next).await }
        })
        .map_ok(|resources| stream::iter(resources.into_iter().map(Ok::<Resource, SyncError>)))
        .try_flatten()
        .boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource_class::ResourceClass;
    use chrono::TimeZone;
    use serde_json::json;

    fn query(url: &Url, key: &str) -> Option<String> {
        url.query_pairs()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.into_owned())
    }

    #[test]
    fn test_base_url_from_store_name() {
        let url = base_url("mystore").unwrap();
        assert_eq!(url.as_str(), "https://mystore.vendhq.com/api/");

        let url = base_url("http://localhost:8080/api").unwrap();
        assert_eq!(url.as_str(), "http://localhost:8080/api/");

        assert!(base_url("my store").is_err());
        assert!(base_url("").is_err());
    }

    #[test]
    fn test_listing_url_parameters() {
        let base = base_url("mystore").unwrap();
        let since = Utc.with_ymd_and_hms(2024, 3, 1, 10, 0, 0).unwrap();
        let listing = Listing::in_state(ResourceClass::RegisterSale, "VOIDED");

        let url = listing_url(&base, &listing, Some(since), 2, 200).unwrap();

        assert_eq!(url.path(), "/api/register_sales");
        assert_eq!(query(&url, "since").as_deref(), Some("2024-03-01 10:00:00"));
        assert_eq!(query(&url, "status").as_deref(), Some("VOIDED"));
        assert_eq!(query(&url, "page").as_deref(), Some("2"));
        assert_eq!(query(&url, "page_size").as_deref(), Some("200"));
    }

    #[test]
    fn test_listing_url_without_refinements() {
        let base = base_url("mystore").unwrap();
        let listing = Listing::default_for(ResourceClass::Outlet);

        let url = listing_url(&base, &listing, None, 1, 50).unwrap();

        assert_eq!(url.path(), "/api/outlets");
        assert_eq!(query(&url, "since"), None);
        assert_eq!(query(&url, "status"), None);
    }

    #[test]
    fn test_decode_paginated_page() {
        let body = json!({
            "pagination": {"results": 3, "page": 1, "page_size": 2, "pages": 2},
            "products": [{"id": "a"}, {"id": "b"}, 42]
        });

        let page = decode_page(body, "products").unwrap();

        assert_eq!(page.page, 1);
        assert_eq!(page.pages, 2);
        assert_eq!(page.resources.len(), 2);
        assert!(page.has_more_after(1));
        assert!(!page.has_more_after(2));
    }

    #[test]
    fn test_decode_unpaginated_and_empty_pages() {
        let page = decode_page(json!({"outlets": [{"id": "1"}]}), "outlets").unwrap();
        assert_eq!((page.page, page.pages), (1, 1));
        assert!(!page.has_more_after(1));

        let page = decode_page(json!({"pagination": {"page": "1", "pages": "1"}}), "taxes").unwrap();
        assert!(page.resources.is_empty());

        assert!(decode_page(json!([1, 2]), "taxes").is_err());
        assert!(decode_page(json!({"taxes": "nope"}), "taxes").is_err());
    }

    #[test]
    fn test_client_requires_token() {
        let mut settings = VendSettings {
            address: "mystore".into(),
            ..Default::default()
        };
        assert!(matches!(VendClient::new(&settings), Err(SyncError::MissingToken)));

        settings.token = Some("secret".into());
        let client = VendClient::new(&settings).unwrap();
        assert_eq!(client.base().host_str(), Some("mystore.vendhq.com"));
    }
}
