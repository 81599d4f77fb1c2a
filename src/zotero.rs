//! Zotero Web API (v3) client.
//!
//! Resolves collection names to keys and streams the top-level items of a
//! collection page by page. Raw items are normalized through
//! [`PaperRecord::from_value`].
//!
//! API Details:
//! - Base: `https://api.zotero.org/{groups|users}/{id}`
//! - Headers: `Zotero-API-Version: 3`, `Zotero-API-Key`
//! - Paging: `start` / `limit` query parameters, max 100 per page

use crate::config::{LibraryRef, ZoteroConfig};
use crate::error::{CitegraphError, Result};
use crate::gateway::{CollectionId, LibraryGateway, PaperStream};
use crate::paper::PaperRecord;
use async_trait::async_trait;
use futures::stream::{self, StreamExt, TryStreamExt};
use serde::Deserialize;
use std::time::Duration;
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};

/// Zotero API base URL
const ZOTERO_API_BASE: &str = "https://api.zotero.org";

/// Maximum items per page (Zotero limit)
const PAGE_SIZE: usize = 100;

/// A collection in the library.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Collection {
    pub key: CollectionId,
    pub name: String,
}

/// Zotero API client for one group or user library
pub struct ZoteroClient {
    client: reqwest::Client,
    api_key: String,
    library_url: String,
    page_size: usize,
    collections: OnceCell<Vec<Collection>>,
}

impl ZoteroClient {
    /// Create a new ZoteroClient from resolved configuration
    pub fn new(config: &ZoteroConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| CitegraphError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            api_key: config.api_key.clone(),
            library_url: library_url(ZOTERO_API_BASE, &config.library),
            page_size: PAGE_SIZE,
            collections: OnceCell::new(),
        })
    }

    /// Point the client at another Zotero-compatible endpoint.
    pub fn with_base_url(mut self, base_url: &str, library: &LibraryRef) -> Self {
        self.library_url = library_url(base_url, library);
        self
    }

    /// All collections in the library, fetched once and cached.
    pub async fn collections(&self) -> Result<&[Collection]> {
        let collections = self
            .collections
            .get_or_try_init(|| self.fetch_collections())
            .await?;
        Ok(collections.as_slice())
    }

    async fn fetch_collections(&self) -> Result<Vec<Collection>> {
        let url = format!("{}/collections", self.library_url);
        let mut collections = Vec::new();
        let mut start = 0;

        loop {
            let page = self.get_page(&url, start).await?;
            let fetched = page.len();
            collections.extend(parse_collections(page));

            if fetched < self.page_size {
                break;
            }
            start += fetched;
        }

        info!(count = collections.len(), "Fetched Zotero collections");
        Ok(collections)
    }

    /// GET one page of a listing endpoint as raw JSON values.
    async fn get_page(&self, url: &str, start: usize) -> Result<Vec<serde_json::Value>> {
        debug!(url, start, "Fetching Zotero page");

        let response = self
            .client
            .get(url)
            .header("Zotero-API-Version", "3")
            .header("Zotero-API-Key", &self.api_key)
            .query(&[("start", start), ("limit", self.page_size)])
            .send()
            .await?;
        let status = response.status();

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let backoff = response
                .headers()
                .get("Backoff")
                .or_else(|| response.headers().get(reqwest::header::RETRY_AFTER))
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse().ok())
                .unwrap_or(5);
            return Err(CitegraphError::RateLimited(backoff));
        }

        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), error = %error_text, "Zotero API error");
            return Err(CitegraphError::Api {
                code: status.as_u16() as i32,
                message: format!("Zotero API error: {} - {}", status, error_text),
            });
        }

        let page: Vec<serde_json::Value> = response.json().await.map_err(|e| {
            CitegraphError::Parse(format!("Failed to parse Zotero response: {}", e))
        })?;
        Ok(page)
    }
}

#[async_trait]
impl LibraryGateway for ZoteroClient {
    async fn resolve_collection(&self, name: &str) -> Result<Option<CollectionId>> {
        Ok(find_collection(self.collections().await?, name).map(|c| c.key.clone()))
    }

    fn list_papers<'a>(&'a self, collection: &'a CollectionId) -> PaperStream<'a> {
        let url = format!(
            "{}/collections/{}/items/top",
            self.library_url,
            urlencoding::encode(collection)
        );

        // State: offset of the next page, `None` once a short page was seen.
        let pages = stream::try_unfold((url, Some(0usize)), move |(url, start)| async move {
            let Some(start) = start else {
                return Ok::<_, CitegraphError>(None);
            };
            let page = self.get_page(&url, start).await?;
            let next = (page.len() >= self.page_size).then_some(start + page.len());
            Ok(Some((page, (url, next))))
        });

        pages
            .map_ok(|page| stream::iter(page.into_iter().map(PaperRecord::from_value)))
            .try_flatten()
            .boxed()
    }
}

/// Build the library root URL for a group or user library.
fn library_url(base: &str, library: &LibraryRef) -> String {
    let base = base.trim_end_matches('/');
    match library {
        LibraryRef::Group(id) => format!("{}/groups/{}", base, id),
        LibraryRef::User(id) => format!("{}/users/{}", base, id),
    }
}

#[derive(Debug, Deserialize)]
struct RawCollection {
    key: String,
    data: RawCollectionData,
}

#[derive(Debug, Deserialize)]
struct RawCollectionData {
    name: String,
}

/// Parse a collections page, skipping entries without key or name.
fn parse_collections(page: Vec<serde_json::Value>) -> Vec<Collection> {
    page.into_iter()
        .filter_map(|value| match serde_json::from_value::<RawCollection>(value) {
            Ok(raw) => Some(Collection {
                key: raw.key,
                name: raw.data.name,
            }),
            Err(e) => {
                warn!(error = %e, "Skipping unreadable collection entry");
                None
            }
        })
        .collect()
}

/// Exact name match; the first collection listed wins.
fn find_collection<'a>(collections: &'a [Collection], name: &str) -> Option<&'a Collection> {
    collections.iter().find(|c| c.name == name)
}
