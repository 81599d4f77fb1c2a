//! Crossref API client for reference lookup.
//!
//! Fetches `/works/{doi}` and returns the DOIs listed in the work's
//! `reference` array. Requests go through the polite pool (a `mailto`
//! in the user agent) and are capped by a semaphore.

use crate::error::{CitegraphError, Result};
use crate::gateway::CitationGateway;
use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tracing::{debug, warn};

/// Crossref API base URL
const CROSSREF_API_URL: &str = "https://api.crossref.org/works";

/// Polite pool contact used when none is configured
pub const DEFAULT_MAILTO: &str = "citegraph@example.com";

/// Crossref API client with concurrency control
pub struct CrossrefClient {
    client: reqwest::Client,
    semaphore: Arc<Semaphore>,
    base_url: String,
}

impl CrossrefClient {
    /// Create a new CrossrefClient
    ///
    /// # Arguments
    ///
    /// * `mailto` - Contact address sent in the user agent
    /// * `max_workers` - Maximum concurrent requests
    pub fn new(mailto: &str, max_workers: usize) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(format!(
                "citegraph/{} (mailto:{})",
                env!("CARGO_PKG_VERSION"),
                mailto
            ))
            .timeout(Duration::from_secs(15))
            .build()
            .map_err(|e| CitegraphError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            semaphore: Arc::new(Semaphore::new(max_workers.max(1))),
            base_url: CROSSREF_API_URL.to_string(),
        })
    }

    /// Point the client at another Crossref-compatible endpoint.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// `/works/{doi}` URL with each DOI path segment percent-encoded.
    ///
    /// DOIs may contain `#`, `?` or `<`; the `/` after the prefix is kept.
    fn work_url(&self, doi: &str) -> String {
        let encoded = doi
            .trim()
            .split('/')
            .map(urlencoding::encode)
            .collect::<Vec<_>>()
            .join("/");
        format!("{}/{}", self.base_url, encoded)
    }

    /// DOIs referenced by `doi`. A DOI unknown to Crossref has no references.
    pub async fn references(&self, doi: &str) -> Result<Vec<String>> {
        let _permit = self
            .semaphore
            .acquire()
            .await
            .map_err(|e| CitegraphError::Config(format!("Crossref client closed: {}", e)))?;

        let response = self.client.get(self.work_url(doi)).send().await?;
        let status = response.status();

        if status == reqwest::StatusCode::NOT_FOUND {
            debug!(doi, "DOI not found in Crossref");
            return Ok(Vec::new());
        }

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse().ok())
                .unwrap_or(5);
            return Err(CitegraphError::RateLimited(retry_after));
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(doi, status = status.as_u16(), "Crossref API error");
            return Err(CitegraphError::Api {
                code: status.as_u16() as i32,
                message: format!("Crossref API error: {} - {}", status, body),
            });
        }

        let body = response.text().await?;
        let data: CrossrefWorkResponse = serde_json::from_str(&body)?;
        let references = parse_references(data);
        debug!(doi, count = references.len(), "Fetched references");

        Ok(references)
    }
}

impl Default for CrossrefClient {
    fn default() -> Self {
        Self::new(DEFAULT_MAILTO, 3).unwrap_or_else(|_| Self {
            client: reqwest::Client::new(),
            semaphore: Arc::new(Semaphore::new(3)),
            base_url: CROSSREF_API_URL.to_string(),
        })
    }
}

#[async_trait]
impl CitationGateway for CrossrefClient {
    async fn get_references(&self, doi: &str) -> Result<Vec<String>> {
        self.references(doi).await
    }
}

// === Crossref API Response Types ===

#[derive(Debug, Default, Deserialize)]
struct CrossrefWorkResponse {
    #[serde(default)]
    message: Option<CrossrefWork>,
}

#[derive(Debug, Default, Deserialize)]
struct CrossrefWork {
    #[serde(default)]
    reference: Vec<CrossrefReference>,
}

#[derive(Debug, Deserialize)]
struct CrossrefReference {
    #[serde(rename = "DOI", default)]
    doi: Option<String>,
}

/// Pull non-empty reference DOIs out of a work response, in listed order.
fn parse_references(data: CrossrefWorkResponse) -> Vec<String> {
    data.message
        .map(|work| work.reference)
        .unwrap_or_default()
        .into_iter()
        .filter_map(|r| r.doi)
        .filter(|doi| !doi.trim().is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::StubServer;
    use serde_json::json;

    fn parse(value: serde_json::Value) -> Result<Vec<String>> {
        Ok(parse_references(serde_json::from_value(value)?))
    }

    #[test]
    fn test_parse_references() -> Result<()> {
        let refs = parse(json!({
            "message": {
                "reference": [
                    { "DOI": "10.1000/cited.paper.1" },
                    { "unrelated_field": "some_value" },
                    { "DOI": "10.1000/cited.paper.2" },
                    { "DOI": "" }
                ]
            }
        }))?;

        assert_eq!(refs, vec!["10.1000/cited.paper.1", "10.1000/cited.paper.2"]);
        Ok(())
    }

    #[test]
    fn test_parse_no_references() -> Result<()> {
        let refs = parse(json!({ "message": { "reference": [{ "unrelated_field": "x" }] } }))?;
        assert!(refs.is_empty());
        Ok(())
    }

    #[test]
    fn test_parse_missing_keys() -> Result<()> {
        assert!(parse(json!({ "other_key": "other_value" }))?.is_empty());
        assert!(parse(json!({ "message": { "other_sub_key": "x" } }))?.is_empty());
        Ok(())
    }

    #[test]
    fn test_work_url_encodes_doi() -> Result<()> {
        let client = CrossrefClient::new("test@example.com", 1)?;
        assert_eq!(
            client.work_url(" 10.1000/a#b?c "),
            "https://api.crossref.org/works/10.1000/a%23b%3Fc"
        );
        Ok(())
    }

    async fn stub_client(status: u16, body: &'static str) -> anyhow::Result<(StubServer, CrossrefClient)> {
        let stub = StubServer::start(move |_| (status, body.to_string())).await?;
        let client = CrossrefClient::new("test@example.com", 2)?
            .with_base_url(format!("{}/works", stub.base_url));
        Ok((stub, client))
    }

    #[tokio::test]
    async fn test_references_over_http() -> anyhow::Result<()> {
        let body = r#"{"message":{"reference":[{"DOI":"10.1/B"},{"key":"ref2"},{"DOI":"10.1/C"}]}}"#;
        let (stub, client) = stub_client(200, body).await?;

        let doi = "10.1002/(SICI)1097-4636(199703)34:3<1::AID-JBM1>3.0.CO;2-#";
        let refs = client.get_references(doi).await?;
        assert_eq!(refs, vec!["10.1/B", "10.1/C"]);

        let requests = stub.requests();
        assert_eq!(requests.len(), 1);
        assert!(requests[0].starts_with("GET /works/10.1002/"));
        assert!(requests[0].contains("2-%23 HTTP/1.1"));
        Ok(())
    }

    #[tokio::test]
    async fn test_not_found_is_empty() -> anyhow::Result<()> {
        let (_stub, client) = stub_client(404, r#"{"status":"error"}"#).await?;
        assert!(client.references("10.1/missing").await?.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_too_many_requests_is_rate_limited() -> anyhow::Result<()> {
        let (_stub, client) = stub_client(429, "{}").await?;
        let result = client.references("10.1/A").await;
        assert!(matches!(result, Err(CitegraphError::RateLimited(5))));
        Ok(())
    }

    #[tokio::test]
    async fn test_server_error_is_api_error() -> anyhow::Result<()> {
        let (_stub, client) = stub_client(503, "unavailable").await?;
        let result = client.references("10.1/A").await;
        assert!(matches!(result, Err(CitegraphError::Api { code: 503, .. })));
        Ok(())
    }

    #[test]
    fn test_with_base_url_trims_slash() -> Result<()> {
        let client = CrossrefClient::new("test@example.com", 1)?.with_base_url("http://localhost:9/works/");
        assert_eq!(client.base_url, "http://localhost:9/works");
        Ok(())
    }
}
