//! Book suggestions from an external catalog
//!
//! Queries a Google Books compatible volumes endpoint with free text and
//! turns the first few hits into catalog-only [`Book`] records (no ID, no
//! progress).

use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

use crate::config::Config;
use crate::models::Book;

/// Most suggestions returned for one search
pub const MAX_SUGGESTIONS: usize = 5;

/// Fetch timeout in seconds
const FETCH_TIMEOUT: u64 = 10;

/// Errors from the suggestion client
#[derive(Error, Debug)]
pub enum SuggestError {
    #[error("Catalog request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Catalog responded with status {0}")]
    Status(u16),

    #[error("Catalog response could not be parsed: {0}")]
    Decode(#[from] serde_json::Error),
}

/// HTTP client for the book catalog
#[derive(Clone)]
pub struct SuggestionClient {
    http: reqwest::Client,
    endpoint: String,
}

impl SuggestionClient {
    /// Create a client for the given volumes endpoint
    pub fn new(endpoint: impl Into<String>) -> Result<Self, SuggestError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(FETCH_TIMEOUT))
            .user_agent(concat!("tracer/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            http,
            endpoint: endpoint.into(),
        })
    }

    /// Create a client for the endpoint named in the configuration
    pub fn from_config(config: &Config) -> Result<Self, SuggestError> {
        Self::new(config.suggest_url.clone())
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Up to [`MAX_SUGGESTIONS`] candidate books for a search string
    ///
    /// A blank search returns no suggestions without contacting the catalog.
    pub async fn suggest(&self, search: &str) -> Result<Vec<Book>, SuggestError> {
        let search = search.trim();
        if search.is_empty() {
            return Ok(Vec::new());
        }

        debug!("Querying catalog for {:?}", search);
        let max_results = MAX_SUGGESTIONS.to_string();
        let response = self
            .http
            .get(&self.endpoint)
            .query(&[("q", search), ("maxResults", max_results.as_str())])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(SuggestError::Status(response.status().as_u16()));
        }

        let body = response.text().await?;
        parse_volumes(&body)
    }
}

#[derive(Deserialize)]
struct VolumesResponse {
    #[serde(default)]
    items: Vec<Volume>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Volume {
    #[serde(default)]
    volume_info: VolumeInfo,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct VolumeInfo {
    #[serde(default)]
    title: String,
    #[serde(default)]
    authors: Vec<String>,
    #[serde(default)]
    description: String,
    #[serde(default)]
    page_count: Option<u32>,
    #[serde(default)]
    image_links: Option<ImageLinks>,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct ImageLinks {
    #[serde(default)]
    thumbnail: Option<String>,
    #[serde(default)]
    small_thumbnail: Option<String>,
}

/// Parse a volumes response into catalog books
pub fn parse_volumes(json: &str) -> Result<Vec<Book>, SuggestError> {
    let response: VolumesResponse = serde_json::from_str(json)?;
    Ok(response
        .items
        .into_iter()
        .map(|v| v.volume_info)
        .filter(|info| !info.title.trim().is_empty())
        .take(MAX_SUGGESTIONS)
        .map(|info| Book {
            title: info.title,
            author: info.authors.join(", "),
            cover_url: info
                .image_links
                .and_then(|links| links.thumbnail.or(links.small_thumbnail))
                .unwrap_or_default(),
            summary: info.description,
            total_page_numbers: info.page_count.unwrap_or(0),
            ..Book::default()
        })
        .collect())
}
