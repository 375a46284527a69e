//! Web search provider client.
//!
//! The [`SearchProvider`] trait abstracts one search request returning
//! organic results. [`SerpApiProvider`] implements it against SerpApi's
//! `search.json` endpoint:
//!
//! ```text
//! GET {endpoint}?engine=google&q=...&api_key=...&num=10
//! → { "organic_results": [ { "link", "title", "snippet" }, ... ] }
//! ```

use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;

use crate::config::SearchConfig;

/// One organic result as returned by the provider.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct OrganicResult {
    #[serde(default)]
    pub link: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub snippet: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum SearchError {
    #[error("search provider returned HTTP {0}")]
    Status(u16),
    #[error("search request failed: {0}")]
    Transport(String),
    #[error("search response could not be decoded: {0}")]
    Decode(String),
}

#[derive(Deserialize)]
struct SearchResponse {
    #[serde(default)]
    organic_results: Option<Vec<OrganicResult>>,
}

/// A search backend.
#[async_trait]
pub trait SearchProvider: Send + Sync {
    /// Run `query`, asking for up to `num` organic results.
    async fn search(&self, query: &str, num: u32) -> Result<Vec<OrganicResult>, SearchError>;
}

/// SerpApi-backed provider.
pub struct SerpApiProvider {
    client: reqwest::Client,
    endpoint: String,
    engine: String,
    api_key: String,
}

impl SerpApiProvider {
    pub fn new(config: &SearchConfig, api_key: String) -> Result<Self, SearchError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| SearchError::Transport(e.to_string()))?;

        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            engine: config.engine.clone(),
            api_key,
        })
    }
}

#[async_trait]
impl SearchProvider for SerpApiProvider {
    async fn search(&self, query: &str, num: u32) -> Result<Vec<OrganicResult>, SearchError> {
        let num = num.to_string();
        let response = self
            .client
            .get(&self.endpoint)
            .query(&[
                ("engine", self.engine.as_str()),
                ("q", query),
                ("api_key", self.api_key.as_str()),
                ("num", num.as_str()),
            ])
            .send()
            .await
            .map_err(|e| SearchError::Transport(e.to_string()))?;

        let status = response.status();
        if status.as_u16() != 200 {
            return Err(SearchError::Status(status.as_u16()));
        }

        let parsed: SearchResponse = response
            .json()
            .await
            .map_err(|e| SearchError::Decode(e.to_string()))?;

        Ok(parsed.organic_results.unwrap_or_default())
    }
}
